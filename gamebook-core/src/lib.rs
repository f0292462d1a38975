//! Gamebook Core
//!
//! Platform-agnostic authoring pipeline for gamebook JSON documents: import
//! into an editable model, validate before saving, and export back to the
//! wire format. This crate has no UI or platform-specific dependencies.

pub mod constants;
pub mod edit;
pub mod export;
pub mod game_config;
pub mod graph;
pub mod import;
pub mod keys;
pub mod model;
pub mod numbers;
pub mod session;
pub mod settings;
pub mod storage;
pub mod validate;
pub mod wire;

// Re-export commonly used types
pub use edit::{EditError, RequirementUpdate};
pub use export::{
    ExportError, ExportOptions, collapse_target_arrays, export_story, export_story_seeded,
    target_multiplicities,
};
pub use game_config::{
    Condition, ConfigError, GameConfig, ImportedConfig, Resource, export_game_config,
    import_game_config,
};
pub use graph::{GraphStats, StoryEdge, StoryGraph, StoryNode};
pub use import::{ImportError, ImportReport, ImportWarning, ImportedStory, import_story};
pub use keys::{hidden_key, split_hidden_prefix};
pub use model::{
    Chapter, ChapterId, Choice, EntryId, OnStartItem, RequirementDetail, Requirements,
    ScalarValue, Story, Target, TargetList,
};
pub use session::{EditorSession, ExportArtifact, SaveError};
pub use settings::EditorSettings;
pub use storage::{MemoryStorage, StorageError};
pub use validate::{
    Check, DuplicateKeyWarning, ImageWarning, ValidationError, lint_duplicate_keys, lint_images,
    validate_all, validate_for_export,
};

/// Trait for abstracting the crash-recovery store.
/// Platform-specific implementations should provide this
pub trait DocumentStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a story under a name, replacing any previous copy
    ///
    /// # Errors
    ///
    /// Returns an error if the story cannot be stored.
    fn save_document(&self, name: &str, story: &Story) -> Result<(), Self::Error>;

    /// Load a story saved under a name
    ///
    /// # Errors
    ///
    /// Returns an error if the stored copy cannot be read.
    fn load_document(&self, name: &str) -> Result<Option<Story>, Self::Error>;

    /// Delete a stored story
    ///
    /// # Errors
    ///
    /// Returns an error if the stored copy cannot be deleted.
    fn delete_document(&self, name: &str) -> Result<(), Self::Error>;
}
