//! Editing session: the single owner of the live story.
//!
//! Imports replace the story wholesale or not at all. Every change is
//! mirrored to the auto-save store; a failed mirror write is logged and
//! otherwise ignored.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use crate::DocumentStorage;
use crate::export::{ExportError, ExportOptions, export_story};
use crate::game_config::{ConfigError, GameConfig, export_game_config, import_game_config};
use crate::import::{ImportError, ImportReport, import_story};
use crate::model::Story;
use crate::settings::EditorSettings;
use crate::validate::{ValidationError, validate_for_export};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("No chapters created. The JSON file will not be generated.")]
    EmptyStory,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A document ready to be offered as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub contents: String,
}

pub struct EditorSession<S>
where
    S: DocumentStorage,
{
    storage: S,
    settings: EditorSettings,
    story: Story,
    config: GameConfig,
    loaded_file_name: Option<String>,
    rng: ChaCha20Rng,
}

impl<S> EditorSession<S>
where
    S: DocumentStorage,
{
    pub fn new(storage: S, settings: EditorSettings) -> Self {
        let seed = settings.shuffle_seed.unwrap_or_else(rand::random);
        Self {
            storage,
            settings,
            story: Story::new(),
            config: GameConfig::default(),
            loaded_file_name: None,
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub const fn story(&self) -> &Story {
        &self.story
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub const fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    #[must_use]
    pub fn loaded_file_name(&self) -> Option<&str> {
        self.loaded_file_name.as_deref()
    }

    /// Replace the story with an imported document.
    ///
    /// A `default_resources` section in the document replaces the game
    /// configuration's resource pool.
    ///
    /// # Errors
    ///
    /// Returns the import error and leaves the session untouched.
    pub fn open(&mut self, json: &str, file_name: Option<&str>) -> Result<ImportReport, ImportError> {
        let imported = import_story(json)?;
        self.story = imported.story;
        if let Some(resources) = imported.default_resources {
            self.config.default_resources = resources;
        }
        self.loaded_file_name = file_name.map(str::to_string);
        log::info!("opened story with {} chapters", self.story.len());
        self.autosave();
        Ok(imported.report)
    }

    /// Replace the game configuration with an imported document.
    ///
    /// # Errors
    ///
    /// Returns the parse error and leaves the configuration untouched.
    pub fn open_config(&mut self, json: &str) -> Result<ImportReport, ConfigError> {
        let imported = import_game_config(json)?;
        self.config = imported.config;
        Ok(imported.report)
    }

    /// Apply a change to the story and mirror it to storage.
    pub fn edit<F, T>(&mut self, change: F) -> T
    where
        F: FnOnce(&mut Story) -> T,
    {
        let result = change(&mut self.story);
        self.autosave();
        result
    }

    pub fn edit_config<F, T>(&mut self, change: F) -> T
    where
        F: FnOnce(&mut GameConfig) -> T,
    {
        change(&mut self.config)
    }

    /// Restore the last mirrored story. Returns whether one was found.
    ///
    /// # Errors
    ///
    /// Returns the storage error; the current story is kept.
    pub fn recover(&mut self) -> Result<bool, S::Error> {
        match self.storage.load_document(&self.settings.autosave_key)? {
            Some(story) => {
                self.story = story;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Validate and export the story as a new download.
    ///
    /// # Errors
    ///
    /// Fails on an empty story, on the first failing validation check, or
    /// when encoding fails.
    pub fn save(&mut self) -> Result<ExportArtifact, SaveError> {
        if self.story.is_empty() {
            return Err(SaveError::EmptyStory);
        }
        validate_for_export(&self.story)?;
        let options = ExportOptions::from(&self.settings);
        let contents = export_story(&self.story, &options, &mut self.rng)?;
        let file_name = self
            .loaded_file_name
            .clone()
            .unwrap_or_else(|| self.settings.story_file_name.clone());
        Ok(ExportArtifact {
            file_name,
            contents,
        })
    }

    /// Export the game configuration as a new download.
    ///
    /// # Errors
    ///
    /// Fails when encoding fails.
    pub fn save_config(&self) -> Result<ExportArtifact, SaveError> {
        Ok(ExportArtifact {
            file_name: self.settings.config_file_name.clone(),
            contents: export_game_config(&self.config)?,
        })
    }

    /// Remove every chapter.
    pub fn clear(&mut self) {
        self.story.clear();
        self.loaded_file_name = None;
        self.autosave();
    }

    fn autosave(&self) {
        if let Err(err) = self
            .storage
            .save_document(&self.settings.autosave_key, &self.story)
        {
            log::error!("auto-save to '{}' failed: {err}", self.settings.autosave_key);
        }
    }
}
