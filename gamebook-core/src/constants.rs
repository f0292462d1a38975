//! Shared constants for the gamebook document format and editor defaults.

/// Probability total every multi-target choice must reach, in integer percent.
pub const FULL_PROBABILITY: u32 = 100;

/// Prefix that marks a resource key as hidden from the player.
pub const HIDDEN_PREFIX: char = '#';

/// Legacy hidden marker accepted on import only; export always writes [`HIDDEN_PREFIX`].
pub const LEGACY_HIDDEN_PREFIX: char = '@';

/// Literal written to the `game` field of every exported story.
pub const GAME_TAG: &str = "game";

/// Title prefix given to chapters imported under a numeric key.
pub const NUMERIC_TITLE_PREFIX: &str = "Cap ";

/// Title prefix given to chapters created in the editor.
pub const NEW_CHAPTER_TITLE_PREFIX: &str = "Chapter ";

/// Storage key of the crash-recovery mirror.
pub const AUTOSAVE_KEY: &str = "bookData";

/// File name offered for story downloads when nothing was loaded.
pub const DEFAULT_STORY_FILE_NAME: &str = "historia.json";

/// File name offered for game configuration downloads.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "game_config.json";

/// Image extensions the player runtime can display.
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 2] = [".jpg", ".png"];
