use serde::{Deserialize, Serialize};

use crate::constants::{AUTOSAVE_KEY, DEFAULT_CONFIG_FILE_NAME, DEFAULT_STORY_FILE_NAME};

/// Editor-level configuration. Every field has a default, so an empty JSON
/// object is a valid settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Storage key of the crash-recovery mirror.
    pub autosave_key: String,
    /// Download name for stories that were not loaded from a file.
    pub story_file_name: String,
    pub config_file_name: String,
    pub collapse_target_arrays: bool,
    /// Fixed seed for the target shuffle; entropy when absent.
    pub shuffle_seed: Option<u64>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            autosave_key: AUTOSAVE_KEY.to_string(),
            story_file_name: DEFAULT_STORY_FILE_NAME.to_string(),
            config_file_name: DEFAULT_CONFIG_FILE_NAME.to_string(),
            collapse_target_arrays: true,
            shuffle_seed: None,
        }
    }
}

impl EditorSettings {
    /// Load settings from JSON, ignoring unknown fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a field has the wrong type.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
