//! Global resource pool and win/lose conditions, stored as a separate document.

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::edit::EditError;
use crate::import::{ImportReport, ImportWarning};
use crate::keys::{hidden_key, split_hidden_prefix};
use crate::numbers::parse_numeric;
use crate::wire::{RawCondition, RawScalar, WireCondition, WireGameConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error processing JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid format: the game configuration must be a JSON object.")]
    NotAnObject,
    #[error("Invalid format: '{section}' must be an object.")]
    MalformedSection { section: &'static str },
}

/// A starting resource granted to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub key: String,
    pub value: Number,
    pub is_hidden: bool,
}

impl Resource {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<Number>, is_hidden: bool) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_hidden,
        }
    }
}

/// A threshold evaluated by the player runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub key: String,
    pub min: Number,
    pub trigger: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameConfig {
    pub default_resources: Vec<Resource>,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedConfig {
    pub config: GameConfig,
    pub report: ImportReport,
}

fn checked_key<'a, I>(key: &str, mut existing: I) -> Result<String, EditError>
where
    I: Iterator<Item = &'a str>,
{
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(EditError::BlankKey);
    }
    if existing.any(|other| other == trimmed) {
        return Err(EditError::DuplicateKey {
            key: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

impl GameConfig {
    #[must_use]
    pub fn resource(&self, key: &str) -> Option<&Resource> {
        self.default_resources.iter().find(|r| r.key == key)
    }

    #[must_use]
    pub fn condition(&self, key: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.key == key)
    }

    /// Add a starting resource.
    ///
    /// # Errors
    ///
    /// Fails when the trimmed key is blank or already used.
    pub fn add_resource(
        &mut self,
        key: &str,
        value: Number,
        is_hidden: bool,
    ) -> Result<(), EditError> {
        let key = checked_key(key, self.default_resources.iter().map(|r| r.key.as_str()))?;
        self.default_resources.push(Resource {
            key,
            value,
            is_hidden,
        });
        Ok(())
    }

    /// Rename a starting resource in place.
    ///
    /// # Errors
    ///
    /// Fails when `from` is unknown or `to` is blank or already used.
    pub fn rename_resource(&mut self, from: &str, to: &str) -> Result<(), EditError> {
        let index = self
            .default_resources
            .iter()
            .position(|r| r.key == from)
            .ok_or_else(|| EditError::UnknownKey {
                key: from.to_string(),
            })?;
        let others = self
            .default_resources
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, r)| r.key.as_str());
        let key = checked_key(to, others)?;
        self.default_resources[index].key = key;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails when no resource has this key.
    pub fn remove_resource(&mut self, key: &str) -> Result<Resource, EditError> {
        let index = self
            .default_resources
            .iter()
            .position(|r| r.key == key)
            .ok_or_else(|| EditError::UnknownKey {
                key: key.to_string(),
            })?;
        Ok(self.default_resources.remove(index))
    }

    /// Add a condition.
    ///
    /// # Errors
    ///
    /// Fails when the trimmed key is blank or already used.
    pub fn add_condition(
        &mut self,
        key: &str,
        min: Number,
        trigger: impl Into<String>,
    ) -> Result<(), EditError> {
        let key = checked_key(key, self.conditions.iter().map(|c| c.key.as_str()))?;
        self.conditions.push(Condition {
            key,
            min,
            trigger: trigger.into(),
        });
        Ok(())
    }

    /// # Errors
    ///
    /// Fails when no condition has this key.
    pub fn remove_condition(&mut self, key: &str) -> Result<Condition, EditError> {
        let index = self
            .conditions
            .iter()
            .position(|c| c.key == key)
            .ok_or_else(|| EditError::UnknownKey {
                key: key.to_string(),
            })?;
        Ok(self.conditions.remove(index))
    }
}

fn numeric_or_zero(raw: RawScalar) -> Result<Number, String> {
    match raw {
        RawScalar::Number(n) => Ok(n),
        RawScalar::Text(text) => parse_numeric(&text).ok_or(text),
        RawScalar::Flag(flag) => Err(flag.to_string()),
        RawScalar::Other(value) => Err(value.to_string()),
    }
}

/// Decode a `default_resources` object, stripping hidden prefixes.
pub(crate) fn hydrate_resources(
    entries: &Map<String, Value>,
    report: &mut ImportReport,
) -> Vec<Resource> {
    entries
        .iter()
        .map(|(raw_key, value)| {
            let (key, is_hidden) = split_hidden_prefix(raw_key);
            let value = numeric_or_zero(RawScalar::from_value(value.clone())).unwrap_or_else(|raw| {
                report.warn(ImportWarning::NonNumericResource {
                    key: key.to_string(),
                    raw,
                });
                Number::from(0)
            });
            Resource::new(key, value, is_hidden)
        })
        .collect()
}

fn hydrate_conditions(entries: &Map<String, Value>, report: &mut ImportReport) -> Vec<Condition> {
    entries
        .iter()
        .map(|(key, value)| {
            let raw: RawCondition = serde_json::from_value(value.clone()).unwrap_or_default();
            let min = raw
                .min
                .map_or(Ok(Number::from(0)), numeric_or_zero)
                .unwrap_or_else(|raw| {
                    report.warn(ImportWarning::NonNumericCondition {
                        key: key.clone(),
                        raw,
                    });
                    Number::from(0)
                });
            let trigger = raw
                .trigger
                .and_then(RawScalar::into_text)
                .unwrap_or_default();
            Condition {
                key: key.clone(),
                min,
                trigger,
            }
        })
        .collect()
}

fn section<'a>(
    document: &'a Map<String, Value>,
    name: &'static str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match document.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(entries)) => Ok(Some(entries)),
        Some(_) => Err(ConfigError::MalformedSection { section: name }),
    }
}

/// Parse a game configuration document.
///
/// # Errors
///
/// Returns an error when the text is not JSON or its sections are not objects.
pub fn import_game_config(json: &str) -> Result<ImportedConfig, ConfigError> {
    let document: Value = serde_json::from_str(json)?;
    let document = document.as_object().ok_or(ConfigError::NotAnObject)?;

    let mut report = ImportReport::default();
    let default_resources = section(document, "default_resources")?
        .map(|entries| hydrate_resources(entries, &mut report))
        .unwrap_or_default();
    let conditions = section(document, "conditions")?
        .map(|entries| hydrate_conditions(entries, &mut report))
        .unwrap_or_default();

    Ok(ImportedConfig {
        config: GameConfig {
            default_resources,
            conditions,
        },
        report,
    })
}

/// Serialize a game configuration, 2-space pretty printed.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn export_game_config(config: &GameConfig) -> Result<String, ConfigError> {
    let mut default_resources = Map::new();
    for resource in &config.default_resources {
        let key = hidden_key(&resource.key, resource.is_hidden);
        if default_resources.contains_key(&key) {
            log::warn!("default resource \"{key}\" is listed twice; the last value is exported");
        }
        default_resources.insert(key, Value::Number(resource.value.clone()));
    }
    let mut conditions = Map::new();
    for condition in &config.conditions {
        let wire = WireCondition {
            min: condition.min.clone(),
            trigger: condition.trigger.clone(),
        };
        conditions.insert(condition.key.clone(), serde_json::to_value(wire)?);
    }
    let wire = WireGameConfig {
        default_resources,
        conditions,
    };
    Ok(serde_json::to_string_pretty(&wire)?)
}
