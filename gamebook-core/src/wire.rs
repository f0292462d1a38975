//! On-disk JSON shapes.
//!
//! Decoding types are deliberately loose: every field that hand-edited or
//! legacy files disagree on is an untagged enum with a catch-all branch, so
//! the importer can coerce and log instead of rejecting the whole file.
//! Encoding types are strict and declare fields in the exported order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::model::ScalarValue;

/// Any JSON value read where a scalar is expected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    Number(Number),
    Text(String),
    Flag(bool),
    Other(Value),
}

impl RawScalar {
    /// Text form of the value, or `None` for null, arrays and objects.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Number(n) => Some(n.to_string()),
            Self::Text(text) => Some(text),
            Self::Flag(flag) => Some(flag.to_string()),
            Self::Other(_) => None,
        }
    }

    /// Resource value, or `None` for null, arrays and objects.
    #[must_use]
    pub fn into_scalar(self) -> Option<ScalarValue> {
        match self {
            Self::Number(n) => Some(ScalarValue::Number(n)),
            Self::Text(text) => Some(ScalarValue::Text(text)),
            Self::Flag(flag) => Some(ScalarValue::Text(flag.to_string())),
            Self::Other(_) => None,
        }
    }

    /// Decode a scalar from an arbitrary JSON value; never fails.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Number(n) => Self::Number(n),
            Value::String(text) => Self::Text(text),
            Value::Bool(flag) => Self::Flag(flag),
            other => Self::Other(other),
        }
    }
}

/// One entry of a choice's `targets` list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTarget {
    /// `{ "targetId": .., "probability": .. }` as written by older editor builds.
    Weighted {
        #[serde(rename = "targetId")]
        target_id: RawScalar,
        #[serde(default)]
        probability: Option<RawScalar>,
    },
    /// A bare chapter key or title.
    Reference(RawScalar),
}

/// `targets` as a list, or a single bare reference.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTargets {
    List(Vec<RawTarget>),
    Single(RawTarget),
}

impl RawTargets {
    #[must_use]
    pub fn into_vec(self) -> Vec<RawTarget> {
        match self {
            Self::List(list) => list,
            Self::Single(single) => vec![single],
        }
    }
}

/// One `on_start` value: a plain scalar or a structured `{value, isHidden}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawOnStartValue {
    Structured {
        value: RawScalar,
        #[serde(default, rename = "isHidden")]
        is_hidden: Option<bool>,
    },
    Scalar(RawScalar),
}

/// A JSON object read loosely, keeping anything else for a warning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawObject {
    Entries(Map<String, Value>),
    Other(Value),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawChoice {
    pub text: Option<RawScalar>,
    pub targets: Option<RawTargets>,
    pub requirement: Option<RawObject>,
    pub cost: Option<RawObject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawChapter {
    pub text: Option<RawScalar>,
    pub image: Option<RawScalar>,
    /// Decoded per element so one broken choice does not sink the chapter.
    pub choices: Option<Value>,
    pub on_start: Option<RawObject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCondition {
    pub min: Option<RawScalar>,
    pub trigger: Option<RawScalar>,
}

/// One exported choice. Keyed sections are `serde_json::Map`s, which keep
/// insertion order with the `preserve_order` feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireChoice {
    pub targets: Vec<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirement: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireChapter {
    pub choices: Vec<WireChoice>,
    pub image: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_start: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireDocument {
    /// Encoded [`WireChapter`]s keyed by title.
    pub chapters: Map<String, Value>,
    pub game: String,
    pub start: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireCondition {
    pub min: Number,
    pub trigger: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireGameConfig {
    pub default_resources: Map<String, Value>,
    /// Encoded [`WireCondition`]s keyed by name.
    pub conditions: Map<String, Value>,
}
