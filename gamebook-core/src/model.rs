//! In-memory story model edited by the authoring UI.
//!
//! The model is a plain serializable value. The importer builds it, editing
//! operations mutate it, and the validator and exporter only read it.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use crate::constants::FULL_PROBABILITY;
use crate::numbers::parse_numeric;

/// Process-local chapter identity, assigned at import or creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterId(pub u32);

impl ChapterId {
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of choices, requirement entries and on-start items.
pub type EntryId = Uuid;

/// A number-or-text resource value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Number(serde_json::Number),
    Text(String),
}

impl ScalarValue {
    /// Numeric form of the value when the text parses as a number.
    #[must_use]
    pub fn coerce_numeric(&self) -> Self {
        match self {
            Self::Number(n) => Self::Number(n.clone()),
            Self::Text(text) => parse_numeric(text).map_or_else(|| self.clone(), Self::Number),
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

impl Default for ScalarValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<serde_json::Number> for ScalarValue {
    fn from(value: serde_json::Number) -> Self {
        Self::Number(value)
    }
}

impl From<ScalarValue> for serde_json::Value {
    fn from(value: ScalarValue) -> Self {
        match value {
            ScalarValue::Number(n) => Self::Number(n),
            ScalarValue::Text(text) => Self::String(text),
        }
    }
}

/// A weighted destination of a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub target_id: ChapterId,
    /// Integer percent.
    pub probability: u32,
}

impl Target {
    #[must_use]
    pub const fn new(target_id: ChapterId, probability: u32) -> Self {
        Self {
            target_id,
            probability,
        }
    }
}

/// Most choices branch to a handful of chapters.
pub type TargetList = SmallVec<[Target; 4]>;

/// A requirement (kept) or cost (consumed) attached to a choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementDetail {
    pub id: EntryId,
    pub key: String,
    pub value: ScalarValue,
    pub is_cost: bool,
    pub is_hidden: bool,
}

impl RequirementDetail {
    #[must_use]
    pub fn new(key: impl Into<String>, value: ScalarValue, is_cost: bool, is_hidden: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            value,
            is_cost,
            is_hidden,
        }
    }

    /// Empty entry as created by the "add resource" action.
    #[must_use]
    pub fn blank() -> Self {
        Self::new(String::new(), ScalarValue::default(), false, false)
    }
}

/// Requirement and cost entries of a choice, keyed by entry id in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Requirements(Vec<RequirementDetail>);

impl Requirements {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RequirementDetail> {
        self.0.iter()
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&RequirementDetail> {
        self.0.iter().find(|detail| detail.id == id)
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut RequirementDetail> {
        self.0.iter_mut().find(|detail| detail.id == id)
    }

    /// Insert an entry, replacing any entry with the same id. Returns its id.
    pub fn insert(&mut self, detail: RequirementDetail) -> EntryId {
        let id = detail.id;
        if let Some(existing) = self.get_mut(id) {
            *existing = detail;
        } else {
            self.0.push(detail);
        }
        id
    }

    pub fn remove(&mut self, id: EntryId) -> Option<RequirementDetail> {
        let index = self.0.iter().position(|detail| detail.id == id)?;
        Some(self.0.remove(index))
    }

    /// Entries that are checked but not consumed.
    pub fn requirements(&self) -> impl Iterator<Item = &RequirementDetail> {
        self.0.iter().filter(|detail| !detail.is_cost)
    }

    /// Entries that are consumed when the choice is taken.
    pub fn costs(&self) -> impl Iterator<Item = &RequirementDetail> {
        self.0.iter().filter(|detail| detail.is_cost)
    }
}

impl<'a> IntoIterator for &'a Requirements {
    type Item = &'a RequirementDetail;
    type IntoIter = std::slice::Iter<'a, RequirementDetail>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<RequirementDetail> for Requirements {
    fn from_iter<I: IntoIterator<Item = RequirementDetail>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A resource granted or flag set when a chapter is entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnStartItem {
    pub id: EntryId,
    pub key: String,
    /// Written back with the kind it was read with.
    pub value: ScalarValue,
    pub is_hidden: bool,
}

impl OnStartItem {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<ScalarValue>, is_hidden: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            value: value.into(),
            is_hidden,
        }
    }
}

/// A player-facing option leading to one or more chapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: EntryId,
    pub text: String,
    #[serde(default)]
    pub targets: TargetList,
    #[serde(default)]
    pub requirement: Requirements,
}

impl Choice {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            targets: TargetList::new(),
            requirement: Requirements::new(),
        }
    }

    /// Sum of target probabilities.
    #[must_use]
    pub fn probability_sum(&self) -> u32 {
        self.targets
            .iter()
            .fold(0u32, |sum, target| sum.saturating_add(target.probability))
    }

    /// Whether the targets satisfy the probability invariant for their count.
    #[must_use]
    pub fn probabilities_closed(&self) -> bool {
        match self.targets.len() {
            0 => true,
            1 => self.targets[0].probability == FULL_PROBABILITY,
            _ => self.probability_sum() == FULL_PROBABILITY,
        }
    }

    #[must_use]
    pub fn has_target(&self, id: ChapterId) -> bool {
        self.targets.iter().any(|target| target.target_id == id)
    }
}

/// A narrative unit of the gamebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: ChapterId,
    /// Export key and cross-reference token.
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub on_start: Vec<OnStartItem>,
    #[serde(default)]
    pub is_start_chapter: bool,
}

impl Chapter {
    #[must_use]
    pub fn new(id: ChapterId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            text: String::new(),
            image: None,
            choices: Vec::new(),
            on_start: Vec::new(),
            is_start_chapter: false,
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

/// An authored gamebook: chapters in display order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Story {
    pub chapters: Vec<Chapter>,
}

impl Story {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chapters: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    #[must_use]
    pub fn chapter(&self, id: ChapterId) -> Option<&Chapter> {
        self.chapters.iter().find(|chapter| chapter.id == id)
    }

    pub fn chapter_mut(&mut self, id: ChapterId) -> Option<&mut Chapter> {
        self.chapters.iter_mut().find(|chapter| chapter.id == id)
    }

    #[must_use]
    pub fn chapter_by_title(&self, title: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|chapter| chapter.title == title)
    }

    #[must_use]
    pub fn title_of(&self, id: ChapterId) -> Option<&str> {
        self.chapter(id).map(|chapter| chapter.title.as_str())
    }

    /// Id for a newly created chapter: one above the current maximum, or
    /// the lowest unused id once the maximum is `u32::MAX`. `None` only when
    /// every id is taken.
    #[must_use]
    pub fn next_chapter_id(&self) -> Option<ChapterId> {
        let Some(max) = self.chapters.iter().map(|chapter| chapter.id.get()).max() else {
            return Some(ChapterId(1));
        };
        if let Some(next) = max.checked_add(1) {
            return Some(ChapterId(next));
        }
        let taken: HashSet<u32> = self.chapters.iter().map(|chapter| chapter.id.get()).collect();
        free_chapter_id(&taken, max)
    }

    pub fn start_chapters(&self) -> impl Iterator<Item = &Chapter> {
        self.chapters.iter().filter(|chapter| chapter.is_start_chapter)
    }

    /// First chapter flagged as start, if any.
    #[must_use]
    pub fn start_chapter(&self) -> Option<&Chapter> {
        self.start_chapters().next()
    }
}

/// First id after `after` missing from `taken`, wrapping around to 1.
pub(crate) fn free_chapter_id(taken: &HashSet<u32>, after: u32) -> Option<ChapterId> {
    let above = after.checked_add(1).map(|first| first..=u32::MAX);
    above
        .into_iter()
        .flatten()
        .chain(1..=after)
        .find(|id| !taken.contains(id))
        .map(ChapterId)
}
