//! Story importer: wire JSON to the editable model.
//!
//! Malformed top-level structure is fatal and leaves the caller's model
//! untouched. Anything wrong inside a single entry (a dangling target, an
//! odd `on_start` value, an unknown start chapter) is coerced to a safe
//! default, logged, and reported back as an [`ImportWarning`].

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::constants::{FULL_PROBABILITY, NUMERIC_TITLE_PREFIX};
use crate::game_config::{Resource, hydrate_resources};
use crate::keys::split_hidden_prefix;
use crate::model::{
    Chapter, ChapterId, Choice, OnStartItem, RequirementDetail, Requirements, ScalarValue, Story,
    Target, TargetList, free_chapter_id,
};
use crate::numbers::{floor_share, number_to_percent, parse_numeric};
use crate::wire::{RawChapter, RawChoice, RawObject, RawOnStartValue, RawScalar, RawTarget};

/// Fatal import failures. The model is never partially replaced.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Error processing JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid format: 'chapters' object not found or malformed.")]
    MissingChapters,
    #[error("Invalid format: chapter '{key}' is not an object.")]
    MalformedChapter { key: String },
    #[error("Invalid format: too many chapters to number.")]
    ChapterIdsExhausted,
}

/// A recoverable anomaly found while importing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportWarning {
    #[error("start chapter '{reference}' not found; '{fallback}' is used as the start chapter")]
    StartFallback { reference: String, fallback: String },
    #[error("start chapter '{reference}' not found and the story has no chapters")]
    StartMissing { reference: String },
    #[error("chapter key '{key}' repeats id {id}; it was given a fresh id")]
    DuplicateChapterKey { key: String, id: ChapterId },
    #[error("chapter '{chapter}' has a non-text {field}; it was cleared")]
    MalformedText { chapter: String, field: &'static str },
    #[error("chapter '{chapter}' choice #{index} is not an object and was skipped")]
    MalformedChoice { chapter: String, index: usize },
    #[error("chapter '{chapter}' choice '{choice}' points at unknown chapter '{reference}'; the target was dropped")]
    UnresolvedTarget {
        chapter: String,
        choice: String,
        reference: String,
    },
    #[error("chapter '{chapter}' choice '{choice}' has a target probability '{raw}' that is not a number; 0 was used")]
    NonNumericProbability {
        chapter: String,
        choice: String,
        raw: String,
    },
    #[error("chapter '{chapter}' choice '{choice}' probabilities sum to {sum}%, not 100%")]
    IncompleteProbabilities {
        chapter: String,
        choice: String,
        sum: u32,
    },
    #[error("chapter '{chapter}' has an on_start value for '{key}' that is not a scalar; an empty string was used")]
    MalformedOnStart { chapter: String, key: String },
    #[error("'{section}' in chapter '{chapter}' is not an object and was ignored")]
    MalformedSection {
        chapter: String,
        section: &'static str,
    },
    #[error("chapter '{chapter}' choice '{choice}' has a {section} value for '{key}' that is not a scalar; an empty string was used")]
    MalformedRequirement {
        chapter: String,
        choice: String,
        section: &'static str,
        key: String,
    },
    #[error("resource '{key}' has a non-numeric value '{raw}'; 0 was used")]
    NonNumericResource { key: String, raw: String },
    #[error("condition '{key}' has a non-numeric min '{raw}'; 0 was used")]
    NonNumericCondition { key: String, raw: String },
    #[error("'{section}' is not an object and was ignored")]
    MalformedDocumentSection { section: &'static str },
}

/// Warnings collected during an import, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportReport {
    pub warnings: Vec<ImportWarning>,
}

impl ImportReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub(crate) fn warn(&mut self, warning: ImportWarning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }
}

/// Result of a successful story import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedStory {
    pub story: Story,
    /// `default_resources` found in the story document, if any.
    pub default_resources: Option<Vec<Resource>>,
    pub report: ImportReport,
}

/// Maps wire chapter keys (numeric or symbolic) and titles to chapter ids.
#[derive(Debug, Clone, Default)]
pub struct ChapterIdMap {
    by_key: HashMap<String, ChapterId>,
    by_number: HashMap<u32, ChapterId>,
    by_title: HashMap<String, ChapterId>,
}

impl ChapterIdMap {
    /// Assign ids to chapter keys.
    ///
    /// Numeric keys keep their number. Symbolic keys, and numeric keys whose
    /// number is already taken, get the next integers above the largest
    /// numeric key, in document order, wrapping to the lowest free ids once
    /// the top of the range is reached.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::ChapterIdsExhausted`] if every id is taken.
    pub fn build<'a, I>(keys: I, report: &mut ImportReport) -> Result<Self, ImportError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keys: Vec<&str> = keys.into_iter().collect();
        let mut map = Self::default();
        let mut max = 0u32;
        let mut taken = HashSet::new();
        let mut deferred = Vec::new();

        for key in &keys {
            match numeric_key(key) {
                Some(number) if !map.by_number.contains_key(&number) => {
                    let id = ChapterId(number);
                    map.by_key.insert((*key).to_string(), id);
                    map.by_number.insert(number, id);
                    taken.insert(number);
                    max = max.max(number);
                }
                Some(number) => {
                    report.warn(ImportWarning::DuplicateChapterKey {
                        key: (*key).to_string(),
                        id: ChapterId(number),
                    });
                    deferred.push(*key);
                }
                None => deferred.push(*key),
            }
        }

        let mut cursor = max;
        for key in deferred {
            let id = free_chapter_id(&taken, cursor).ok_or(ImportError::ChapterIdsExhausted)?;
            taken.insert(id.get());
            cursor = id.get();
            map.by_key.insert(key.to_string(), id);
        }

        for key in keys {
            if let Some(id) = map.by_key.get(key).copied() {
                map.by_title.entry(chapter_title(key)).or_insert(id);
            }
        }
        Ok(map)
    }

    #[must_use]
    pub fn id_for_key(&self, key: &str) -> Option<ChapterId> {
        self.by_key.get(key).copied()
    }

    /// Resolve a cross-reference token: a chapter key, a chapter title, or a
    /// number matching a numeric chapter key.
    #[must_use]
    pub fn resolve(&self, reference: &str) -> Option<ChapterId> {
        self.by_key
            .get(reference)
            .or_else(|| self.by_title.get(reference))
            .or_else(|| numeric_key(reference).and_then(|n| self.by_number.get(&n)))
            .copied()
    }
}

fn numeric_key(key: &str) -> Option<u32> {
    key.trim().parse::<u32>().ok()
}

/// Editor title for a wire chapter key.
#[must_use]
pub fn chapter_title(key: &str) -> String {
    match numeric_key(key) {
        Some(number) if number != 0 => format!("{NUMERIC_TITLE_PREFIX}{}", key.trim()),
        _ => key.to_string(),
    }
}

fn reference_token(raw: RawScalar) -> Option<String> {
    match raw {
        RawScalar::Number(n) => Some(n.to_string()),
        RawScalar::Text(text) => Some(text),
        RawScalar::Flag(_) | RawScalar::Other(_) => None,
    }
}

fn describe(raw: &RawScalar) -> String {
    match raw {
        RawScalar::Number(n) => n.to_string(),
        RawScalar::Text(text) => text.clone(),
        RawScalar::Flag(flag) => flag.to_string(),
        RawScalar::Other(value) => value.to_string(),
    }
}

/// Parse a story document into the editable model.
///
/// # Errors
///
/// Returns an error if the text is not JSON, if `chapters` is missing or not
/// an object, or if a chapter entry is not an object.
pub fn import_story(json: &str) -> Result<ImportedStory, ImportError> {
    let document: Value = serde_json::from_str(json)?;
    let chapters = document
        .get("chapters")
        .and_then(Value::as_object)
        .ok_or(ImportError::MissingChapters)?;

    let mut report = ImportReport::default();
    let ids = ChapterIdMap::build(chapters.keys().map(String::as_str), &mut report)?;

    let mut story = Story::new();
    for (key, value) in chapters {
        if !value.is_object() {
            return Err(ImportError::MalformedChapter { key: key.clone() });
        }
        let raw: RawChapter = serde_json::from_value(value.clone())
            .map_err(|_| ImportError::MalformedChapter { key: key.clone() })?;
        let id = ids
            .id_for_key(key)
            .ok_or_else(|| ImportError::MalformedChapter { key: key.clone() })?;
        story
            .chapters
            .push(hydrate_chapter(id, chapter_title(key), raw, &ids, &mut report));
    }

    flag_start_chapter(&mut story, document.get("start"), &ids, &mut report);

    let default_resources = match document.get("default_resources") {
        None | Some(Value::Null) => None,
        Some(Value::Object(entries)) => Some(hydrate_resources(entries, &mut report)),
        Some(_) => {
            report.warn(ImportWarning::MalformedDocumentSection {
                section: "default_resources",
            });
            None
        }
    };

    log::debug!(
        "imported {} chapters with {} warnings",
        story.len(),
        report.warnings.len()
    );

    Ok(ImportedStory {
        story,
        default_resources,
        report,
    })
}

fn flag_start_chapter(
    story: &mut Story,
    start: Option<&Value>,
    ids: &ChapterIdMap,
    report: &mut ImportReport,
) {
    let reference = match start {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    let resolved = ids
        .resolve(&reference)
        .filter(|id| story.chapter(*id).is_some());

    if let Some(id) = resolved
        && let Some(chapter) = story.chapter_mut(id)
    {
        chapter.is_start_chapter = true;
        return;
    }

    match story.chapters.first_mut() {
        Some(first) => {
            first.is_start_chapter = true;
            let fallback = first.title.clone();
            report.warn(ImportWarning::StartFallback {
                reference,
                fallback,
            });
        }
        None => report.warn(ImportWarning::StartMissing { reference }),
    }
}

fn hydrate_chapter(
    id: ChapterId,
    title: String,
    raw: RawChapter,
    ids: &ChapterIdMap,
    report: &mut ImportReport,
) -> Chapter {
    let text = text_field(raw.text, &title, "text", report).replace("\\n", "\n");
    let image = Some(text_field(raw.image, &title, "image", report)).filter(|img| !img.is_empty());
    let on_start = hydrate_on_start(raw.on_start, &title, report);

    let choices = match raw.choices {
        Some(Value::Array(entries)) => entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<RawChoice>(entry) {
                Ok(choice) => Some(hydrate_choice(choice, &title, ids, report)),
                Err(_) => {
                    report.warn(ImportWarning::MalformedChoice {
                        chapter: title.clone(),
                        index,
                    });
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    };

    Chapter {
        id,
        title,
        text,
        image,
        choices,
        on_start,
        is_start_chapter: false,
    }
}

fn text_field(
    raw: Option<RawScalar>,
    chapter: &str,
    field: &'static str,
    report: &mut ImportReport,
) -> String {
    match raw {
        None | Some(RawScalar::Other(Value::Null)) => String::new(),
        Some(value) => value.into_text().unwrap_or_else(|| {
            report.warn(ImportWarning::MalformedText {
                chapter: chapter.to_string(),
                field,
            });
            String::new()
        }),
    }
}

fn hydrate_on_start(
    raw: Option<RawObject>,
    chapter: &str,
    report: &mut ImportReport,
) -> Vec<OnStartItem> {
    let entries = match raw {
        None | Some(RawObject::Other(Value::Null)) => return Vec::new(),
        Some(RawObject::Entries(entries)) => entries,
        Some(RawObject::Other(_)) => {
            report.warn(ImportWarning::MalformedSection {
                chapter: chapter.to_string(),
                section: "on_start",
            });
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .map(|(raw_key, value)| {
            let (key, prefixed) = split_hidden_prefix(&raw_key);
            let decoded = serde_json::from_value::<RawOnStartValue>(value)
                .unwrap_or(RawOnStartValue::Scalar(RawScalar::Other(Value::Null)));
            let (scalar, flagged) = match decoded {
                RawOnStartValue::Structured { value, is_hidden } => {
                    (value, is_hidden.unwrap_or(false))
                }
                RawOnStartValue::Scalar(value) => (value, false),
            };
            let value = scalar.into_scalar().unwrap_or_else(|| {
                report.warn(ImportWarning::MalformedOnStart {
                    chapter: chapter.to_string(),
                    key: key.to_string(),
                });
                ScalarValue::default()
            });
            OnStartItem::new(key, value, prefixed || flagged)
        })
        .collect()
}

fn hydrate_choice(
    raw: RawChoice,
    chapter: &str,
    ids: &ChapterIdMap,
    report: &mut ImportReport,
) -> Choice {
    let text = raw
        .text
        .and_then(RawScalar::into_text)
        .unwrap_or_default();
    let mut choice = Choice::new(text);

    let raw_targets = raw.targets.map(|t| t.into_vec()).unwrap_or_default();
    choice.targets = hydrate_targets(raw_targets, chapter, &choice.text, ids, report);

    let mut entries = Requirements::new();
    for (section, is_cost, raw_section) in [
        ("requirement", false, raw.requirement),
        ("cost", true, raw.cost),
    ] {
        for detail in
            hydrate_requirements(raw_section, section, is_cost, chapter, &choice.text, report)
        {
            entries.insert(detail);
        }
    }
    choice.requirement = entries;
    choice
}

/// Resolve targets and derive their probabilities.
///
/// Bare references share 100% by occurrence: a chapter listed `k` times out
/// of `n` entries gets `floor(k * 100 / n)`. Weighted entries keep their
/// probability. Unresolved entries are dropped but still count towards `n`.
fn hydrate_targets(
    raw: Vec<RawTarget>,
    chapter: &str,
    choice: &str,
    ids: &ChapterIdMap,
    report: &mut ImportReport,
) -> TargetList {
    let total = raw.len();
    // (id, explicit probability, bare reference count) in first-seen order
    let mut tally: Vec<(ChapterId, u32, usize)> = Vec::new();

    for entry in raw {
        let (reference, explicit) = match entry {
            RawTarget::Weighted {
                target_id,
                probability,
            } => {
                let percent = probability_percent(probability, chapter, choice, &target_id, report);
                (target_id, Some(percent))
            }
            RawTarget::Reference(reference) => (reference, None),
        };
        let token = reference_token(reference.clone()).unwrap_or_else(|| describe(&reference));

        let Some(id) = ids.resolve(&token) else {
            report.warn(ImportWarning::UnresolvedTarget {
                chapter: chapter.to_string(),
                choice: choice.to_string(),
                reference: token,
            });
            continue;
        };

        let slot = match tally.iter().position(|(existing, _, _)| *existing == id) {
            Some(index) => &mut tally[index],
            None => {
                tally.push((id, 0, 0));
                let last = tally.len() - 1;
                &mut tally[last]
            }
        };
        match explicit {
            Some(percent) => slot.1 = slot.1.saturating_add(percent),
            None => slot.2 += 1,
        }
    }

    let mut targets: TargetList = tally
        .into_iter()
        .map(|(id, explicit, count)| {
            Target::new(id, explicit.saturating_add(floor_share(count, total)))
        })
        .collect();

    if let [only] = targets.as_mut_slice() {
        only.probability = FULL_PROBABILITY;
    }
    if targets.len() > 1 {
        let sum = targets
            .iter()
            .fold(0u32, |acc, target| acc.saturating_add(target.probability));
        if sum != FULL_PROBABILITY {
            report.warn(ImportWarning::IncompleteProbabilities {
                chapter: chapter.to_string(),
                choice: choice.to_string(),
                sum,
            });
        }
    }
    targets
}

fn probability_percent(
    raw: Option<RawScalar>,
    chapter: &str,
    choice: &str,
    target: &RawScalar,
    report: &mut ImportReport,
) -> u32 {
    let percent = match &raw {
        Some(RawScalar::Number(n)) => number_to_percent(n),
        Some(RawScalar::Text(text)) => parse_numeric(text).as_ref().and_then(number_to_percent),
        _ => None,
    };
    percent.unwrap_or_else(|| {
        report.warn(ImportWarning::NonNumericProbability {
            chapter: chapter.to_string(),
            choice: choice.to_string(),
            raw: raw.as_ref().map_or_else(|| describe(target), describe),
        });
        0
    })
}

fn hydrate_requirements(
    raw: Option<RawObject>,
    section: &'static str,
    is_cost: bool,
    chapter: &str,
    choice: &str,
    report: &mut ImportReport,
) -> Vec<RequirementDetail> {
    let entries: Map<String, Value> = match raw {
        None | Some(RawObject::Other(Value::Null)) => return Vec::new(),
        Some(RawObject::Entries(entries)) => entries,
        Some(RawObject::Other(_)) => {
            report.warn(ImportWarning::MalformedSection {
                chapter: chapter.to_string(),
                section,
            });
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .map(|(raw_key, value)| {
            let (key, is_hidden) = split_hidden_prefix(&raw_key);
            let value = RawScalar::from_value(value).into_scalar().unwrap_or_else(|| {
                report.warn(ImportWarning::MalformedRequirement {
                    chapter: chapter.to_string(),
                    choice: choice.to_string(),
                    section,
                    key: key.to_string(),
                });
                ScalarValue::default()
            });
            RequirementDetail::new(key, value, is_cost, is_hidden)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(json: &str) -> ImportedStory {
        import_story(json).unwrap()
    }

    #[test]
    fn rejects_missing_chapters() {
        assert!(matches!(
            import_story(r#"{"start": "1"}"#),
            Err(ImportError::MissingChapters)
        ));
        assert!(matches!(
            import_story(r#"{"chapters": []}"#),
            Err(ImportError::MissingChapters)
        ));
        assert!(matches!(import_story("{"), Err(ImportError::Parse(_))));
        assert!(matches!(
            import_story(r#"{"chapters": {"1": 5}}"#),
            Err(ImportError::MalformedChapter { .. })
        ));
    }

    #[test]
    fn symbolic_keys_get_ids_above_numeric_max() {
        let mut report = ImportReport::default();
        let ids = ChapterIdMap::build(["intro", "4", "2", "end"], &mut report).unwrap();
        assert_eq!(ids.id_for_key("4"), Some(ChapterId(4)));
        assert_eq!(ids.id_for_key("2"), Some(ChapterId(2)));
        assert_eq!(ids.id_for_key("intro"), Some(ChapterId(5)));
        assert_eq!(ids.id_for_key("end"), Some(ChapterId(6)));
        assert!(report.is_clean());
    }

    #[test]
    fn duplicate_numbers_are_reassigned() {
        let mut report = ImportReport::default();
        let ids = ChapterIdMap::build(["1", "01"], &mut report).unwrap();
        assert_eq!(ids.id_for_key("1"), Some(ChapterId(1)));
        assert_eq!(ids.id_for_key("01"), Some(ChapterId(2)));
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn symbolic_keys_wrap_below_the_top_id() {
        let imported = import(
            r#"{"chapters": {"4294967295": {}, "a": {}, "b": {}}, "start": "a"}"#,
        );
        let ids: HashSet<u32> = imported.story.chapters.iter().map(|c| c.id.get()).collect();
        assert_eq!(ids, HashSet::from([u32::MAX, 1, 2]));
        let start = imported.story.start_chapter().unwrap();
        assert_eq!((start.id, start.title.as_str()), (ChapterId(1), "a"));
        assert!(imported.report.is_clean());
    }

    #[test]
    fn wrapped_ids_skip_numbers_already_in_use() {
        let mut report = ImportReport::default();
        let ids = ChapterIdMap::build(["1", "4294967295", "x", "y"], &mut report).unwrap();
        assert_eq!(ids.id_for_key("x"), Some(ChapterId(2)));
        assert_eq!(ids.id_for_key("y"), Some(ChapterId(3)));
    }

    #[test]
    fn references_resolve_by_key_title_or_number() {
        let mut report = ImportReport::default();
        let ids = ChapterIdMap::build(["1", "Cave"], &mut report).unwrap();
        assert_eq!(ids.resolve("1"), Some(ChapterId(1)));
        assert_eq!(ids.resolve("Cap 1"), Some(ChapterId(1)));
        assert_eq!(ids.resolve("Cave"), Some(ChapterId(2)));
        assert_eq!(ids.resolve("01"), Some(ChapterId(1)));
        assert_eq!(ids.resolve("2"), None);
    }

    #[test]
    fn titles_follow_key_kind() {
        assert_eq!(chapter_title("3"), "Cap 3");
        assert_eq!(chapter_title("Forest"), "Forest");
    }

    #[test]
    fn text_escapes_are_unescaped() {
        let imported = import(r#"{"chapters": {"1": {"text": "line\\nnext", "choices": []}}, "start": "1"}"#);
        assert_eq!(imported.story.chapters[0].text, "line\nnext");
    }

    #[test]
    fn plain_targets_share_probability() {
        let imported = import(
            r#"{"chapters": {
                "1": {"text": "", "choices": [{"text": "go", "targets": ["2", "3", "2", "2"]}]},
                "2": {"text": ""}, "3": {"text": ""}
            }, "start": "1"}"#,
        );
        let targets = &imported.story.chapters[0].choices[0].targets;
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0], Target::new(ChapterId(2), 75));
        assert_eq!(targets[1], Target::new(ChapterId(3), 25));
    }

    #[test]
    fn weighted_targets_are_copied_with_coercion() {
        let imported = import(
            r#"{"chapters": {
                "1": {"text": "", "choices": [{"text": "go", "targets": [
                    {"targetId": 2, "probability": "70"},
                    {"targetId": "3", "probability": 30}
                ]}]},
                "2": {"text": ""}, "3": {"text": ""}
            }, "start": 1}"#,
        );
        let targets = &imported.story.chapters[0].choices[0].targets;
        assert_eq!(targets[0], Target::new(ChapterId(2), 70));
        assert_eq!(targets[1], Target::new(ChapterId(3), 30));
        assert!(imported.story.chapters[0].is_start_chapter);
        assert!(imported.report.is_clean());
    }

    #[test]
    fn dangling_targets_are_dropped_with_warning() {
        let imported = import(
            r#"{"chapters": {
                "1": {"text": "", "choices": [{"text": "go", "targets": ["2", "ghost"]}]},
                "2": {"text": ""}
            }, "start": "1"}"#,
        );
        let choice = &imported.story.chapters[0].choices[0];
        assert_eq!(choice.targets.len(), 1);
        assert_eq!(choice.targets[0].probability, 100);
        assert!(imported.report.warnings.iter().any(|w| matches!(
            w,
            ImportWarning::UnresolvedTarget { reference, .. } if reference == "ghost"
        )));
    }

    #[test]
    fn unresolved_start_falls_back_to_first_chapter() {
        let imported = import(r#"{"chapters": {"b": {"text": ""}, "a": {"text": ""}}, "start": "zzz"}"#);
        assert!(imported.story.chapters[0].is_start_chapter);
        assert!(!imported.story.chapters[1].is_start_chapter);
        assert!(matches!(
            imported.report.warnings[0],
            ImportWarning::StartFallback { .. }
        ));
    }

    #[test]
    fn on_start_accepts_flat_and_structured_values() {
        let imported = import(
            r##"{"chapters": {"1": {"text": "", "on_start": {
                "#gold": 10,
                "@seen": "yes",
                "torch": {"value": 1, "isHidden": true},
                "broken": [1, 2]
            }}}, "start": "1"}"##,
        );
        let items = &imported.story.chapters[0].on_start;
        assert_eq!(items.len(), 4);
        assert_eq!((items[0].key.as_str(), items[0].is_hidden), ("gold", true));
        assert_eq!(items[0].value, ScalarValue::from(10_i64));
        assert_eq!((items[1].key.as_str(), items[1].is_hidden), ("seen", true));
        assert_eq!(items[1].value, ScalarValue::from("yes"));
        assert_eq!((items[2].key.as_str(), items[2].is_hidden), ("torch", true));
        assert_eq!(items[2].value, ScalarValue::from(1_i64));
        assert_eq!(items[3].value, ScalarValue::default());
        assert_eq!(imported.report.warnings.len(), 1);
    }

    #[test]
    fn requirement_and_cost_merge_into_one_collection() {
        let imported = import(
            r##"{"chapters": {
                "1": {"text": "", "choices": [{"text": "pay", "targets": ["2"],
                    "requirement": {"#gold": 5}, "cost": {"gold": 2, "@key": "brass"}}]},
                "2": {"text": ""}
            }, "start": "1"}"##,
        );
        let entries: Vec<_> = imported.story.chapters[0].choices[0].requirement.iter().collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].key, "gold");
        assert!(entries[0].is_hidden && !entries[0].is_cost);
        assert_eq!(entries[0].value, ScalarValue::from(5_i64));
        assert!(entries[1].is_cost && !entries[1].is_hidden);
        assert_eq!(entries[2].value, ScalarValue::from("brass"));
        assert!(entries[2].is_cost && entries[2].is_hidden);
        assert_ne!(entries[0].id, entries[1].id);
    }

    #[test]
    fn default_resources_are_read_from_story_documents() {
        let imported = import(r##"{"chapters": {}, "default_resources": {"#hp": 10, "gold": "3"}}"##);
        let resources = imported.default_resources.unwrap();
        assert_eq!(resources.len(), 2);
        assert!(resources[0].is_hidden);
        assert_eq!(resources[1].value, serde_json::Number::from(3));
    }
}
