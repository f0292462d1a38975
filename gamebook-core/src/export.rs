//! Story exporter: editable model to wire JSON.
//!
//! The wire format has no probability field. Weighted branching is written
//! as a list of chapter titles where each title repeats in proportion to its
//! probability, reduced by the GCD of all probabilities and shuffled.

use once_cell::sync::Lazy;
use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::borrow::Cow;
use thiserror::Error;

use crate::constants::GAME_TAG;
use crate::keys::hidden_key;
use crate::model::{Chapter, ChapterId, Choice, Story, Target};
use crate::numbers::gcd_all;
use crate::settings::EditorSettings;
use crate::wire::{WireChapter, WireChoice, WireDocument};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("chapter \"{chapter}\" choice \"{choice}\" points at missing chapter {target}")]
    UnknownTarget {
        chapter: String,
        choice: String,
        target: ChapterId,
    },
    #[error("chapter \"{chapter}\" choice \"{choice}\" target probabilities sum to {sum}%, not 100%")]
    ProbabilityMismatch {
        chapter: String,
        choice: String,
        sum: u32,
    },
    #[error("chapter title \"{title}\" is used more than once")]
    DuplicateTitle { title: String },
    #[error("no chapter is marked as the start chapter")]
    MissingStart,
    #[error("failed to serialize story: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Rewrite multi-line `targets` arrays onto one line.
    pub collapse_target_arrays: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            collapse_target_arrays: true,
        }
    }
}

impl From<&EditorSettings> for ExportOptions {
    fn from(settings: &EditorSettings) -> Self {
        Self {
            collapse_target_arrays: settings.collapse_target_arrays,
        }
    }
}

/// Copies of each target in the encoded list.
///
/// Repeated ids are merged first, then every probability is divided by the
/// GCD of all of them. Zero-probability targets get no copies.
#[must_use]
pub fn target_multiplicities(targets: &[Target]) -> Vec<(ChapterId, u32)> {
    let mut merged: Vec<(ChapterId, u32)> = Vec::with_capacity(targets.len());
    for target in targets {
        match merged.iter_mut().find(|(id, _)| *id == target.target_id) {
            Some((_, probability)) => *probability = probability.saturating_add(target.probability),
            None => merged.push((target.target_id, target.probability)),
        }
    }
    let divisor = gcd_all(merged.iter().map(|(_, probability)| *probability));
    merged
        .into_iter()
        .map(|(id, probability)| (id, probability / divisor))
        .collect()
}

fn resolve_title<'a>(
    story: &'a Story,
    chapter: &Chapter,
    choice: &Choice,
    target: ChapterId,
) -> Result<&'a str, ExportError> {
    story
        .title_of(target)
        .ok_or_else(|| ExportError::UnknownTarget {
            chapter: chapter.title.clone(),
            choice: choice.text.clone(),
            target,
        })
}

fn encode_targets<R: Rng + ?Sized>(
    story: &Story,
    chapter: &Chapter,
    choice: &Choice,
    rng: &mut R,
) -> Result<Vec<String>, ExportError> {
    match choice.targets.as_slice() {
        [] => Ok(vec![String::new()]),
        [only] => Ok(vec![
            resolve_title(story, chapter, choice, only.target_id)?.to_string(),
        ]),
        targets => {
            // Copies per title are bounded by 100 only for a closed choice.
            if !choice.probabilities_closed() {
                return Err(ExportError::ProbabilityMismatch {
                    chapter: chapter.title.clone(),
                    choice: choice.text.clone(),
                    sum: choice.probability_sum(),
                });
            }
            let mut encoded = Vec::new();
            for (id, copies) in target_multiplicities(targets) {
                let title = resolve_title(story, chapter, choice, id)?;
                encoded.extend(std::iter::repeat_n(title.to_string(), copies as usize));
            }
            encoded.shuffle(rng);
            Ok(encoded)
        }
    }
}

/// Insert a keyed entry, warning when it replaces an earlier one.
fn insert_keyed(
    map: &mut Map<String, Value>,
    key: String,
    value: Value,
    owner: &str,
    section: &str,
) {
    if map.contains_key(&key) {
        log::warn!("{owner} repeats {section} key \"{key}\"; the last value is exported");
    }
    map.insert(key, value);
}

fn encode_choice<R: Rng + ?Sized>(
    story: &Story,
    chapter: &Chapter,
    choice: &Choice,
    rng: &mut R,
) -> Result<WireChoice, ExportError> {
    let owner = format!("chapter \"{}\" choice \"{}\"", chapter.title, choice.text);
    let mut requirement = Map::new();
    let mut cost = Map::new();
    for detail in &choice.requirement {
        let (section, name) = if detail.is_cost {
            (&mut cost, "cost")
        } else {
            (&mut requirement, "requirement")
        };
        insert_keyed(
            section,
            hidden_key(&detail.key, detail.is_hidden),
            detail.value.coerce_numeric().into(),
            &owner,
            name,
        );
    }

    Ok(WireChoice {
        targets: encode_targets(story, chapter, choice, rng)?,
        text: choice.text.clone(),
        cost: Some(cost).filter(|map| !map.is_empty()),
        requirement: Some(requirement).filter(|map| !map.is_empty()),
    })
}

fn encode_chapter<R: Rng + ?Sized>(
    story: &Story,
    chapter: &Chapter,
    rng: &mut R,
) -> Result<WireChapter, ExportError> {
    let choices = chapter
        .choices
        .iter()
        .map(|choice| encode_choice(story, chapter, choice, rng))
        .collect::<Result<Vec<_>, _>>()?;

    let owner = format!("chapter \"{}\"", chapter.title);
    let mut on_start = Map::new();
    for item in &chapter.on_start {
        insert_keyed(
            &mut on_start,
            hidden_key(&item.key, item.is_hidden),
            item.value.clone().into(),
            &owner,
            "on_start",
        );
    }

    Ok(WireChapter {
        choices,
        image: chapter.image.clone().unwrap_or_default(),
        text: chapter.text.clone(),
        on_start: Some(on_start).filter(|map| !map.is_empty()),
    })
}

/// Build the wire document for a story.
///
/// # Errors
///
/// Fails on a target that names a missing chapter, a multi-target choice
/// whose probabilities do not sum to 100, a repeated chapter title, or when
/// no chapter is flagged as start.
pub fn to_wire<R: Rng + ?Sized>(story: &Story, rng: &mut R) -> Result<WireDocument, ExportError> {
    let start = story
        .start_chapter()
        .map(|chapter| chapter.title.clone())
        .ok_or(ExportError::MissingStart)?;

    let mut chapters = Map::new();
    for chapter in &story.chapters {
        if chapters.contains_key(&chapter.title) {
            return Err(ExportError::DuplicateTitle {
                title: chapter.title.clone(),
            });
        }
        let encoded = serde_json::to_value(encode_chapter(story, chapter, rng)?)?;
        chapters.insert(chapter.title.clone(), encoded);
    }

    Ok(WireDocument {
        chapters,
        game: GAME_TAG.to_string(),
        start,
    })
}

static MULTILINE_TARGETS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""targets": \[\n\s*"(?:[^"\\]|\\.)*"(?:,\n\s*"(?:[^"\\]|\\.)*")*\n\s*\]"#)
        .expect("valid regex")
});

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*").expect("valid regex"));

/// Put every pretty-printed `targets` array of string titles on one line.
#[must_use]
pub fn collapse_target_arrays(json: &str) -> Cow<'_, str> {
    MULTILINE_TARGETS.replace_all(json, |caps: &Captures<'_>| {
        LINE_BREAK.replace_all(&caps[0], "").into_owned()
    })
}

/// Serialize a story to wire JSON, shuffling repeated targets with `rng`.
///
/// # Errors
///
/// See [`to_wire`]; also fails if serialization fails.
pub fn export_story<R: Rng + ?Sized>(
    story: &Story,
    options: &ExportOptions,
    rng: &mut R,
) -> Result<String, ExportError> {
    let document = to_wire(story, rng)?;
    let json = serde_json::to_string_pretty(&document)?;
    log::debug!("exported {} chapters", story.len());
    if options.collapse_target_arrays {
        Ok(collapse_target_arrays(&json).into_owned())
    } else {
        Ok(json)
    }
}

/// [`export_story`] with a reproducible shuffle.
///
/// # Errors
///
/// See [`export_story`].
pub fn export_story_seeded(
    story: &Story,
    options: &ExportOptions,
    seed: u64,
) -> Result<String, ExportError> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    export_story(story, options, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OnStartItem, RequirementDetail};
    use serde_json::Value;

    fn story_with_targets(targets: &[(u32, u32)]) -> Story {
        let mut start = Chapter::new(ChapterId(1), "Start");
        start.is_start_chapter = true;
        let mut choice = Choice::new("go");
        choice.targets = targets
            .iter()
            .map(|&(id, p)| Target::new(ChapterId(id), p))
            .collect();
        start.choices.push(choice);
        Story {
            chapters: vec![
                start,
                Chapter::new(ChapterId(2), "Left"),
                Chapter::new(ChapterId(3), "Right"),
                Chapter::new(ChapterId(4), "Down"),
            ],
        }
    }

    fn exported(story: &Story) -> Value {
        let text = export_story_seeded(story, &ExportOptions::default(), 7).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    fn count(list: &Value, title: &str) -> usize {
        list.as_array()
            .unwrap()
            .iter()
            .filter(|entry| entry.as_str() == Some(title))
            .count()
    }

    #[test]
    fn multiplicities_reduce_by_gcd() {
        let targets = [
            Target::new(ChapterId(2), 50),
            Target::new(ChapterId(3), 30),
            Target::new(ChapterId(4), 20),
        ];
        assert_eq!(
            target_multiplicities(&targets),
            vec![(ChapterId(2), 5), (ChapterId(3), 3), (ChapterId(4), 2)]
        );
        let coprime = [
            Target::new(ChapterId(2), 33),
            Target::new(ChapterId(3), 33),
            Target::new(ChapterId(4), 34),
        ];
        let total: u32 = target_multiplicities(&coprime).iter().map(|(_, n)| n).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn repeated_ids_merge_before_reduction() {
        let targets = [
            Target::new(ChapterId(2), 25),
            Target::new(ChapterId(3), 50),
            Target::new(ChapterId(2), 25),
        ];
        assert_eq!(
            target_multiplicities(&targets),
            vec![(ChapterId(2), 1), (ChapterId(3), 1)]
        );
    }

    #[test]
    fn weighted_targets_repeat_titles() {
        let doc = exported(&story_with_targets(&[(2, 50), (3, 30), (4, 20)]));
        let targets = &doc["chapters"]["Start"]["choices"][0]["targets"];
        assert_eq!(count(targets, "Left"), 5);
        assert_eq!(count(targets, "Right"), 3);
        assert_eq!(count(targets, "Down"), 2);
    }

    #[test]
    fn single_and_empty_target_lists() {
        let doc = exported(&story_with_targets(&[(3, 100)]));
        assert_eq!(doc["chapters"]["Start"]["choices"][0]["targets"], serde_json::json!(["Right"]));
        let doc = exported(&story_with_targets(&[]));
        assert_eq!(doc["chapters"]["Start"]["choices"][0]["targets"], serde_json::json!([""]));
    }

    #[test]
    fn chapter_fields_follow_wire_order() {
        let mut story = story_with_targets(&[(2, 100)]);
        story.chapters[0].image = Some("a.png".to_string());
        story.chapters[0]
            .on_start
            .push(OnStartItem::new("gold", 3_i64, true));
        let text = export_story_seeded(&story, &ExportOptions::default(), 1).unwrap();
        let choices = text.find("\"choices\"").unwrap();
        let image = text.find("\"image\"").unwrap();
        let body = text.find("\"text\": \"\"").unwrap();
        let on_start = text.find("\"on_start\"").unwrap();
        assert!(choices < image && image < body && body < on_start);
        assert!(text.contains("\"#gold\": 3"));
        assert!(!text.contains("\"on_start\": {}"));

        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["game"], "game");
        assert_eq!(doc["start"], "Start");
        assert_eq!(doc["chapters"]["Left"]["image"], "");
        assert!(doc["chapters"]["Left"].get("on_start").is_none());
    }

    #[test]
    fn requirement_and_cost_are_split_and_coerced() {
        let mut story = story_with_targets(&[(2, 100)]);
        let choice = &mut story.chapters[0].choices[0];
        choice
            .requirement
            .insert(RequirementDetail::new("gold", "5".into(), false, true));
        choice
            .requirement
            .insert(RequirementDetail::new("torch", "lit".into(), true, false));
        let doc = exported(&story);
        let wire = &doc["chapters"]["Start"]["choices"][0];
        assert_eq!(wire["requirement"], serde_json::json!({"#gold": 5}));
        assert_eq!(wire["cost"], serde_json::json!({"torch": "lit"}));
        assert!(doc["chapters"]["Left"]["choices"].as_array().unwrap().is_empty());
    }

    #[test]
    fn on_start_values_keep_their_kind() {
        let mut story = story_with_targets(&[(2, 100)]);
        story.chapters[0].on_start = vec![
            OnStartItem::new("gold", 3_i64, false),
            OnStartItem::new("door", "3", false),
            OnStartItem::new("mood", "grim", true),
        ];
        let doc = exported(&story);
        assert_eq!(
            doc["chapters"]["Start"]["on_start"],
            serde_json::json!({"gold": 3, "door": "3", "#mood": "grim"})
        );
    }

    #[test]
    fn repeated_keys_keep_the_last_value_in_first_position() {
        let mut story = story_with_targets(&[(2, 100)]);
        let choice = &mut story.chapters[0].choices[0];
        for (key, value) in [("gold", "5"), ("torch", "1"), ("gold", "9")] {
            choice
                .requirement
                .insert(RequirementDetail::new(key, value.into(), false, true));
        }
        let text = export_story_seeded(&story, &ExportOptions::default(), 1).unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();
        let requirement = doc["chapters"]["Start"]["choices"][0]["requirement"]
            .as_object()
            .unwrap();
        let keys: Vec<&str> = requirement.keys().map(String::as_str).collect();
        assert_eq!(keys, ["#gold", "#torch"]);
        assert_eq!(requirement["#gold"], 9);
    }

    #[test]
    fn chapters_keep_story_order() {
        let text =
            export_story_seeded(&story_with_targets(&[(2, 100)]), &ExportOptions::default(), 1)
                .unwrap();
        let positions: Vec<usize> = ["\"Start\": {", "\"Left\": {", "\"Right\": {", "\"Down\": {"]
            .iter()
            .map(|key| text.find(key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn open_weighted_choice_is_not_expanded() {
        let story = story_with_targets(&[(2, 1_000_000), (3, 1)]);
        let result = export_story_seeded(&story, &ExportOptions::default(), 0);
        assert!(matches!(
            result,
            Err(ExportError::ProbabilityMismatch { sum: 1_000_001, .. })
        ));
        let story = story_with_targets(&[(2, 60), (3, 30)]);
        assert!(matches!(
            export_story_seeded(&story, &ExportOptions::default(), 0),
            Err(ExportError::ProbabilityMismatch { sum: 90, .. })
        ));
    }

    #[test]
    fn target_patterns_compile() {
        assert!(MULTILINE_TARGETS.is_match("\"targets\": [\n  \"a\"\n]"));
        assert!(LINE_BREAK.is_match("\n    "));
    }

    #[test]
    fn collapse_puts_targets_on_one_line() {
        let text = export_story_seeded(
            &story_with_targets(&[(2, 50), (3, 50)]),
            &ExportOptions::default(),
            3,
        )
        .unwrap();
        let line = text
            .lines()
            .find(|line| line.contains("\"targets\""))
            .unwrap();
        assert!(line.trim_end().ends_with("],"));

        let pretty = export_story_seeded(
            &story_with_targets(&[(2, 50), (3, 50)]),
            &ExportOptions {
                collapse_target_arrays: false,
            },
            3,
        )
        .unwrap();
        assert!(pretty.contains("\"targets\": [\n"));
    }

    #[test]
    fn collapse_handles_escaped_quotes() {
        let input = "\"targets\": [\n      \"say \\\"hi\\\"\",\n      \"b\"\n    ]";
        assert_eq!(
            collapse_target_arrays(input),
            "\"targets\": [\"say \\\"hi\\\"\",\"b\"]"
        );
    }

    #[test]
    fn seeded_export_is_reproducible() {
        let story = story_with_targets(&[(2, 50), (3, 30), (4, 20)]);
        let options = ExportOptions::default();
        assert_eq!(
            export_story_seeded(&story, &options, 42).unwrap(),
            export_story_seeded(&story, &options, 42).unwrap()
        );
    }

    #[test]
    fn export_rejects_broken_stories() {
        let mut story = story_with_targets(&[(9, 100)]);
        assert!(matches!(
            export_story_seeded(&story, &ExportOptions::default(), 0),
            Err(ExportError::UnknownTarget { .. })
        ));
        story.chapters[0].choices.clear();
        story.chapters[2].title = "Left".to_string();
        assert!(matches!(
            export_story_seeded(&story, &ExportOptions::default(), 0),
            Err(ExportError::DuplicateTitle { .. })
        ));
        story.chapters[0].is_start_chapter = false;
        assert!(matches!(
            export_story_seeded(&story, &ExportOptions::default(), 0),
            Err(ExportError::MissingStart)
        ));
    }
}
