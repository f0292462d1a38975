//! Pre-export checks.
//!
//! Each check inspects the whole story and reports every offender it finds.
//! [`validate_for_export`] runs them in a fixed order and stops at the first
//! failing check.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::constants::{FULL_PROBABILITY, SUPPORTED_IMAGE_EXTENSIONS};
use crate::keys::hidden_key;
use crate::model::{ChapterId, Story};

/// A choice missing its text, its destination, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompleteChoice {
    pub chapter: String,
    pub choice: String,
    pub missing_text: bool,
    pub missing_target: bool,
}

impl fmt::Display for IncompleteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.choice.is_empty() {
            write!(f, "- Chapter: \"{}\", Choice: (unnamed)", self.chapter)?;
        } else {
            write!(f, "- Chapter: \"{}\", Choice: \"{}\"", self.chapter, self.choice)?;
        }
        if self.missing_text {
            f.write_str(" (no text)")?;
        }
        if self.missing_target {
            f.write_str(" (no destination)")?;
        }
        Ok(())
    }
}

/// A multi-target choice whose probabilities do not close at 100%.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbabilityIssue {
    pub chapter: String,
    pub choice: String,
    pub sum: u32,
}

impl fmt::Display for ProbabilityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "- Chapter: \"{}\", Choice: \"{}\" sums to {}%",
            self.chapter, self.choice, self.sum
        )
    }
}

/// A cross-reference that cannot survive export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceIssue {
    DanglingTarget {
        chapter: String,
        choice: String,
        target: ChapterId,
    },
    DuplicateTitle {
        title: String,
    },
    EmptyTitle {
        chapter: ChapterId,
    },
}

impl fmt::Display for ReferenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingTarget {
                chapter,
                choice,
                target,
            } => write!(
                f,
                "- Chapter: \"{chapter}\", Choice: \"{choice}\" points at missing chapter {target}"
            ),
            Self::DuplicateTitle { title } => {
                write!(f, "- Title \"{title}\" is used by more than one chapter")
            }
            Self::EmptyTitle { chapter } => write!(f, "- Chapter {chapter} has no title"),
        }
    }
}

fn lines<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The following choices are incomplete:\n{}", lines(.0))]
    IncompleteChoices(Vec<IncompleteChoice>),
    #[error("You must mark one chapter as the start chapter.")]
    MissingStartChapter,
    #[error("Only one chapter can be marked as the start chapter (marked: {}).", .titles.join(", "))]
    MultipleStartChapters { titles: Vec<String> },
    #[error("Target probabilities must add up to exactly 100%:\n{}", lines(.0))]
    ProbabilityMismatch(Vec<ProbabilityIssue>),
    #[error("The story has broken chapter references:\n{}", lines(.0))]
    BrokenReferences(Vec<ReferenceIssue>),
}

/// A single validation pass over the story.
pub type Check = fn(&Story) -> Result<(), ValidationError>;

/// Checks run before export, in order.
pub const EXPORT_CHECKS: [Check; 4] = [
    validate_choices,
    validate_start_chapter,
    validate_probabilities,
    validate_references,
];

/// Every choice has non-blank text and at least one target.
///
/// # Errors
///
/// Lists every incomplete choice.
pub fn validate_choices(story: &Story) -> Result<(), ValidationError> {
    let offenders: Vec<IncompleteChoice> = story
        .chapters
        .iter()
        .flat_map(|chapter| {
            chapter.choices.iter().filter_map(|choice| {
                let missing_text = choice.text.trim().is_empty();
                let missing_target = choice.targets.is_empty();
                (missing_text || missing_target).then(|| IncompleteChoice {
                    chapter: chapter.title.clone(),
                    choice: choice.text.clone(),
                    missing_text,
                    missing_target,
                })
            })
        })
        .collect();

    if offenders.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::IncompleteChoices(offenders))
    }
}

/// Exactly one chapter is flagged as the start chapter.
///
/// # Errors
///
/// Distinguishes a missing start chapter from several flagged ones.
pub fn validate_start_chapter(story: &Story) -> Result<(), ValidationError> {
    let titles: Vec<String> = story
        .start_chapters()
        .map(|chapter| chapter.title.clone())
        .collect();
    match titles.len() {
        0 => Err(ValidationError::MissingStartChapter),
        1 => Ok(()),
        _ => Err(ValidationError::MultipleStartChapters { titles }),
    }
}

/// Every choice with more than one target sums to exactly 100.
///
/// # Errors
///
/// Lists every choice whose sum differs.
pub fn validate_probabilities(story: &Story) -> Result<(), ValidationError> {
    let offenders: Vec<ProbabilityIssue> = story
        .chapters
        .iter()
        .flat_map(|chapter| {
            chapter
                .choices
                .iter()
                .filter(|choice| choice.targets.len() > 1)
                .filter_map(|choice| {
                    let sum = choice.probability_sum();
                    (sum != FULL_PROBABILITY).then(|| ProbabilityIssue {
                        chapter: chapter.title.clone(),
                        choice: choice.text.clone(),
                        sum,
                    })
                })
        })
        .collect();

    if offenders.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::ProbabilityMismatch(offenders))
    }
}

/// Targets resolve and titles can serve as unique export keys.
///
/// # Errors
///
/// Lists every dangling target, blank title and repeated title.
pub fn validate_references(story: &Story) -> Result<(), ValidationError> {
    let mut issues = Vec::new();
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for chapter in &story.chapters {
        if chapter.title.trim().is_empty() {
            issues.push(ReferenceIssue::EmptyTitle {
                chapter: chapter.id,
            });
        } else {
            let count = seen.entry(chapter.title.as_str()).or_insert(0);
            *count += 1;
            if *count == 2 {
                issues.push(ReferenceIssue::DuplicateTitle {
                    title: chapter.title.clone(),
                });
            }
        }

        for choice in &chapter.choices {
            for target in &choice.targets {
                if story.chapter(target.target_id).is_none() {
                    issues.push(ReferenceIssue::DanglingTarget {
                        chapter: chapter.title.clone(),
                        choice: choice.text.clone(),
                        target: target.target_id,
                    });
                }
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::BrokenReferences(issues))
    }
}

/// Run the export checks in order, stopping at the first failure.
///
/// # Errors
///
/// Returns the first failing check's error.
pub fn validate_for_export(story: &Story) -> Result<(), ValidationError> {
    EXPORT_CHECKS.iter().try_for_each(|check| check(story))
}

/// Run every export check and collect all failures.
#[must_use]
pub fn validate_all(story: &Story) -> Vec<ValidationError> {
    EXPORT_CHECKS
        .iter()
        .filter_map(|check| check(story).err())
        .collect()
}

/// A chapter image the player runtime may not display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageWarning {
    pub chapter: String,
    pub image: String,
}

impl fmt::Display for ImageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chapter \"{}\" uses image \"{}\"; use a .jpg or .png file",
            self.chapter, self.image
        )
    }
}

/// Non-fatal image extension warnings.
#[must_use]
pub fn lint_images(story: &Story) -> Vec<ImageWarning> {
    story
        .chapters
        .iter()
        .filter_map(|chapter| {
            let image = chapter.image.as_deref()?;
            let lower = image.to_ascii_lowercase();
            let supported = SUPPORTED_IMAGE_EXTENSIONS
                .iter()
                .any(|ext| lower.ends_with(ext));
            (!supported).then(|| ImageWarning {
                chapter: chapter.title.clone(),
                image: image.to_string(),
            })
        })
        .collect()
}

/// A key written more than once into the same exported object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKeyWarning {
    pub chapter: String,
    /// `None` for a chapter's `on_start` section.
    pub choice: Option<String>,
    pub section: &'static str,
    /// The key as exported, hidden prefix included.
    pub key: String,
}

impl fmt::Display for DuplicateKeyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chapter \"{}\"", self.chapter)?;
        if let Some(choice) = &self.choice {
            write!(f, " choice \"{choice}\"")?;
        }
        write!(
            f,
            " repeats {} key \"{}\"; only the last value is exported",
            self.section, self.key
        )
    }
}

/// Each key seen more than once, in first-repeat order.
fn repeated_keys(keys: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut repeated = Vec::new();
    for key in keys {
        let count = seen.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count == 2 {
            repeated.push(key);
        }
    }
    repeated
}

/// Non-fatal warnings for requirement, cost and on-start keys that collide
/// once hidden prefixes are applied.
#[must_use]
pub fn lint_duplicate_keys(story: &Story) -> Vec<DuplicateKeyWarning> {
    let mut warnings = Vec::new();
    for chapter in &story.chapters {
        for choice in &chapter.choices {
            for (section, is_cost) in [("requirement", false), ("cost", true)] {
                let keys = choice
                    .requirement
                    .iter()
                    .filter(|detail| detail.is_cost == is_cost)
                    .map(|detail| hidden_key(&detail.key, detail.is_hidden));
                warnings.extend(repeated_keys(keys).into_iter().map(|key| DuplicateKeyWarning {
                    chapter: chapter.title.clone(),
                    choice: Some(choice.text.clone()),
                    section,
                    key,
                }));
            }
        }
        let keys = chapter
            .on_start
            .iter()
            .map(|item| hidden_key(&item.key, item.is_hidden));
        warnings.extend(repeated_keys(keys).into_iter().map(|key| DuplicateKeyWarning {
            chapter: chapter.title.clone(),
            choice: None,
            section: "on_start",
            key,
        }));
    }
    warnings
}
