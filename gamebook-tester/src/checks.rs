//! Checks run against each story document.
//!
//! Every input file is imported once. The imported story then feeds the
//! validation, round-trip and graph checks, so an import failure ends the
//! run for that file.

use anyhow::{Context, Result};
use gamebook_core::{
    ExportOptions, Story, StoryGraph, export_story_seeded, import_story, lint_duplicate_keys,
    lint_images, validate_all, validate_for_export,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::util::file_label;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Import,
    Validate,
    RoundTrip,
    Graph,
}

impl CheckKind {
    pub const ALL: [Self; 4] = [Self::Import, Self::Validate, Self::RoundTrip, Self::Graph];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Validate => "validate",
            Self::RoundTrip => "roundtrip",
            Self::Graph => "graph",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Import => "Parse the document and report recoverable anomalies",
            Self::Validate => "Run the pre-export validation sequence and lint images",
            Self::RoundTrip => "Export, re-import and compare target distributions",
            Self::Graph => "Report unreachable chapters, dead ends and missing targets",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

pub fn list_checks() -> Vec<(&'static str, &'static str)> {
    CheckKind::ALL
        .iter()
        .map(|kind| (kind.key(), kind.description()))
        .collect()
}

/// Outcome of one check against one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub file: String,
    pub check: String,
    pub passed: bool,
    /// Non-fatal observations such as import warnings.
    pub notes: Vec<String>,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl CheckResult {
    fn new(file: &str, kind: CheckKind) -> Self {
        Self {
            file: file.to_string(),
            check: kind.key().to_string(),
            passed: true,
            notes: Vec::new(),
            failures: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    fn fail(&mut self, failure: impl Into<String>) {
        self.passed = false;
        self.failures.push(failure.into());
    }

    fn finish(mut self, started: Instant) -> Self {
        self.duration = started.elapsed();
        self
    }
}

#[derive(Debug, Clone)]
pub struct CheckContext {
    pub seed: u64,
    pub options: ExportOptions,
    /// Directory receiving re-exported documents, if any.
    pub normalize_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl Default for CheckContext {
    fn default() -> Self {
        Self {
            seed: 1,
            options: ExportOptions::default(),
            normalize_dir: None,
            verbose: false,
        }
    }
}

pub struct DocumentChecker {
    ctx: CheckContext,
}

impl DocumentChecker {
    pub const fn new(ctx: CheckContext) -> Self {
        Self { ctx }
    }

    /// Run `checks` against the file at `path`, in the order given.
    pub fn run_file(&self, path: &Path, checks: &[CheckKind]) -> Vec<CheckResult> {
        let label = file_label(path);
        let started = Instant::now();
        let mut import = CheckResult::new(&label, CheckKind::Import);

        let story = match read_story(path) {
            Ok((story, warnings)) => {
                import.notes = warnings;
                story
            }
            Err(err) => {
                log::error!("{label}: {err:#}");
                import.fail(format!("{err:#}"));
                return vec![import.finish(started)];
            }
        };
        let import = import.finish(started);
        if self.ctx.verbose {
            println!("📖 {label}: {} chapters", story.len());
        }

        let mut results = Vec::new();
        for kind in checks {
            let result = match kind {
                CheckKind::Import => import.clone(),
                CheckKind::Validate => check_validate(&label, &story),
                CheckKind::RoundTrip => self.check_round_trip(&label, &story),
                CheckKind::Graph => check_graph(&label, &story),
            };
            if self.ctx.verbose {
                let status = if result.passed { "✅" } else { "❌" };
                println!("  {status} {} ({:?})", result.check, result.duration);
            }
            results.push(result);
        }
        results
    }

    fn check_round_trip(&self, label: &str, story: &Story) -> CheckResult {
        let started = Instant::now();
        let mut result = CheckResult::new(label, CheckKind::RoundTrip);

        if let Err(err) = validate_for_export(story) {
            result.fail(format!("not exportable: {err}"));
            return result.finish(started);
        }
        let exported = match export_story_seeded(story, &self.ctx.options, self.ctx.seed) {
            Ok(text) => text,
            Err(err) => {
                result.fail(format!("export failed: {err}"));
                return result.finish(started);
            }
        };
        if let Some(dir) = &self.ctx.normalize_dir
            && let Err(err) = write_normalized(dir, label, &exported)
        {
            result.fail(format!("{err:#}"));
        }

        let reimported = match import_story(&exported) {
            Ok(imported) => imported,
            Err(err) => {
                result.fail(format!("re-import failed: {err}"));
                return result.finish(started);
            }
        };
        result.notes = reimported
            .report
            .warnings
            .iter()
            .map(ToString::to_string)
            .collect();

        let again = &reimported.story;
        if again.len() != story.len() {
            result.fail(format!(
                "chapter count changed from {} to {}",
                story.len(),
                again.len()
            ));
        }
        let start_title = |story: &Story| story.start_chapter().map(|c| c.title.clone());
        if start_title(again) != start_title(story) {
            result.fail(format!(
                "start chapter changed from {:?} to {:?}",
                start_title(story),
                start_title(again)
            ));
        }

        let before = distribution(story);
        let after = distribution(again);
        for (place, shares) in &before {
            match after.get(place) {
                Some(other) if other == shares => {}
                Some(other) => result.fail(format!(
                    "chapter \"{}\" choice #{}: {shares:?} became {other:?}",
                    place.0, place.1
                )),
                None => result.fail(format!(
                    "chapter \"{}\" choice #{} is missing after re-import",
                    place.0, place.1
                )),
            }
        }
        result.finish(started)
    }
}

fn read_story(path: &Path) -> Result<(Story, Vec<String>)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let imported = import_story(&text)?;
    let warnings = imported
        .report
        .warnings
        .iter()
        .map(ToString::to_string)
        .collect();
    Ok((imported.story, warnings))
}

fn write_normalized(dir: &Path, label: &str, contents: &str) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(label);
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("normalized document written to {}", path.display());
    Ok(())
}

fn check_validate(label: &str, story: &Story) -> CheckResult {
    let started = Instant::now();
    let mut result = CheckResult::new(label, CheckKind::Validate);
    for error in validate_all(story) {
        result.fail(error.to_string());
    }
    result.notes = lint_images(story).iter().map(ToString::to_string).collect();
    result
        .notes
        .extend(lint_duplicate_keys(story).iter().map(ToString::to_string));
    result.finish(started)
}

fn check_graph(label: &str, story: &Story) -> CheckResult {
    let started = Instant::now();
    let mut result = CheckResult::new(label, CheckKind::Graph);
    let graph = StoryGraph::from_story(story);
    let title = |id| story.title_of(id).unwrap_or("?").to_string();

    for edge in graph.missing_targets() {
        result.fail(format!(
            "chapter \"{}\" choice \"{}\" points at missing chapter {}",
            title(edge.source),
            edge.choice,
            edge.target
        ));
    }
    if story.start_chapter().is_none() {
        result.notes.push("no start chapter; reachability not checked".to_string());
    } else {
        let unreachable: Vec<String> = graph.unreachable_chapters().into_iter().map(title).collect();
        if !unreachable.is_empty() {
            result
                .notes
                .push(format!("unreachable chapters: {}", unreachable.join(", ")));
        }
    }
    let dead_ends: Vec<String> = graph.dead_ends().into_iter().map(title).collect();
    if !dead_ends.is_empty() {
        result.notes.push(format!("dead ends: {}", dead_ends.join(", ")));
    }

    let stats = graph.stats();
    result.notes.push(format!(
        "{} chapters, {} edges, {} reachable",
        stats.total_nodes, stats.total_edges, stats.reachable_nodes
    ));
    result.finish(started)
}

/// Probability per destination title, keyed by chapter title and choice index.
fn distribution(story: &Story) -> BTreeMap<(String, usize), BTreeMap<String, u32>> {
    let mut out = BTreeMap::new();
    for chapter in &story.chapters {
        for (index, choice) in chapter.choices.iter().enumerate() {
            let shares = choice
                .targets
                .iter()
                .map(|target| {
                    let title = story
                        .title_of(target.target_id)
                        .map_or_else(|| target.target_id.to_string(), str::to_string);
                    (title, target.probability)
                })
                .collect();
            out.insert((chapter.title.clone(), index), shares);
        }
    }
    out
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}
