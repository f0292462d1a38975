mod checks;
mod reports;
mod util;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use gamebook_core::{EditorSettings, ExportOptions};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use checks::{CheckContext, CheckKind, CheckResult, DocumentChecker, list_checks};
use util::split_csv;

#[derive(Debug, Parser)]
#[command(name = "gamebook-tester", version = "0.1.0")]
#[command(about = "Import, validate and round-trip gamebook story documents")]
struct Args {
    /// Story documents to check
    files: Vec<PathBuf>,

    /// Checks to run (comma-separated, or "all")
    #[arg(long, default_value = "all")]
    checks: String,

    /// List all available checks and exit
    #[arg(long)]
    list_checks: bool,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write each re-exported document into this directory
    #[arg(long)]
    normalize_dir: Option<PathBuf>,

    /// Seed for the exported target shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Editor settings file (JSON)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_checks(&args)? {
        return Ok(());
    }
    if args.files.is_empty() {
        bail!("no story documents given; pass one or more files or use --list-checks");
    }

    announce_banner();

    let start_time = Instant::now();
    let checks = expand_checks(&args.checks)?;
    let ctx = build_context(&args)?;
    let checker = DocumentChecker::new(ctx);

    let results: Vec<CheckResult> = args
        .files
        .iter()
        .flat_map(|path| checker.run_file(path, &checks))
        .collect();

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_checks(args: &Args) -> Result<bool> {
    if !args.list_checks {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available checks:")?;
    for (key, description) in list_checks() {
        writeln!(output_target.writer(), "  {key:12} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "📚 Gamebook Document Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_checks(checks_arg: &str) -> Result<Vec<CheckKind>> {
    let mut checks = Vec::new();
    for name in split_csv(checks_arg) {
        let expanded: Vec<CheckKind> = if name == "all" {
            CheckKind::ALL.to_vec()
        } else {
            match CheckKind::from_key(&name) {
                Some(kind) => vec![kind],
                None => bail!("unknown check: {name}"),
            }
        };
        for kind in expanded {
            if !checks.contains(&kind) {
                checks.push(kind);
            }
        }
    }
    if checks.is_empty() {
        bail!("no checks selected");
    }
    Ok(checks)
}

fn load_settings(args: &Args) -> Result<EditorSettings> {
    let Some(path) = &args.settings else {
        return Ok(EditorSettings::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    EditorSettings::from_json(&text)
        .with_context(|| format!("invalid settings in {}", path.display()))
}

fn build_context(args: &Args) -> Result<CheckContext> {
    let settings = load_settings(args)?;
    let seed = args.seed.or(settings.shuffle_seed).unwrap_or(1);
    log::debug!("export seed {seed}");
    Ok(CheckContext {
        seed,
        options: ExportOptions::from(&settings),
        normalize_dir: args.normalize_dir.clone(),
        verbose: args.verbose,
    })
}

fn write_reports(args: &Args, results: &[CheckResult], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Gamebook Document Checks\n\n_No checks executed._"
                )?;
            } else {
                reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() {
                writeln!(&mut output_target, "No checks executed.")?;
            } else {
                reports::generate_console_report(&mut output_target, results, duration)?;
            }
        }
    }

    // The JSON report stays parseable.
    if args.report != "json" {
        let duration = start_time.elapsed();
        writeln!(&mut output_target)?;
        writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn base_args() -> Args {
        Args {
            files: Vec::new(),
            checks: "all".to_string(),
            list_checks: false,
            report: "json".to_string(),
            output: None,
            normalize_dir: None,
            seed: None,
            settings: None,
            verbose: false,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("gamebook-{}-{name}", std::process::id()))
    }

    fn sample_result(passed: bool) -> CheckResult {
        CheckResult {
            file: "story.json".to_string(),
            check: "validate".to_string(),
            passed,
            notes: Vec::new(),
            failures: if passed {
                Vec::new()
            } else {
                vec!["You must mark one chapter as the start chapter.".to_string()]
            },
            duration: Duration::from_millis(2),
        }
    }

    #[test]
    fn expands_all_checks_keyword() {
        let expanded = expand_checks("graph,all").unwrap();
        assert_eq!(
            expanded,
            vec![
                CheckKind::Graph,
                CheckKind::Import,
                CheckKind::Validate,
                CheckKind::RoundTrip
            ]
        );
    }

    #[test]
    fn expand_checks_without_all_preserves_order() {
        let expanded = expand_checks("roundtrip, import").unwrap();
        assert_eq!(expanded, vec![CheckKind::RoundTrip, CheckKind::Import]);
    }

    #[test]
    fn expand_checks_rejects_unknown_and_empty() {
        assert!(expand_checks("import,lint").is_err());
        assert!(expand_checks(" , ").is_err());
    }

    #[test]
    fn seed_flag_overrides_settings() {
        let settings = temp_file("settings.json");
        std::fs::write(&settings, r#"{"shuffle_seed": 9, "collapse_target_arrays": false}"#)
            .unwrap();
        let args = Args {
            settings: Some(settings.clone()),
            ..base_args()
        };
        let ctx = build_context(&args).unwrap();
        assert_eq!(ctx.seed, 9);
        assert!(!ctx.options.collapse_target_arrays);

        let args = Args {
            settings: Some(settings),
            seed: Some(4),
            ..base_args()
        };
        assert_eq!(build_context(&args).unwrap().seed, 4);
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let args = Args {
            settings: Some(temp_file("absent-settings.json")),
            ..base_args()
        };
        assert!(build_context(&args).is_err());
    }

    #[test]
    fn write_reports_emits_json_output() {
        let temp = temp_file("report-empty.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert_eq!(content.trim(), "[]");
    }

    #[test]
    fn write_reports_emits_json_for_results() {
        let temp = temp_file("report-full.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(false)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value[0]["passed"], false);
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let temp = temp_file("report-empty.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("No checks executed"));
    }

    #[test]
    fn write_reports_emits_console_report() {
        let temp = temp_file("report.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(true)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Document Check Summary"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn maybe_list_checks_writes_output() {
        let temp = temp_file("checks.txt");
        let args = Args {
            list_checks: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_checks(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available checks"));
        assert!(content.contains("roundtrip"));
    }

    #[test]
    fn maybe_list_checks_returns_false_when_disabled() {
        assert!(!maybe_list_checks(&base_args()).unwrap());
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
