use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use fidelity_core::report::{ReportFormat, save_report};
use fidelity_core::{
    FidelityReport, FidelityScorer, ScorerConfig, SemanticJudge, SiteSnapshot, SnapshotDocument,
};
use fidelity_judge::{ChatCompletionsModel, JudgeConfig};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Environment variable holding the vision model API key.
pub const API_KEY_ENV: &str = "FIDELITY_JUDGE_API_KEY";

pub const EXIT_TARGET_MET: i32 = 0;
pub const EXIT_INPUT_ERROR: i32 = 1;
pub const EXIT_TARGET_MISSED: i32 = 2;

/// Contents of a `--config` file. Both sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FidelityConfig {
    pub scoring: ScorerConfig,
    /// Without a judge section (or `--judge-endpoint`) the semantic
    /// modality reports the neutral score.
    pub judge: Option<JudgeConfig>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ScoreOverrides {
    pub threshold: Option<f64>,
    pub canvas_width: Option<u32>,
    pub judge_timeout_secs: Option<u64>,
    pub judge_endpoint: Option<Url>,
    pub judge_model: Option<String>,
}

impl ScoreOverrides {
    pub fn from_matches(args: &ArgMatches) -> Self {
        Self {
            threshold: args.get_one::<f64>("threshold").copied(),
            canvas_width: args.get_one::<u32>("canvas-width").copied(),
            judge_timeout_secs: args.get_one::<u64>("judge-timeout").copied(),
            judge_endpoint: args.get_one::<Url>("judge-endpoint").cloned(),
            judge_model: args.get_one::<String>("judge-model").cloned(),
        }
    }
}

pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Expand a leading `~` in a user-supplied path.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// Load one side of a migration from a structural tree file and a
/// screenshot file.
pub fn load_snapshot(tree_path: &Path, image_path: &Path) -> Result<SiteSnapshot> {
    let tree_path = expand_path(tree_path);
    let image_path = expand_path(image_path);

    let tree = fs::read_to_string(&tree_path)
        .with_context(|| format!("Failed to read structural tree {}", tree_path.display()))?;
    let document = SnapshotDocument::from_json(&tree)
        .with_context(|| format!("Invalid structural tree in {}", tree_path.display()))?;

    // An undecodable (even empty) screenshot only degrades the visual score.
    let screenshot = fs::read(&image_path)
        .with_context(|| format!("Failed to read screenshot {}", image_path.display()))?;
    if screenshot.is_empty() {
        warn!("Screenshot {} is empty", image_path.display());
    }

    let snapshot = SiteSnapshot::from_document(screenshot, document)
        .with_context(|| format!("Invalid structural tree in {}", tree_path.display()))?;
    info!(
        "Loaded {} page(s) from {}",
        snapshot.pages.len(),
        tree_path.display()
    );
    Ok(snapshot)
}

pub fn load_config(path: Option<&Path>) -> Result<FidelityConfig> {
    let Some(path) = path else {
        return Ok(FidelityConfig::default());
    };
    let path = expand_path(path);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

/// Merge command-line overrides into `config`.
///
/// Lowering the target below the review threshold drags the review
/// threshold down with it.
pub fn apply_overrides(config: &mut FidelityConfig, overrides: &ScoreOverrides) {
    if let Some(threshold) = overrides.threshold {
        let aggregator = &mut config.scoring.aggregator;
        aggregator.target_threshold = threshold;
        if aggregator.review_threshold > threshold {
            aggregator.review_threshold = threshold;
        }
    }
    if let Some(width) = overrides.canvas_width {
        config.scoring.visual.canvas_width = width;
    }
    if let Some(secs) = overrides.judge_timeout_secs {
        config.scoring.judge_timeout_ms = secs.saturating_mul(1000);
    }
    if overrides.judge_endpoint.is_some() || overrides.judge_model.is_some() {
        let judge = config.judge.get_or_insert_with(JudgeConfig::default);
        if let Some(endpoint) = &overrides.judge_endpoint {
            judge.endpoint = endpoint.to_string();
        }
        if let Some(model) = &overrides.judge_model {
            judge.model = model.clone();
        }
    }
}

/// Build the semantic judge. An API key from the environment wins over one
/// in the config file.
pub fn build_judge(config: Option<JudgeConfig>, api_key: Option<String>) -> Result<SemanticJudge> {
    let Some(mut config) = config else {
        return Ok(SemanticJudge::disabled());
    };
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        config.api_key = Some(key);
    }
    let model = ChatCompletionsModel::new(config).context("Failed to set up the semantic judge")?;
    Ok(SemanticJudge::new(Arc::new(model)))
}

pub fn exit_code(report: &FidelityReport) -> i32 {
    if report.meets_target() {
        EXIT_TARGET_MET
    } else {
        EXIT_TARGET_MISSED
    }
}

fn print_summary(report: &FidelityReport) {
    let score = format!("{:.2}%", report.overall_score() * 100.0);
    if report.meets_target() {
        println!("{} {}", "✓ Fidelity".bright_green().bold(), score.bright_green().bold());
    } else {
        println!("{} {}", "✗ Fidelity".bright_red().bold(), score.bright_red().bold());
    }
    if let Some(headline) = report.recommendations().first() {
        println!("  {}", headline.bright_white());
    }
}

pub async fn handle_score(args: &ArgMatches) -> i32 {
    let quiet = args.get_flag("quiet");

    match run_score(args, quiet).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "✗".bright_red().bold(), e);
            EXIT_INPUT_ERROR
        }
    }
}

async fn run_score(args: &ArgMatches, quiet: bool) -> Result<i32> {
    let path_arg = |name: &str| -> Result<PathBuf> {
        args.get_one::<PathBuf>(name)
            .cloned()
            .with_context(|| format!("--{} is required", name))
    };

    let source = load_snapshot(&path_arg("source-tree")?, &path_arg("source-image")?)?;
    let target = load_snapshot(&path_arg("target-tree")?, &path_arg("target-image")?)?;

    let mut config = load_config(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    apply_overrides(&mut config, &ScoreOverrides::from_matches(args));

    let judge = build_judge(config.judge.take(), std::env::var(API_KEY_ENV).ok())?;
    if !judge.is_configured() {
        warn!("No semantic judge configured; the semantic score will be neutral");
    }
    let scorer = FidelityScorer::new(config.scoring, judge).context("Invalid scoring config")?;

    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message("Scoring migration...");
        spinner
    };

    let report = scorer.score(Arc::new(source), Arc::new(target)).await;
    spinner.finish_and_clear();

    let rendered = format.render(&report).context("Failed to render report")?;

    match args.get_one::<PathBuf>("output") {
        Some(output) => {
            let output = expand_path(output);
            save_report(&rendered, &output)
                .with_context(|| format!("Failed to write report to {}", output.display()))?;
            if !quiet {
                print_summary(&report);
                println!("  Report saved to {}", output.display());
            }
        }
        None => {
            if !quiet && format == ReportFormat::Text {
                print_summary(&report);
                println!();
            }
            print!("{}", rendered);
            if format == ReportFormat::Json {
                println!();
            }
        }
    }

    Ok(exit_code(&report))
}
