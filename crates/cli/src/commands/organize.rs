use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use organizer_core::config::{AiSettings, AppConfig};
use organizer_core::organize::{FileOutcome, ProgressObserver};
use organizer_core::services::oracles::build_oracle;
use organizer_core::{
    CancellationToken, ConfigurationError, InspectorOptions, OrganizeOptions, Organizer,
    RunStatistics,
};
use tracing::{error, info, warn};

use crate::canonicalize_or_current;
use crate::commands::load_label_tree;

/// Command-line overrides for an organize run. Unset values fall back to the
/// config file, then the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct OrganizeArgs {
    /// Folder containing files to organize.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Folder receiving the category folders.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Model provider: openai, azure, google or local.
    #[arg(long)]
    pub provider: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub api_key: Option<String>,

    /// Azure OpenAI endpoint URL.
    #[arg(long)]
    pub azure_endpoint: Option<String>,

    /// Base URL of an OpenAI-compatible server (local provider).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Pull the model through the Ollama API before the run (local provider).
    #[arg(long, default_value_t = false)]
    pub ensure_model: bool,

    /// Sampling temperature (default: 0.3).
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Classify and report without moving anything.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Append one CSV row per file to this report.
    #[arg(long)]
    pub csv_report: Option<PathBuf>,

    /// Keep running, organizing the input folder every `--interval` seconds.
    #[arg(long, default_value_t = false)]
    pub continuous: bool,

    /// Seconds between runs in continuous mode (default: 60).
    #[arg(long)]
    pub interval: Option<u64>,

    /// Descend into subfolders of the input folder.
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Also organize dot-files and the contents of dot-folders.
    #[arg(long, default_value_t = false)]
    pub include_hidden: bool,

    /// Category used when the model's answer matches no label (default: Other).
    #[arg(long)]
    pub fallback_label: Option<String>,

    /// Include a SHA-256 digest in each inspected record.
    #[arg(long, default_value_t = false)]
    pub sha256: bool,
}

impl OrganizeArgs {
    /// The values given on the command line as the top configuration layer.
    pub fn overrides(&self) -> AppConfig {
        AppConfig {
            ai: AiSettings {
                provider: self.provider.clone(),
                model: self.model.clone(),
                temperature: self.temperature,
                api_key: self.api_key.clone(),
                azure_endpoint: self.azure_endpoint.clone(),
                base_url: self.base_url.clone(),
                ensure_model: self.ensure_model.then_some(true),
                ..Default::default()
            },
            labels: None,
            input_folder: self.input.clone(),
            output_folder: self.output.clone(),
            dry_run: self.dry_run.then_some(true),
            csv_report: self.csv_report.clone(),
            continuous: self.continuous.then_some(true),
            interval: self.interval,
            recursive: self.recursive.then_some(true),
            include_hidden: self.include_hidden.then_some(true),
            fallback_label: self.fallback_label.clone(),
        }
    }
}

/// Prints one line per file as the run progresses.
#[derive(Default)]
pub struct ConsoleObserver {
    total: AtomicUsize,
    current: AtomicUsize,
}

impl ProgressObserver for ConsoleObserver {
    fn on_run_start(&self, total_files: usize) {
        self.total.store(total_files, Ordering::Relaxed);
    }

    fn on_file_start(&self, index: usize, _path: &Path) {
        self.current.store(index + 1, Ordering::Relaxed);
    }

    fn on_file_complete(&self, path: &Path, outcome: &FileOutcome) {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let position = format!(
            "[{}/{}]",
            self.current.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed)
        );
        match outcome {
            FileOutcome::Organized { classification, destination, dry_run } => {
                let verb = if *dry_run { "would move to" } else { "->" };
                let fallback = if classification.is_fallback { " (fallback)" } else { "" };
                println!(
                    "{position} {name} [{}{fallback}] {verb} {}",
                    classification.label_string(),
                    destination.display()
                );
            }
            FileOutcome::Skipped { reason } => println!("{position} {name} skipped ({reason})"),
            FileOutcome::Failed(failure) => {
                println!("{position} {name} FAILED ({}): {failure}", failure.kind())
            }
        }
    }
}

/// Run the organizer once, or forever in continuous mode.
///
/// Configuration errors abort before the first run. In continuous mode a
/// failed cycle is logged and retried after the interval.
pub fn organize_command<F>(config: &AppConfig, sha256: bool, lookup: F) -> Result<RunStatistics>
where
    F: Fn(&str) -> Option<String>,
{
    let tree = load_label_tree(config)?;
    let input = config.input_folder.as_deref().ok_or_else(|| {
        anyhow!("No input folder specified. Use --input, provide it in config, or set INPUT_FOLDER env variable.")
    })?;
    let input = canonicalize_or_current(input)?;
    let output = config
        .output_folder
        .as_deref()
        .ok_or(ConfigurationError::MissingOutputFolder)
        .context("Use --output, provide output_folder in config, or set OUTPUT_FOLDER")?;
    let output = canonicalize_or_current(output)?;
    let ai = config.ai.resolve(lookup).context("Invalid model provider configuration")?;

    let cancel = CancellationToken::new();
    install_interrupt_handler(&cancel);
    let oracle = build_oracle(&ai, cancel.clone())
        .with_context(|| format!("Failed to set up the {} provider", ai.provider))?;

    let options = OrganizeOptions {
        dry_run: config.dry_run(),
        recursive: config.recursive.unwrap_or(false),
        include_hidden: config.include_hidden.unwrap_or(false),
        report_path: config.csv_report.clone(),
        fallback_label: config.fallback_label().to_string(),
        inspector: InspectorOptions { compute_sha256: sha256, ..Default::default() },
        cancel: cancel.clone(),
        ..Default::default()
    };

    info!(
        "Using provider {} with model {} (temperature {})",
        ai.provider, ai.model, ai.temperature
    );
    info!("Input folder: {}", input.display());
    info!("Output folder: {}", output.display());
    info!("Labels: {}", tree.render_enumeration());
    if options.dry_run {
        info!("*** DRY RUN MODE - No files will be moved ***");
    }
    if let Some(report) = &options.report_path {
        info!("CSV report will be saved to: {}", report.display());
    }

    let observer = ConsoleObserver::default();
    let organizer = Organizer::new(&tree, oracle.as_ref(), options).with_observer(&observer);

    if !config.continuous() {
        let stats = organizer.organize(&input, &output).context("Organization run failed")?;
        print_summary(&stats);
        return Ok(stats);
    }

    let interval = config.interval();
    info!("Running in continuous mode with {}s interval", interval.as_secs());
    let mut last = RunStatistics::default();
    while !cancel.is_cancelled() {
        match organizer.organize(&input, &output) {
            Ok(stats) => {
                print_summary(&stats);
                last = stats;
            }
            Err(e) => error!("Error during organization cycle: {e}"),
        }
        if cancel.is_cancelled() {
            break;
        }
        info!("Sleeping for {} seconds...", interval.as_secs());
        if !sleep_unless_cancelled(interval, &cancel) {
            break;
        }
    }
    info!("Continuous mode stopped");
    println!("Stopped.");
    Ok(last)
}

/// First Ctrl-C cancels the run after the file in progress; a second one
/// exits immediately.
fn install_interrupt_handler(cancel: &CancellationToken) {
    let token = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        if token.is_cancelled() {
            std::process::exit(130);
        }
        eprintln!("Interrupted, stopping after the current file (Ctrl-C again to force)");
        token.cancel();
    });
    if let Err(e) = installed {
        warn!("Failed to install Ctrl-C handler: {e}");
    }
}

/// Sleep for `duration` in short steps. Returns false as soon as `cancel`
/// is set, true when the full duration passed.
pub fn sleep_unless_cancelled(duration: Duration, cancel: &CancellationToken) -> bool {
    const STEP: Duration = Duration::from_millis(200);
    let deadline = Instant::now() + duration;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(STEP.min(deadline - now));
    }
}

pub fn print_summary(stats: &RunStatistics) {
    println!("{}", "=".repeat(50));
    println!("Organization Complete!");
    println!("{}", "=".repeat(50));
    println!("Total files: {}", stats.total_files);
    println!("Processed: {}", stats.processed_count);
    println!("Failed: {}", stats.failed_count);
    println!("Skipped: {}", stats.skipped_count);
    println!("Fallback: {}", stats.fallback_count);
    if stats.cancelled {
        println!("Run was cancelled before all files were processed.");
    }
    println!("Categorization:");
    for (label, count) in &stats.category_counts {
        println!("  {label}: {count} files");
    }
}
