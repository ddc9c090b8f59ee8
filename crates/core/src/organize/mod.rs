//! Batch organization: discover files, classify each one and move it into
//! `output/Category[/Sub]`.
//!
//! One file at a time, in path order. Per-file failures (inspection, oracle,
//! move) are recorded and counted; the run goes on. Only setup problems
//! (missing input folder, unwritable output, bad report path) abort a run.

pub mod mover;
pub mod report;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::{ConfigurationError, DEFAULT_FALLBACK_LABEL};
use crate::inspect::{FileInspector, InspectionError, InspectorOptions};
use crate::labels::LabelTree;
use crate::model::{Classification, FileRecord};
use crate::services::classify::ClassificationEngine;
use crate::services::oracle::{LabelingOracle, OracleError};

pub use mover::OrganizationError;
pub use report::{CsvReport, ReportRow};

pub const DEFAULT_MAX_COLLISION_ATTEMPTS: u32 = 1000;

/// Cooperative stop flag, checked before each file.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    /// Classify and report, but never touch the filesystem.
    pub dry_run: bool,
    pub recursive: bool,
    /// Process dot-files instead of skipping them.
    pub include_hidden: bool,
    pub report_path: Option<PathBuf>,
    pub fallback_label: String,
    pub inspector: InspectorOptions,
    pub cancel: CancellationToken,
    pub max_collision_attempts: u32,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            recursive: false,
            include_hidden: false,
            report_path: None,
            fallback_label: DEFAULT_FALLBACK_LABEL.to_string(),
            inspector: InspectorOptions::default(),
            cancel: CancellationToken::new(),
            max_collision_attempts: DEFAULT_MAX_COLLISION_ATTEMPTS,
        }
    }
}

/// Aggregate counters for one run.
///
/// `processed_count + failed_count + skipped_count <= total_files` and the
/// category counts always sum to `processed_count`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub total_files: usize,
    pub processed_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub fallback_count: usize,
    /// Keyed by `Category` or `Category/Sub`.
    pub category_counts: BTreeMap<String, usize>,
    pub cancelled: bool,
}

/// Why a single file could not be organized.
#[derive(Debug, Error)]
pub enum FileFailure {
    #[error(transparent)]
    Inspection(#[from] InspectionError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Organization(#[from] OrganizationError),
}

impl FileFailure {
    /// Stable short name: `inspection`, `oracle:<kind>` or `organization`.
    pub fn kind(&self) -> String {
        match self {
            FileFailure::Inspection(_) => "inspection".to_string(),
            FileFailure::Oracle(e) => format!("oracle:{}", e.kind),
            FileFailure::Organization(_) => "organization".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum FileOutcome {
    /// Moved, or in dry-run mode, would have been moved to `destination`.
    Organized { classification: Classification, destination: PathBuf, dry_run: bool },
    Skipped { reason: &'static str },
    Failed(FileFailure),
}

/// Progress callbacks. All methods default to no-ops.
pub trait ProgressObserver: Send + Sync {
    fn on_run_start(&self, _total_files: usize) {}
    fn on_file_start(&self, _index: usize, _path: &Path) {}
    fn on_file_complete(&self, _path: &Path, _outcome: &FileOutcome) {}
    fn on_run_complete(&self, _stats: &RunStatistics) {}
}

pub struct SilentObserver;

impl ProgressObserver for SilentObserver {}

pub struct Organizer<'a> {
    tree: &'a LabelTree,
    oracle: &'a dyn LabelingOracle,
    options: OrganizeOptions,
    observer: &'a dyn ProgressObserver,
}

impl<'a> Organizer<'a> {
    pub fn new(
        tree: &'a LabelTree,
        oracle: &'a dyn LabelingOracle,
        options: OrganizeOptions,
    ) -> Self {
        Self { tree, oracle, options, observer: &SilentObserver }
    }

    pub fn with_observer(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Organize every eligible file under `input` into `output`.
    pub fn organize(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<RunStatistics, ConfigurationError> {
        let opts = &self.options;
        if opts.fallback_label.trim().is_empty() {
            return Err(ConfigurationError::EmptyFallbackLabel);
        }
        if !input.exists() {
            return Err(ConfigurationError::MissingInputFolder(input.to_path_buf()));
        }
        if !input.is_dir() {
            return Err(ConfigurationError::InputNotADirectory(input.to_path_buf()));
        }
        if !opts.dry_run {
            fs::create_dir_all(output).map_err(|source| ConfigurationError::OutputFolder {
                path: output.to_path_buf(),
                source,
            })?;
        }
        let mut report = match &opts.report_path {
            Some(path) => Some(CsvReport::open(path).map_err(|source| {
                ConfigurationError::Report { path: path.to_path_buf(), source }
            })?),
            None => None,
        };

        let candidates = self.discover(input, output);
        let mut stats = RunStatistics { total_files: candidates.len(), ..Default::default() };
        info!(
            "Organizing {} files from {} into {}{}",
            stats.total_files,
            input.display(),
            output.display(),
            if opts.dry_run { " (dry run)" } else { "" }
        );
        self.observer.on_run_start(stats.total_files);

        let inspector = FileInspector::new(opts.inspector.clone());
        let engine = ClassificationEngine::new(self.oracle, self.tree)
            .with_fallback_label(opts.fallback_label.trim());

        let mut claimed = HashSet::new();
        for (index, candidate) in candidates.iter().enumerate() {
            if opts.cancel.is_cancelled() {
                warn!("Run cancelled after {index} of {} files", stats.total_files);
                stats.cancelled = true;
                break;
            }
            self.observer.on_file_start(index, &candidate.path);

            if candidate.hidden && !opts.include_hidden {
                debug!("Skipping hidden file {}", candidate.path.display());
                stats.skipped_count += 1;
                let outcome = FileOutcome::Skipped { reason: "hidden" };
                self.observer.on_file_complete(&candidate.path, &outcome);
                continue;
            }

            let (record, outcome) =
                self.process_file(&candidate.path, output, &inspector, &engine, &mut claimed);
            match &outcome {
                FileOutcome::Organized { classification, destination, dry_run } => {
                    stats.processed_count += 1;
                    if classification.is_fallback {
                        stats.fallback_count += 1;
                    }
                    *stats.category_counts.entry(classification.label_string()).or_insert(0) += 1;
                    if *dry_run {
                        info!(
                            "[dry run] Would move {} to {}",
                            candidate.path.display(),
                            destination.display()
                        );
                    } else {
                        info!("Moved {} to {}", candidate.path.display(), destination.display());
                    }
                }
                FileOutcome::Failed(failure) => {
                    stats.failed_count += 1;
                    error!(
                        "Failed to organize {} ({}): {failure}",
                        candidate.path.display(),
                        failure.kind()
                    );
                }
                FileOutcome::Skipped { .. } => stats.skipped_count += 1,
            }

            if let Some(report) = report.as_mut() {
                let row = report_row(&candidate.path, record.as_ref(), &outcome);
                if let Err(e) = report.append(&row) {
                    warn!("Failed to write report row to {}: {e}", report.path().display());
                }
            }
            self.observer.on_file_complete(&candidate.path, &outcome);
        }

        info!(
            "Run complete: {} processed, {} failed, {} skipped of {} files",
            stats.processed_count, stats.failed_count, stats.skipped_count, stats.total_files
        );
        self.observer.on_run_complete(&stats);
        Ok(stats)
    }

    fn process_file(
        &self,
        path: &Path,
        output: &Path,
        inspector: &FileInspector,
        engine: &ClassificationEngine<'_>,
        claimed: &mut HashSet<PathBuf>,
    ) -> (Option<FileRecord>, FileOutcome) {
        let record = match inspector.inspect(path) {
            Ok(record) => record,
            Err(e) => return (None, FileOutcome::Failed(e.into())),
        };

        let classification = match engine.classify(&record) {
            Ok(c) => c,
            Err(e) => return (Some(record), FileOutcome::Failed(e.into())),
        };

        let dest_dir =
            classification.label_path.iter().fold(output.to_path_buf(), |dir, part| dir.join(part));
        let max_attempts = self.options.max_collision_attempts;

        // Nothing is written in a dry run, so earlier picks must be remembered.
        let placed = if self.options.dry_run {
            mover::unique_destination_with(&dest_dir, &record.name, max_attempts, |p| {
                claimed.contains(p)
            })
            .map(|destination| {
                claimed.insert(destination.clone());
                destination
            })
        } else {
            mover::move_into(&record.path, &dest_dir, max_attempts)
        };

        let outcome = match placed {
            Ok(destination) => FileOutcome::Organized {
                classification,
                destination,
                dry_run: self.options.dry_run,
            },
            Err(e) => FileOutcome::Failed(e.into()),
        };
        (Some(record), outcome)
    }

    fn discover(&self, input: &Path, output: &Path) -> Vec<Candidate> {
        let skip_dir = output.canonicalize().ok();
        let report = self.options.report_path.as_ref().and_then(|p| p.canonicalize().ok());
        let include_hidden = self.options.include_hidden;

        let mut walker = WalkDir::new(input).min_depth(1).follow_links(false);
        if !self.options.recursive {
            walker = walker.max_depth(1);
        }

        let mut candidates = Vec::new();
        let entries = walker.into_iter().filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            if !include_hidden && is_hidden(entry.path()) {
                return false;
            }
            match (&skip_dir, entry.path().canonicalize()) {
                (Some(skip), Ok(dir)) => !dir.starts_with(skip),
                _ => true,
            }
        });

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {e}", input.display());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let (Some(report), Ok(path)) = (&report, entry.path().canonicalize()) {
                if &path == report {
                    continue;
                }
            }
            candidates
                .push(Candidate { hidden: is_hidden(entry.path()), path: entry.into_path() });
        }

        candidates.sort_by(|a, b| a.path.cmp(&b.path));
        candidates
    }
}

struct Candidate {
    path: PathBuf,
    hidden: bool,
}

fn is_hidden(path: &Path) -> bool {
    path.file_name().map(|n| n.to_string_lossy().starts_with('.')).unwrap_or(false)
}

fn report_row(path: &Path, record: Option<&FileRecord>, outcome: &FileOutcome) -> ReportRow {
    let mut row = match record {
        Some(r) => ReportRow {
            file_name: r.name.clone(),
            file_type: r.file_type(),
            file_size: Some(r.size_bytes),
            mime_type: r.mime_type.clone(),
            is_executable: Some(r.is_executable),
            ..Default::default()
        },
        None => ReportRow {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            ..Default::default()
        },
    };

    match outcome {
        FileOutcome::Organized { classification, destination, .. } => {
            row.decided_label = classification.label_string();
            row.category = classification.category().to_string();
            row.sub_category = classification.sub_category().unwrap_or_default().to_string();
            row.is_fallback = classification.is_fallback;
            row.llm_response = classification.raw_response.clone();
            row.destination = destination.display().to_string();
        }
        FileOutcome::Failed(failure) => {
            row.error = format!("{}: {failure}", failure.kind());
        }
        FileOutcome::Skipped { reason } => {
            row.error = format!("skipped: {reason}");
        }
    }
    row
}

/// Convenience wrapper around [`Organizer::organize`] with no observer.
pub fn organize(
    input: &Path,
    output: &Path,
    tree: &LabelTree,
    oracle: &dyn LabelingOracle,
    options: OrganizeOptions,
) -> Result<RunStatistics, ConfigurationError> {
    Organizer::new(tree, oracle, options).organize(input, output)
}
