pub mod inspect;
pub mod labels;
pub mod organize;
pub mod prompt;

pub use inspect::*;
pub use labels::*;
pub use organize::*;
pub use prompt::*;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use organizer_core::config::AppConfig;
use organizer_core::LabelTree;

use crate::{labels_from_args, resolve_config};

/// Where labels (and the rest of the configuration) come from.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigSource {
    /// Category labels, e.g. `-l Documents/Work Images` or `-l "Documents,Images"`.
    #[arg(short, long, num_args = 1..)]
    pub labels: Vec<String>,

    /// YAML configuration file. Defaults to `CONFIG_PATH` when set.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl ConfigSource {
    /// Layer `overrides` (plus the labels given here) over the config file and
    /// the environment.
    pub fn resolve<F>(&self, mut overrides: AppConfig, lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        if overrides.labels.is_none() {
            overrides.labels = labels_from_args(&self.labels);
        }
        resolve_config(overrides, self.config.as_deref(), lookup)
    }
}

/// Validated label tree from a resolved configuration.
pub fn load_label_tree(config: &AppConfig) -> Result<LabelTree> {
    let raw = config.labels.clone().filter(|l| !l.is_empty()).ok_or_else(|| {
        anyhow!(
            "No labels specified. Use --labels, provide them in config, or set the LABELS env variable."
        )
    })?;
    LabelTree::build(raw).context("Invalid label configuration")
}
