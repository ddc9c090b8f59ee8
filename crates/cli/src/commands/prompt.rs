use std::path::Path;

use anyhow::{Context, Result};
use organizer_core::config::AppConfig;
use organizer_core::services::classify::{render_choices, render_context};
use organizer_core::services::prompt::build_prompt;
use organizer_core::{FileInspector, InspectorOptions, OracleRequest};

use crate::commands::load_label_tree;

/// Print the exact prompt an HTTP oracle would send for `path`.
pub fn prompt_command(config: &AppConfig, path: &Path) -> Result<()> {
    let tree = load_label_tree(config)?;
    let record = FileInspector::new(InspectorOptions::default())
        .inspect(path)
        .with_context(|| format!("Failed to inspect {}", path.display()))?;

    let request = OracleRequest {
        file_name: record.name.clone(),
        context: render_context(&record),
        labels: render_choices(&tree, config.fallback_label()),
        hierarchical: tree.is_hierarchical(),
    };
    println!("{}", build_prompt(&request));
    Ok(())
}
