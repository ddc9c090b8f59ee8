use anyhow::{Context, Result};
use organizer_core::config::AppConfig;
use serde::Serialize;

use crate::commands::load_label_tree;

#[derive(Serialize)]
pub struct LabelsSnapshot {
    pub hierarchical: bool,
    pub enumeration: String,
    pub labels: Vec<String>,
    pub fallback_label: String,
}

/// Validate the configured labels and show what the oracle will be offered.
pub fn labels_command(config: &AppConfig, json: bool) -> Result<()> {
    let tree = load_label_tree(config)?;
    let snapshot = LabelsSnapshot {
        hierarchical: tree.is_hierarchical(),
        enumeration: tree.render_enumeration(),
        labels: tree.label_paths(),
        fallback_label: config.fallback_label().to_string(),
    };

    if json {
        let serialized = serde_json::to_string_pretty(&snapshot)
            .context("Failed to serialize labels to JSON")?;
        println!("{serialized}");
        return Ok(());
    }

    println!("Labels ({}):", if snapshot.hierarchical { "hierarchical" } else { "flat" });
    println!("  {}", snapshot.enumeration);
    println!("Valid answers ({}):", snapshot.labels.len());
    for label in &snapshot.labels {
        println!("  - {label}");
    }
    println!("Fallback: {}", snapshot.fallback_label);
    Ok(())
}
