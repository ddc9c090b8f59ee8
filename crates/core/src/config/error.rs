use std::path::PathBuf;

use thiserror::Error;

/// Fatal setup problems: a run is never attempted when one of these occurs.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("No labels configured")]
    EmptyLabels,

    #[error("Empty label name{}", parent_suffix(.parent))]
    EmptyLabelName { parent: Option<String> },

    #[error("Label '{0}' cannot be used as a folder name")]
    InvalidLabelName(String),

    #[error("Duplicate label '{name}'{}", parent_suffix(.parent))]
    DuplicateLabel { parent: Option<String>, name: String },

    #[error("Fallback label must not be empty")]
    EmptyFallbackLabel,

    #[error("Input folder does not exist: {0}")]
    MissingInputFolder(PathBuf),

    #[error("Input path is not a directory: {0}")]
    InputNotADirectory(PathBuf),

    #[error("Output folder must be specified")]
    MissingOutputFolder,

    #[error("Failed to prepare output folder {path}: {source}")]
    OutputFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open report {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read config file {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Unsupported provider '{0}'. Allowed: openai, azure, google, local")]
    UnsupportedProvider(String),

    #[error("{setting} is required for the {provider} provider")]
    MissingSetting { provider: String, setting: &'static str },

    #[error("Failed to initialise oracle: {0}")]
    Oracle(String),
}

fn parent_suffix(parent: &Option<String>) -> String {
    match parent {
        Some(p) => format!(" under '{p}'"),
        None => String::new(),
    }
}
