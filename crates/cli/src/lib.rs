use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use organizer_core::config::{load_config, split_list, AppConfig};
use organizer_core::RawLabels;

pub mod commands;
pub mod logging;

/// Canonicalize the path if possible, falling back to the given string
/// relative to the current working directory.
pub fn canonicalize_or_current<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    if path == Path::new(".") {
        Ok(env::current_dir().context("Failed to get current directory")?)
    } else {
        match path.canonicalize() {
            Ok(p) => Ok(p),
            Err(_) => {
                let cwd = env::current_dir().context("Failed to get current directory")?;
                Ok(cwd.join(path))
            }
        }
    }
}

/// Labels given on the command line. Each value may itself be a comma- or
/// semicolon-separated list; `Category/Sub` entries build a hierarchy.
pub fn labels_from_args(values: &[String]) -> Option<RawLabels> {
    let paths: Vec<String> = values.iter().flat_map(|v| split_list(v)).collect();
    if paths.is_empty() {
        None
    } else {
        Some(RawLabels::from_paths(paths))
    }
}

/// Merge command-line overrides, the config file and the environment.
///
/// The config file is `config_path` when given, otherwise `CONFIG_PATH` from
/// the environment, otherwise none.
pub fn resolve_config<F>(
    overrides: AppConfig,
    config_path: Option<&Path>,
    lookup: F,
) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let from_env = AppConfig::from_env(&lookup).context("Failed to read environment settings")?;

    let path = config_path
        .map(Path::to_path_buf)
        .or_else(|| lookup("CONFIG_PATH").filter(|v| !v.trim().is_empty()).map(PathBuf::from));
    let from_file = match path {
        Some(path) => load_config(&path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => AppConfig::default(),
    };

    Ok(overrides.layered_over(from_file.layered_over(from_env)))
}

/// Process environment lookup used outside of tests.
pub fn env_lookup(name: &str) -> Option<String> {
    env::var(name).ok()
}
