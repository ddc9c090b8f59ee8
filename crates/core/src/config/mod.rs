//! Configuration model: the YAML file schema, environment overlays and the
//! resolved oracle settings.
//!
//! Every field of [`AppConfig`] is optional so sources can be layered. The CLI
//! builds one `AppConfig` from its arguments, one from the config file and one
//! from the environment, then stacks them with [`AppConfig::layered_over`]
//! (arguments win, then the file, then the environment).

mod error;

pub use error::ConfigurationError;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::labels::RawLabels;
use crate::services::retry::RetryPolicy;

pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_FALLBACK_LABEL: &str = "Other";
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// Model providers that can back the labeling oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Azure,
    Google,
    Local,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Azure => "azure",
            ProviderKind::Google => "google",
            ProviderKind::Local => "local",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi | ProviderKind::Azure => "gpt-3.5-turbo",
            ProviderKind::Google => "gemini-pro",
            ProviderKind::Local => "llama2",
        }
    }

    /// Provider-specific environment variable holding the API key.
    fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Azure => Some("AZURE_OPENAI_API_KEY"),
            ProviderKind::Google => Some("GOOGLE_API_KEY"),
            ProviderKind::Local => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "azure" => Ok(ProviderKind::Azure),
            "google" => Ok(ProviderKind::Google),
            "local" => Ok(ProviderKind::Local),
            other => Err(ConfigurationError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// The `ai:` section as written by the user. Unset fields fall through to
/// lower-priority sources and finally to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub deployment_name: Option<String>,
    pub api_version: Option<String>,
    pub base_url: Option<String>,
    pub ensure_model: Option<bool>,
    pub retries: Option<u32>,
    pub backoff_factor: Option<f64>,
    pub max_backoff: Option<f64>,
    pub backoff_factor_rate_limit: Option<f64>,
    pub max_backoff_rate_limit: Option<f64>,
    pub timeout_secs: Option<u64>,
}

impl AiSettings {
    /// Fill every unset field of `self` from `lower`.
    pub fn layered_over(self, lower: AiSettings) -> AiSettings {
        AiSettings {
            provider: self.provider.or(lower.provider),
            model: self.model.or(lower.model),
            temperature: self.temperature.or(lower.temperature),
            api_key: self.api_key.or(lower.api_key),
            azure_endpoint: self.azure_endpoint.or(lower.azure_endpoint),
            deployment_name: self.deployment_name.or(lower.deployment_name),
            api_version: self.api_version.or(lower.api_version),
            base_url: self.base_url.or(lower.base_url),
            ensure_model: self.ensure_model.or(lower.ensure_model),
            retries: self.retries.or(lower.retries),
            backoff_factor: self.backoff_factor.or(lower.backoff_factor),
            max_backoff: self.max_backoff.or(lower.max_backoff),
            backoff_factor_rate_limit: self
                .backoff_factor_rate_limit
                .or(lower.backoff_factor_rate_limit),
            max_backoff_rate_limit: self.max_backoff_rate_limit.or(lower.max_backoff_rate_limit),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
        }
    }

    /// Read the `ai` overlay from environment-style variables.
    pub fn from_env<F>(lookup: F) -> Result<AiSettings, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Ok(AiSettings {
            provider: get("PROVIDER"),
            model: get("MODEL"),
            temperature: get("TEMPERATURE").map(|v| parse_env("TEMPERATURE", &v)).transpose()?,
            api_key: get("API_KEY"),
            azure_endpoint: get("AZURE_ENDPOINT"),
            base_url: get("BASE_URL"),
            ensure_model: get("ENSURE_MODEL").map(|v| parse_bool(&v)),
            ..Default::default()
        })
    }

    /// Apply defaults and provider-specific fallbacks.
    ///
    /// `lookup` supplies the provider key variables (`OPENAI_API_KEY`,
    /// `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_ENDPOINT`, `GOOGLE_API_KEY`) and
    /// `OLLAMA_URL`.
    pub fn resolve<F>(&self, lookup: F) -> Result<AiConfig, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());

        let provider = match non_empty(&self.provider) {
            Some(p) => p.parse::<ProviderKind>()?,
            None => ProviderKind::OpenAi,
        };
        let model =
            non_empty(&self.model).unwrap_or_else(|| provider.default_model().to_string());

        let api_key = non_empty(&self.api_key).or_else(|| provider.api_key_env().and_then(get));
        let azure_endpoint = non_empty(&self.azure_endpoint).or_else(|| match provider {
            ProviderKind::Azure => get("AZURE_OPENAI_ENDPOINT"),
            _ => None,
        });
        let base_url = non_empty(&self.base_url).or_else(|| match provider {
            ProviderKind::Local => {
                Some(get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_LOCAL_BASE_URL.to_string()))
            }
            _ => None,
        });

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            retries: self.retries.unwrap_or(defaults.retries),
            backoff_factor: self.backoff_factor.map(secs).unwrap_or(defaults.backoff_factor),
            max_backoff: self.max_backoff.map(secs).unwrap_or(defaults.max_backoff),
            rate_limit_backoff_factor: self
                .backoff_factor_rate_limit
                .map(secs)
                .unwrap_or(defaults.rate_limit_backoff_factor),
            rate_limit_max_backoff: self
                .max_backoff_rate_limit
                .map(secs)
                .unwrap_or(defaults.rate_limit_max_backoff),
        };

        Ok(AiConfig {
            provider,
            deployment_name: non_empty(&self.deployment_name).unwrap_or_else(|| model.clone()),
            model,
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            api_key,
            azure_endpoint,
            api_version: non_empty(&self.api_version)
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            base_url,
            ensure_model: self.ensure_model.unwrap_or(false),
            retry,
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }
}

/// Fully resolved oracle settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f64,
    pub api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    /// Azure deployment; defaults to the model name.
    pub deployment_name: String,
    pub api_version: String,
    pub base_url: Option<String>,
    /// Pull the local model through the Ollama API before the first request.
    pub ensure_model: bool,
    pub retry: RetryPolicy,
    pub timeout: Duration,
}

impl AiConfig {
    /// Check that the settings the chosen provider needs are present.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let missing = |setting: &'static str| ConfigurationError::MissingSetting {
            provider: self.provider.to_string(),
            setting,
        };
        match self.provider {
            ProviderKind::OpenAi | ProviderKind::Google if self.api_key.is_none() => {
                Err(missing("api_key"))
            }
            ProviderKind::Azure if self.api_key.is_none() => Err(missing("api_key")),
            ProviderKind::Azure if self.azure_endpoint.is_none() => Err(missing("azure_endpoint")),
            ProviderKind::Local if self.base_url.is_none() => Err(missing("base_url")),
            _ => Ok(()),
        }
    }
}

/// Top-level configuration file schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ai: AiSettings,
    pub labels: Option<RawLabels>,
    pub input_folder: Option<PathBuf>,
    pub output_folder: Option<PathBuf>,
    pub dry_run: Option<bool>,
    pub csv_report: Option<PathBuf>,
    pub continuous: Option<bool>,
    /// Seconds between runs in continuous mode.
    pub interval: Option<u64>,
    pub recursive: Option<bool>,
    pub include_hidden: Option<bool>,
    pub fallback_label: Option<String>,
}

impl AppConfig {
    /// Fill every unset field of `self` from `lower`.
    pub fn layered_over(self, lower: AppConfig) -> AppConfig {
        AppConfig {
            ai: self.ai.layered_over(lower.ai),
            labels: self.labels.filter(|l| !l.is_empty()).or(lower.labels),
            input_folder: self.input_folder.or(lower.input_folder),
            output_folder: self.output_folder.or(lower.output_folder),
            dry_run: self.dry_run.or(lower.dry_run),
            csv_report: self.csv_report.or(lower.csv_report),
            continuous: self.continuous.or(lower.continuous),
            interval: self.interval.or(lower.interval),
            recursive: self.recursive.or(lower.recursive),
            include_hidden: self.include_hidden.or(lower.include_hidden),
            fallback_label: self.fallback_label.or(lower.fallback_label),
        }
    }

    /// Read the environment overlay (`LABELS`, `INPUT_FOLDER`, `DRY_RUN`, ...).
    pub fn from_env<F>(lookup: F) -> Result<AppConfig, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Ok(AppConfig {
            ai: AiSettings::from_env(&lookup)?,
            labels: get("LABELS").map(|v| RawLabels::from_paths(split_list(&v))),
            input_folder: get("INPUT_FOLDER").map(PathBuf::from),
            output_folder: get("OUTPUT_FOLDER").map(PathBuf::from),
            dry_run: get("DRY_RUN").map(|v| parse_bool(&v)),
            csv_report: get("CSV_REPORT").map(PathBuf::from),
            continuous: get("CONTINUOUS").map(|v| parse_bool(&v)),
            interval: get("INTERVAL").map(|v| parse_env("INTERVAL", &v)).transpose()?,
            recursive: None,
            include_hidden: None,
            fallback_label: None,
        })
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run.unwrap_or(false)
    }

    pub fn continuous(&self) -> bool {
        self.continuous.unwrap_or(false)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    pub fn fallback_label(&self) -> &str {
        self.fallback_label.as_deref().unwrap_or(DEFAULT_FALLBACK_LABEL)
    }
}

/// Load a YAML configuration file. An empty file yields the default config.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigurationError> {
    let text = fs::read_to_string(path)
        .map_err(|source| ConfigurationError::ReadConfig { path: path.to_path_buf(), source })?;
    if text.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(&text)
        .map_err(|source| ConfigurationError::ParseConfig { path: path.to_path_buf(), source })
}

/// Split a comma- or semicolon-separated list, dropping empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `1`, `true`, `yes` and `y` (any case) are true; everything else is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "y")
}

fn parse_env<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigurationError> {
    value.trim().parse().map_err(|_| ConfigurationError::InvalidEnv {
        name,
        value: value.to_string(),
    })
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}
