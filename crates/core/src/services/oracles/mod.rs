//! Provider-backed labeling oracles.
//!
//! Concrete HTTP clients are compiled only with the `http-oracles` feature;
//! [`build_oracle`] always exists so frontends can report a clear error when
//! the feature is off.

#[cfg(feature = "http-oracles")]
pub mod google;
#[cfg(feature = "http-oracles")]
pub mod ollama;
#[cfg(feature = "http-oracles")]
pub mod openai;

#[cfg(feature = "http-oracles")]
pub use google::GeminiOracle;
#[cfg(feature = "http-oracles")]
pub use openai::ChatCompletionsOracle;

use crate::config::{AiConfig, ConfigurationError};
use crate::organize::CancellationToken;
use crate::services::oracle::LabelingOracle;

/// Build the oracle described by `config`, wrapped in its retry policy.
///
/// For the local provider with `ensure_model` set, the model is pulled
/// through the Ollama API first.
#[cfg(feature = "http-oracles")]
pub fn build_oracle(
    config: &AiConfig,
    cancel: CancellationToken,
) -> Result<Box<dyn LabelingOracle>, ConfigurationError> {
    use crate::config::ProviderKind;
    use crate::services::retry::RetryingOracle;

    config.validate()?;
    let missing = |setting: &'static str| ConfigurationError::MissingSetting {
        provider: config.provider.to_string(),
        setting,
    };

    let oracle: Box<dyn LabelingOracle> = match config.provider {
        ProviderKind::OpenAi => {
            let key = config.api_key.as_deref().ok_or_else(|| missing("api_key"))?;
            let base = config.base_url.as_deref().unwrap_or(crate::config::DEFAULT_OPENAI_BASE_URL);
            let inner = ChatCompletionsOracle::openai(base, key, config)?;
            Box::new(RetryingOracle::new(inner, config.retry.clone()).with_cancellation(cancel))
        }
        ProviderKind::Azure => {
            let key = config.api_key.as_deref().ok_or_else(|| missing("api_key"))?;
            let endpoint =
                config.azure_endpoint.as_deref().ok_or_else(|| missing("azure_endpoint"))?;
            let inner = ChatCompletionsOracle::azure(endpoint, key, config)?;
            Box::new(RetryingOracle::new(inner, config.retry.clone()).with_cancellation(cancel))
        }
        ProviderKind::Google => {
            let key = config.api_key.as_deref().ok_or_else(|| missing("api_key"))?;
            let inner = GeminiOracle::new(key, config)?;
            Box::new(RetryingOracle::new(inner, config.retry.clone()).with_cancellation(cancel))
        }
        ProviderKind::Local => {
            let base = config.base_url.as_deref().ok_or_else(|| missing("base_url"))?;
            if config.ensure_model {
                ollama::ensure_model_available(base, &config.model, ollama::DEFAULT_PULL_TIMEOUT)
                    .map_err(|e| ConfigurationError::Oracle(e.to_string()))?;
            }
            let inner = ChatCompletionsOracle::local(base, config.api_key.as_deref(), config)?;
            Box::new(RetryingOracle::new(inner, config.retry.clone()).with_cancellation(cancel))
        }
    };

    Ok(oracle)
}

#[cfg(not(feature = "http-oracles"))]
pub fn build_oracle(
    config: &AiConfig,
    _cancel: CancellationToken,
) -> Result<Box<dyn LabelingOracle>, ConfigurationError> {
    Err(ConfigurationError::Oracle(format!(
        "provider '{}' needs the http-oracles feature",
        config.provider
    )))
}

#[cfg(feature = "http-oracles")]
pub(crate) mod http {
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use reqwest::blocking::{Client, Response};
    use reqwest::header::RETRY_AFTER;

    use crate::config::ConfigurationError;
    use crate::services::oracle::OracleError;

    /// Longest slice of an error body kept in messages.
    const MAX_BODY_CHARS: usize = 300;

    pub fn client(timeout: Duration) -> Result<Client, ConfigurationError> {
        Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigurationError::Oracle(format!("failed to build HTTP client: {e}")))
    }

    pub fn transport_error(err: reqwest::Error) -> OracleError {
        if err.is_timeout() || err.is_connect() {
            OracleError::network(err.to_string())
        } else {
            OracleError::unknown(err.to_string())
        }
    }

    /// Pass successful responses through; classify failures by status code.
    pub fn check_status(response: Response) -> Result<Response, OracleError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));
        let body: String =
            response.text().unwrap_or_default().chars().take(MAX_BODY_CHARS).collect();
        let message = format!("HTTP {}: {}", status.as_u16(), body.trim());

        Err(match status.as_u16() {
            401 | 403 => OracleError::auth(message),
            429 => OracleError::rate_limited(message, retry_after),
            _ => OracleError::unknown(message),
        })
    }

    /// `Retry-After` is either delay-seconds or an HTTP date.
    pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
        let value = value.trim();
        if let Ok(secs) = value.parse::<f64>() {
            return Duration::try_from_secs_f64(secs).ok();
        }
        let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
        (at - now).to_std().ok()
    }

}
