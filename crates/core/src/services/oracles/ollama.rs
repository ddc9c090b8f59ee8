//! Local model bootstrap through the Ollama management API.

use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// How long to wait for the API to come up and for a pull to finish.
pub const DEFAULT_PULL_TIMEOUT: Duration = Duration::from_secs(600);

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const TAGS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("Ollama API at {0} did not become reachable")]
    Unreachable(String),
    #[error("Ollama request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected status code {status} - {body}")]
    Status { status: u16, body: String },
    #[error("Timed out waiting for Ollama model {model} after {secs} seconds")]
    Timeout { model: String, secs: u64 },
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// Management API root for an inference URL: `http://host:11434/v1` becomes
/// `http://host:11434`.
pub fn management_base(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if let Some(scheme_end) = trimmed.find("://") {
        let after = scheme_end + 3;
        if let Some(path_start) = trimmed[after..].find('/') {
            let split = after + path_start;
            if trimmed[split..].trim_start_matches('/').starts_with("v1") {
                return trimmed[..split].to_string();
            }
        }
    }
    trimmed.to_string()
}

/// Make sure `model` is listed by the Ollama server behind `base_url`,
/// pulling it when missing.
pub fn ensure_model_available(
    base_url: &str,
    model: &str,
    timeout: Duration,
) -> Result<(), OllamaError> {
    let base = management_base(base_url);
    let client = Client::builder().timeout(timeout).build()?;

    wait_for_api(&client, &base, timeout)?;

    if model_listed(&client, &base, model)? {
        info!("Model {model} already present in Ollama");
        return Ok(());
    }

    info!("Requesting Ollama pull for model {model}");
    let response = client
        .post(format!("{base}/api/pull"))
        .json(&serde_json::json!({ "name": model, "stream": false }))
        .send()?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        return Err(OllamaError::Status { status, body: response.text().unwrap_or_default() });
    }

    let started = Instant::now();
    while started.elapsed() < timeout {
        match model_listed(&client, &base, model) {
            Ok(true) => {
                info!("Model {model} is now available in Ollama");
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => debug!("Polling Ollama tags failed: {e}"),
        }
        thread::sleep(POLL_INTERVAL);
    }

    Err(OllamaError::Timeout { model: model.to_string(), secs: timeout.as_secs() })
}

fn wait_for_api(client: &Client, base: &str, timeout: Duration) -> Result<(), OllamaError> {
    info!("Waiting for Ollama API at {base}...");
    let started = Instant::now();
    loop {
        let reachable = client
            .get(format!("{base}/api/tags"))
            .timeout(TAGS_TIMEOUT)
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false);
        if reachable {
            info!("Ollama API is reachable");
            return Ok(());
        }
        if started.elapsed() >= timeout {
            return Err(OllamaError::Unreachable(base.to_string()));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn model_listed(client: &Client, base: &str, model: &str) -> Result<bool, OllamaError> {
    let response = client.get(format!("{base}/api/tags")).timeout(TAGS_TIMEOUT).send()?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        return Err(OllamaError::Status { status, body: response.text().unwrap_or_default() });
    }
    let tags: TagsResponse = response.json()?;
    Ok(tags.models.iter().any(|m| m.name.starts_with(model)))
}
