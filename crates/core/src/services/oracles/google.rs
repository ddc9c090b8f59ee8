use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http;
use crate::config::{AiConfig, ConfigurationError};
use crate::services::oracle::{LabelingOracle, OracleError, OracleRequest};
use crate::services::prompt::build_prompt;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Oracle backed by the Gemini `generateContent` API.
pub struct GeminiOracle {
    client: Client,
    url: String,
    api_key: String,
    temperature: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiOracle {
    pub fn new(api_key: &str, config: &AiConfig) -> Result<Self, ConfigurationError> {
        let base = config.base_url.as_deref().unwrap_or(GEMINI_BASE_URL).trim_end_matches('/');
        Ok(Self {
            client: http::client(config.timeout)?,
            url: format!("{base}/models/{}:generateContent", config.model),
            api_key: api_key.to_string(),
            temperature: config.temperature,
        })
    }
}

impl LabelingOracle for GeminiOracle {
    fn request(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let prompt = build_prompt(request);
        debug!("LLM prompt for {}:\n{}", request.file_name, prompt);

        let body = GenerateRequest {
            contents: [Content { parts: [Part { text: &prompt }] }],
            generation_config: GenerationConfig { temperature: self.temperature },
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(http::transport_error)?;
        let parsed: GenerateResponse =
            http::check_status(response)?.json().map_err(http::transport_error)?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            // Blocked or empty candidates come back as 200 with no text.
            return Err(OracleError::unknown("response contained no text"));
        }
        Ok(text.trim().to_string())
    }

    fn name(&self) -> &str {
        "google"
    }
}
