use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http;
use crate::config::{AiConfig, ConfigurationError};
use crate::services::oracle::{LabelingOracle, OracleError, OracleRequest};
use crate::services::prompt::build_prompt;

enum Credentials {
    Bearer(String),
    AzureKey(String),
    None,
}

/// Oracle for OpenAI-style `chat/completions` endpoints: OpenAI itself,
/// Azure OpenAI deployments and local OpenAI-compatible servers (Ollama).
pub struct ChatCompletionsOracle {
    client: Client,
    url: String,
    model: String,
    temperature: f64,
    credentials: Credentials,
    name: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsOracle {
    pub fn openai(
        base_url: &str,
        api_key: &str,
        config: &AiConfig,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            client: http::client(config.timeout)?,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            credentials: Credentials::Bearer(api_key.to_string()),
            name: "openai",
        })
    }

    pub fn azure(
        endpoint: &str,
        api_key: &str,
        config: &AiConfig,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            client: http::client(config.timeout)?,
            url: format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint.trim_end_matches('/'),
                config.deployment_name,
                config.api_version
            ),
            model: config.model.clone(),
            temperature: config.temperature,
            credentials: Credentials::AzureKey(api_key.to_string()),
            name: "azure",
        })
    }

    /// Local servers usually ignore the key; one is sent only when configured.
    pub fn local(
        base_url: &str,
        api_key: Option<&str>,
        config: &AiConfig,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            client: http::client(config.timeout)?,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            credentials: match api_key {
                Some(key) => Credentials::Bearer(key.to_string()),
                None => Credentials::None,
            },
            name: "local",
        })
    }
}

impl LabelingOracle for ChatCompletionsOracle {
    fn request(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let prompt = build_prompt(request);
        debug!("LLM prompt for {}:\n{}", request.file_name, prompt);

        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [ChatMessage { role: "user", content: &prompt }],
        };

        let mut builder = self.client.post(&self.url).json(&body);
        builder = match &self.credentials {
            Credentials::Bearer(key) => builder.bearer_auth(key),
            Credentials::AzureKey(key) => builder.header("api-key", key),
            Credentials::None => builder,
        };

        let response = builder.send().map_err(http::transport_error)?;
        let parsed: ChatResponse =
            http::check_status(response)?.json().map_err(http::transport_error)?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or_else(|| OracleError::unknown("response contained no choices"))
    }

    fn name(&self) -> &str {
        self.name
    }
}
