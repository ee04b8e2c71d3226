use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_ENDPOINT: &str = "https://shboyer-build25-resource.cognitiveservices.azure.com/";
const DEFAULT_API_VERSION: &str = "2024-04-01-preview";
const DEFAULT_DEPLOYMENT: &str = "gpt-4o-mini";

pub const MAX_TOKENS: u32 = 800;
pub const TEMPERATURE: f32 = 0.7;
pub const TOP_P: f32 = 1.0;

#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("completion request timed out")]
    Timeout,

    #[error("completion request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode completion response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl From<reqwest::Error> for SuggestError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SuggestError::Timeout
        } else if e.is_decode() {
            SuggestError::Decode(e)
        } else {
            SuggestError::Transport(e)
        }
    }
}

/// Credentials and location of the hosted completion deployment.
/// Read from the environment; every value has a placeholder default.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub api_key: String,
    pub endpoint: String,
    pub api_version: String,
    pub deployment: String,
}

impl AzureConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        Self {
            api_key: var("AZURE_API_KEY", ""),
            endpoint: var("AZURE_ENDPOINT", DEFAULT_ENDPOINT),
            api_version: var("API_VERSION", DEFAULT_API_VERSION),
            deployment: var("DEPLOYMENT_NAME", DEFAULT_DEPLOYMENT),
        }
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint.trim_end_matches('/'),
            self.deployment
        )
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the chat-completion deployment
pub struct CompletionClient {
    http: reqwest::Client,
    config: AzureConfig,
}

impl CompletionClient {
    pub fn new(config: AzureConfig, timeout: Duration) -> Result<Self, SuggestError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SuggestError::Transport)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &AzureConfig {
        &self.config
    }

    /// Send the system and user messages and return the first choice's text.
    /// `Ok(None)` means the service answered without any choices.
    pub async fn complete(&self, system: &str, user: &str) -> Result<Option<String>, SuggestError> {
        let body = ChatRequest {
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            model: &self.config.deployment,
        };

        info!("Sending completion request to deployment {}", self.config.deployment);

        let response = self
            .http
            .post(self.config.completions_url())
            .query(&[("api-version", self.config.api_version.as_str())])
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(SuggestError::Status { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        info!("Received {} choice(s) from completion service", parsed.choices.len());

        let Some(first) = parsed.choices.into_iter().next() else {
            return Ok(None);
        };
        if first.message.content.is_none() {
            warn!("First completion choice carried no content");
        }
        Ok(first.message.content)
    }
}
