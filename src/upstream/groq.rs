//! Groq chat-completion client used for text correction.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::GroqConfig;
use crate::observability::metrics;
use crate::upstream::types::{UpstreamError, UpstreamResult};

const SERVICE: &str = "groq";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
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
    content: Option<String>,
}

/// Client for Groq's OpenAI-compatible chat endpoint.
#[derive(Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    prompt_prefix: String,
    temperature: f32,
    api_key: Option<String>,
}

impl GroqClient {
    /// Build a client; `api_key` is usually read from the environment by the caller.
    pub fn new(config: &GroqConfig, api_key: Option<String>) -> UpstreamResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::NotConfigured {
                service: SERVICE,
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            prompt_prefix: config.prompt_prefix.clone(),
            temperature: config.temperature,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Build a client reading the key from the variable named in config.
    pub fn from_env(config: &GroqConfig) -> UpstreamResult<Self> {
        let key = std::env::var(&config.api_key_env).ok();
        if key.is_none() {
            tracing::warn!(
                variable = %config.api_key_env,
                "LLM API key not set; text correction will fail"
            );
        }
        Self::new(config, key)
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Ask the model to correct `text` and return its answer.
    pub async fn correct(&self, text: &str) -> UpstreamResult<String> {
        let start = Instant::now();
        let result = self.correct_inner(text).await;
        metrics::record_upstream(SERVICE, result.is_ok(), start);
        result
    }

    async fn correct_inner(&self, text: &str) -> UpstreamResult<String> {
        let api_key = self.api_key.as_deref().ok_or(UpstreamError::NotConfigured {
            service: SERVICE,
            message: "API key missing".to_string(),
        })?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: format!("{}{}", self.prompt_prefix, text),
            }],
            temperature: self.temperature,
        };

        let url = format!("{}/openai/v1/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let body: ChatResponse = response.json().await.map_err(|e| UpstreamError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(UpstreamError::NotFound {
                service: SERVICE,
                message: "O serviço de correção não retornou texto.".to_string(),
            })
    }
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
