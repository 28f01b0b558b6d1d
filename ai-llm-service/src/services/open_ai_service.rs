//! OpenAI-compatible chat-completions client.
//!
//! Supported operation:
//! - `POST {endpoint}/chat/completions` — synchronous chat completion
//!   (non-streaming)
//!
//! The `endpoint` must start with `https://` or `http://` to allow
//! custom/self-hosted gateways (use with caution).

use std::time::Duration;

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmModelConfig;
use crate::errors::{LlmError, LlmResult};

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Thin client for OpenAI-compatible chat-completions APIs.
///
/// Initialized with a full [`LlmModelConfig`]. Reuses an HTTP client with a
/// configurable timeout.
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - [`LlmError::MissingApiKey`] if `cfg.api_key` is `None`
    /// - [`LlmError::InvalidEndpoint`] if `cfg.endpoint` is invalid
    /// - [`LlmError::Transport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> LlmResult<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .ok_or(LlmError::MissingApiKey("openai"))?;

        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(LlmError::InvalidEndpoint(cfg.endpoint.clone()));
        }

        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| LlmError::Decode(format!("invalid API key header: {e}")))?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()?;

        let url_chat = format!("{}/chat/completions", endpoint.trim_end_matches('/'));

        Ok(Self {
            client,
            cfg,
            url_chat,
        })
    }

    /// Performs a non-streaming chat completion and returns the first
    /// choice's content.
    pub async fn generate(&self, prompt: &str) -> LlmResult<String> {
        let body = ChatRequest {
            model: &self.cfg.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.cfg.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.cfg.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        };

        debug!(model = %self.cfg.model, prompt_len = prompt.len(), "chat completion request");

        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let snippet: String = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(LlmError::HttpStatus {
                status,
                url: self.url_chat.clone(),
                snippet,
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(LlmError::Api(err.message));
        }

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyChoices)
    }
}

/// --- Request/response shapes (subset of fields we actually use) ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProvider;

    fn cfg(endpoint: &str, api_key: Option<&str>) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenAi,
            model: "gpt-4".into(),
            endpoint: endpoint.into(),
            api_key: api_key.map(Into::into),
            timeout_secs: None,
            temperature: None,
            max_tokens: None,
        }
    }

    #[test]
    fn rejects_missing_api_key() {
        let err = OpenAiService::new(cfg("https://api.openai.com/v1", None)).unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey(_)));
    }

    #[test]
    fn rejects_bad_endpoint() {
        let err = OpenAiService::new(cfg("ftp://nope", Some("k"))).unwrap_err();
        assert!(matches!(err, LlmError::InvalidEndpoint(_)));
    }

    #[test]
    fn builds_chat_url_without_trailing_slash() {
        let svc = OpenAiService::new(cfg("https://api.openai.com/v1/", Some("k"))).unwrap();
        assert_eq!(svc.url_chat, "https://api.openai.com/v1/chat/completions");
    }
}
