//! Generator configuration.
//!
//! One universal [`LlmModelConfig`] covers every provider; provider-specific
//! constructors validate the fields they actually need.

use std::env;

/// Supported generator backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// OpenAI-compatible chat-completions endpoint.
    OpenAi,
    /// In-process scripted responses (tests, dry runs).
    Scripted,
}

impl LlmProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Scripted => "scripted",
        }
    }
}

/// Universal model configuration shared by all providers.
#[derive(Debug, Clone)]
pub struct LlmModelConfig {
    pub provider: LlmProvider,
    /// Model identifier, e.g. `gpt-4`.
    pub model: String,
    /// API base, e.g. `https://api.openai.com/v1`.
    pub endpoint: String,
    /// Bearer token; required for remote providers.
    pub api_key: Option<String>,
    /// Request timeout in seconds (default 60).
    pub timeout_secs: Option<u64>,
    /// Sampling temperature (default 0.3).
    pub temperature: Option<f32>,
    /// Completion budget (default 2000).
    pub max_tokens: Option<u32>,
}

impl LlmModelConfig {
    /// Builds a config from environment variables.
    ///
    /// - `LLM_PROVIDER` — `openai` (default) or `scripted` (dry runs)
    /// - `OPENAI_MODEL` / `COPILOT_MODEL` — model name fallback chain
    /// - `OPENAI_API_KEY`
    /// - `OPENAI_BASE_URL` — default `https://api.openai.com/v1`
    pub fn from_env() -> Self {
        let provider = match env::var("LLM_PROVIDER").as_deref() {
            Ok("scripted") => LlmProvider::Scripted,
            _ => LlmProvider::OpenAi,
        };

        let model = env::var("OPENAI_MODEL")
            .or_else(|_| env::var("COPILOT_MODEL"))
            .unwrap_or_else(|_| "gpt-4".to_string());

        let endpoint =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());

        Self {
            provider,
            model,
            endpoint,
            api_key,
            timeout_secs: None,
            temperature: None,
            max_tokens: None,
        }
    }
}
