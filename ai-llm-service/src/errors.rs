//! Errors produced by the text-generation clients.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for generator operations.
pub type LlmResult<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    /// API key is missing for a provider that requires one.
    #[error("[AI LLM Service] missing API key for provider {0}")]
    MissingApiKey(&'static str),

    /// Invalid endpoint (empty or missing http/https).
    #[error("[AI LLM Service] invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Transport/HTTP client error.
    #[error("[AI LLM Service] transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful HTTP status from upstream.
    #[error("[AI LLM Service] unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    /// Upstream reported an error payload.
    #[error("[AI LLM Service] api error: {0}")]
    Api(String),

    /// Unexpected/invalid JSON response.
    #[error("[AI LLM Service] failed to decode response: {0}")]
    Decode(String),

    /// The completion returned no choices.
    #[error("[AI LLM Service] empty response: no choices returned")]
    EmptyChoices,
}
