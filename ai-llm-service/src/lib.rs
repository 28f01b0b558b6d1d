//! Pluggable text generation for the review pipeline.
//!
//! The core contract is deliberately small: `start`/`stop` lifecycle plus a
//! single `generate(prompt) -> text` call. Implementations:
//! - [`services::open_ai_service::OpenAiService`] — OpenAI-compatible
//!   chat-completions over HTTP (non-streaming).
//! - [`services::scripted_service::ScriptedService`] — canned responses for
//!   tests and dry runs.
//!
//! Callers depend only on [`generator::TextGenerator`] (enum-dispatch, no
//! `Box<dyn ...>`), so streaming or session-based backends can be added
//! without touching consumers.

pub mod config;
pub mod errors;
pub mod generator;
pub mod services;

pub use config::{LlmModelConfig, LlmProvider};
pub use errors::{LlmError, LlmResult};
pub use generator::TextGenerator;
