//! Generator facade w/o async-trait or dynamic trait objects.
//!
//! We expose an enum [`TextGenerator`] with concrete implementations per
//! backend. This keeps async fns simple and avoids boxing futures.

use tracing::info;

use crate::config::{LlmModelConfig, LlmProvider};
use crate::errors::LlmResult;
use crate::services::{open_ai_service::OpenAiService, scripted_service::ScriptedService};

/// Concrete text generator (enum-dispatch).
#[derive(Debug)]
pub enum TextGenerator {
    OpenAi(OpenAiService),
    Scripted(ScriptedService),
}

impl TextGenerator {
    /// Constructs a concrete generator from generic config.
    pub fn from_config(cfg: LlmModelConfig) -> LlmResult<Self> {
        Ok(match cfg.provider {
            LlmProvider::OpenAi => Self::OpenAi(OpenAiService::new(cfg)?),
            LlmProvider::Scripted => Self::Scripted(ScriptedService::default()),
        })
    }

    /// Wraps an existing scripted service (tests, dry runs).
    pub fn scripted(svc: ScriptedService) -> Self {
        Self::Scripted(svc)
    }

    /// Lifecycle start. HTTP-based backends have no persistent session, so
    /// this only logs which backend is active.
    pub fn start(&self) -> LlmResult<()> {
        info!(backend = self.backend_name(), "text generator started");
        Ok(())
    }

    /// Lifecycle stop.
    pub fn stop(&self) -> LlmResult<()> {
        info!(backend = self.backend_name(), "text generator stopped");
        Ok(())
    }

    /// Single generation operation: prompt in, bounded text out.
    pub async fn generate(&self, prompt: &str) -> LlmResult<String> {
        match self {
            Self::OpenAi(svc) => svc.generate(prompt).await,
            Self::Scripted(svc) => svc.generate(prompt).await,
        }
    }

    fn backend_name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai",
            Self::Scripted(_) => "scripted",
        }
    }
}
