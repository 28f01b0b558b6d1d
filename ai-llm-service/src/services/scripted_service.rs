//! Scripted generator: returns pre-canned responses in order.
//!
//! Used by tests and dry runs where no model backend is reachable. The last
//! response repeats once the script is exhausted.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::{LlmError, LlmResult};

#[derive(Debug, Default)]
pub struct ScriptedService {
    responses: Vec<String>,
    cursor: AtomicUsize,
}

impl ScriptedService {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Single canned response for every call.
    pub fn single(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    pub async fn generate(&self, _prompt: &str) -> LlmResult<String> {
        if self.responses.is_empty() {
            return Err(LlmError::EmptyChoices);
        }
        let idx = self
            .cursor
            .fetch_add(1, Ordering::Relaxed)
            .min(self.responses.len() - 1);
        Ok(self.responses[idx].clone())
    }
}
