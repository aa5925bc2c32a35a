use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::error::GenerationError;
use super::{ChatTurn, Generator, Role, SamplingParams};
use crate::retrieval::highlight::clip_chars;

/// Offline generator: numbered, deterministic replies derived from the last user turn.
#[derive(Debug)]
pub struct EchoGenerator {
    model: String,
    calls: AtomicUsize,
}

impl EchoGenerator {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        messages: &[ChatTurn],
        _sampling: &SamplingParams,
    ) -> Result<String, GenerationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let last_user = messages
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.lines().find(|l| !l.trim().is_empty()).unwrap_or(""))
            .unwrap_or("");
        Ok(format!(
            "[제목] {} #{n}\n[본문] {}",
            self.model,
            clip_chars(last_user.trim(), 80, "...")
        ))
    }
}
