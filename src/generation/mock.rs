use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::GenerationError;
use super::{ChatTurn, Generator, SamplingParams};

/// Replays scripted replies in order and counts calls. Test support.
#[derive(Debug)]
pub struct ScriptedGenerator {
    model: String,
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<ChatTurn>>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(model: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model: model.into(),
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Queues a failure after the scripted replies.
    pub fn push_error(&self, error: GenerationError) {
        self.replies.lock().push_back(Err(error));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every message list this generator was called with.
    pub fn seen(&self) -> Vec<Vec<ChatTurn>> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        messages: &[ChatTurn],
        _sampling: &SamplingParams,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(messages.to_vec());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                Err(GenerationError::Backend {
                    model: self.model.clone(),
                    reason: "script exhausted".to_string(),
                })
            })
    }
}
