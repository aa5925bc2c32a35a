//! External judge that picks the better candidate message.

mod client;
mod config;
mod error;
pub mod protocol;

#[cfg(test)]
mod tests;

pub use client::EvaluatorClient;
pub use config::{
    API_KEY_VAR, DEFAULT_EVALUATOR_MODEL, DEFAULT_EVALUATOR_TIMEOUT_SECS, DEFAULT_EVALUATOR_URL,
    EvaluatorConfig,
};
pub use error::EvaluatorError;
pub use protocol::{extract_response_text, parse_choice, resolve_choice};

use async_trait::async_trait;

use crate::candidates::Candidate;

/// Picks the preferred candidate of a batch.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Returns the response id of the chosen candidate; it always names a
    /// member of `candidates`.
    async fn pick_best(&self, prompt: &str, candidates: &[Candidate]) -> Result<i64, EvaluatorError>;
}
