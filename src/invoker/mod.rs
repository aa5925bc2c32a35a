//! Adaptive invocation of generation entry points.
//!
//! New stages implement [`GenerationStage`] and are wrapped in [`Typed`]. Entry
//! points with an unknown calling convention go through [`AdaptiveInvoker`],
//! which tries, in order: keyword arguments, one structured argument (arity 1),
//! positional arguments, and finally a synthesized argument vector with the
//! result parsed from captured stdout. Zero-arity targets go straight to the last.

mod callable;
mod command;
mod error;
mod output;


pub use callable::{
    GenerationStage, PipelineCallable, Typed, keyword_args, positional_args, row_argv,
};
pub use command::CommandEntry;
pub use error::{CallError, InvocationError};
pub use output::{PipelinePayload, extract_pipeline_output, parse_stdout_payload};

use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::GenerationRow;

/// Calling convention that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Keyword,
    Structured,
    Positional,
    Argv,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Keyword => "keyword",
            Strategy::Structured => "structured",
            Strategy::Positional => "positional",
            Strategy::Argv => "argv",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveInvoker;

impl AdaptiveInvoker {
    pub fn new() -> Self {
        Self
    }

    /// Finds a calling convention `target` accepts and returns its raw result.
    ///
    /// Only a signature mismatch moves on to the next convention; any other
    /// failure ends the invocation.
    #[instrument(skip(self, target, row), fields(arity = ?target.arity()))]
    pub async fn invoke(
        &self,
        target: &dyn PipelineCallable,
        row: &GenerationRow,
    ) -> Result<(Strategy, Value), InvocationError> {
        let arity = target.arity();
        let mut last_mismatch = String::from("no strategy attempted");

        if arity != Some(0) {
            match target.call_keyword(&keyword_args(row)).await {
                Ok(value) => return Ok((Strategy::Keyword, value)),
                Err(e) => last_mismatch = Self::continue_after(Strategy::Keyword, e)?,
            }

            if arity == Some(1) {
                match target.call_structured(row).await {
                    Ok(value) => return Ok((Strategy::Structured, value)),
                    Err(e) => last_mismatch = Self::continue_after(Strategy::Structured, e)?,
                }
            }

            match target.call_positional(&positional_args(row)).await {
                Ok(value) => return Ok((Strategy::Positional, value)),
                Err(e) => last_mismatch = Self::continue_after(Strategy::Positional, e)?,
            }
        }

        let mut captured = Vec::new();
        match target.call_with_argv(&row_argv(row), &mut captured).await {
            Ok(Some(value)) => Ok((Strategy::Argv, value)),
            Ok(None) => {
                let stdout = String::from_utf8_lossy(&captured);
                parse_stdout_payload(&stdout).map(|value| (Strategy::Argv, value))
            }
            Err(CallError::SignatureMismatch(reason)) => {
                debug!(previous = %last_mismatch, "argv convention rejected");
                Err(InvocationError::Exhausted { last: reason })
            }
            Err(CallError::Failed(reason)) => Err(InvocationError::Failed {
                strategy: Strategy::Argv.name(),
                reason,
            }),
        }
    }

    fn continue_after(strategy: Strategy, error: CallError) -> Result<String, InvocationError> {
        match error {
            CallError::SignatureMismatch(reason) => {
                debug!(strategy = strategy.name(), reason = %reason, "convention rejected");
                Ok(reason)
            }
            CallError::Failed(reason) => Err(InvocationError::Failed {
                strategy: strategy.name(),
                reason,
            }),
        }
    }
}
