use std::path::PathBuf;
use thiserror::Error;

use crate::candidates::CandidateError;
use crate::catalog::CatalogError;
use crate::evaluator::EvaluatorError;
use crate::generation::GenerationError;
use crate::invoker::InvocationError;
use crate::preference::PreferenceError;
use crate::retrieval::RetrievalError;

/// Failure of a single pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("failed to write pipeline output {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize pipeline output: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PipelineError {
    /// Bad input rather than a failing backend.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            PipelineError::Catalog(
                CatalogError::PersonaNotFound { .. } | CatalogError::ProductNotFound { .. }
            ) | PipelineError::Generation(GenerationError::InvalidStage { .. })
        )
    }
}

/// Why one dataset row produced no records.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("{reason}")]
    Configuration { stage: &'static str, reason: String },

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error("{reason}")]
    MalformedOutput { stage: &'static str, reason: String },

    #[error("only {found} distinct candidate(s) after dedupe")]
    InsufficientCandidates { found: usize },

    #[error(transparent)]
    Transport(EvaluatorError),

    #[error("empty summarization")]
    EmptyPrompt,
}

impl RowError {
    /// Name of the step that failed, as logged.
    pub fn stage(&self) -> &'static str {
        match self {
            RowError::Configuration { stage, .. } | RowError::MalformedOutput { stage, .. } => stage,
            RowError::Invocation(_) => "pipeline",
            RowError::InsufficientCandidates { .. } => "dedupe",
            RowError::Transport(_) => "evaluator",
            RowError::EmptyPrompt => "prompt",
        }
    }
}

impl From<CandidateError> for RowError {
    fn from(err: CandidateError) -> Self {
        match err {
            CandidateError::Insufficient { found } => RowError::InsufficientCandidates { found },
            CandidateError::NoCandidates => RowError::MalformedOutput {
                stage: "normalize",
                reason: err.to_string(),
            },
        }
    }
}

impl From<EvaluatorError> for RowError {
    fn from(err: EvaluatorError) -> Self {
        if err.is_transport() {
            RowError::Transport(err)
        } else if err.is_configuration() {
            RowError::Configuration {
                stage: "evaluator",
                reason: err.to_string(),
            }
        } else {
            RowError::MalformedOutput {
                stage: "evaluator",
                reason: err.to_string(),
            }
        }
    }
}

impl From<PreferenceError> for RowError {
    fn from(err: PreferenceError) -> Self {
        RowError::MalformedOutput {
            stage: "pairing",
            reason: err.to_string(),
        }
    }
}

/// Failure to read the input rows file.
#[derive(Debug, Error)]
pub enum RowSourceError {
    #[error("failed to read rows file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV rows in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to parse JSON rows in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a JSON list of rows in {path}")]
    NotAList { path: PathBuf },
}

/// Fatal dataset-run failure (row failures never abort a run).
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error(transparent)]
    Rows(#[from] RowSourceError),

    #[error(transparent)]
    Store(#[from] PreferenceError),
}
