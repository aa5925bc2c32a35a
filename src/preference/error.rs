use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreferenceError {
    /// `chosen_id` names no candidate in the batch.
    #[error("chosen response id {chosen} is not in the batch")]
    UnknownChoice { chosen: i64 },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a JSON list in {path}")]
    NotAList { path: PathBuf },
}
