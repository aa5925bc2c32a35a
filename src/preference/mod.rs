//! Preference pairs and their on-disk store.
//!
//! The store is a single pretty-printed JSON array. Every save reloads it,
//! appends, and rewrites the whole file, so running the same input twice adds
//! the same records twice.

mod error;


pub use error::PreferenceError;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::candidates::Candidate;

/// One `(prompt, chosen, rejected)` training triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    pub prompt: String,
    pub chosen: String,
    pub rejected: String,
}

/// One record per candidate other than the chosen one; empty rejected texts are skipped.
pub fn build(
    prompt: &str,
    candidates: &[Candidate],
    chosen_id: i64,
) -> Result<Vec<PreferenceRecord>, PreferenceError> {
    let chosen_pos = candidates
        .iter()
        .position(|c| c.response_id == chosen_id)
        .ok_or(PreferenceError::UnknownChoice { chosen: chosen_id })?;
    let chosen = &candidates[chosen_pos].text;

    Ok(candidates
        .iter()
        .enumerate()
        .filter(|(pos, c)| *pos != chosen_pos && !c.text.is_empty())
        .map(|(_, c)| PreferenceRecord {
            prompt: prompt.to_string(),
            chosen: chosen.clone(),
            rejected: c.text.clone(),
        })
        .collect())
}

/// Load-modify-rewrite store at a fixed path.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored element, unvalidated. A missing file is an empty store.
    pub async fn load(&self) -> Result<Vec<Value>, PreferenceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PreferenceError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let data: Value = serde_json::from_slice(&bytes).map_err(|source| PreferenceError::Parse {
            path: self.path.clone(),
            source,
        })?;
        match data {
            Value::Array(items) => Ok(items),
            _ => Err(PreferenceError::NotAList {
                path: self.path.clone(),
            }),
        }
    }

    /// Appends `records` to the stored list and rewrites the file. Returns the new total.
    #[instrument(skip(self, records), fields(path = %self.path.display(), new = records.len()))]
    pub async fn append_and_save(&self, records: &[PreferenceRecord]) -> Result<usize, PreferenceError> {
        let mut stored = self.load().await?;
        for record in records {
            stored.push(serde_json::to_value(record).map_err(|source| PreferenceError::Parse {
                path: self.path.clone(),
                source,
            })?);
        }

        self.write_all(&stored).await?;
        debug!(total = stored.len(), "preference store rewritten");
        Ok(stored.len())
    }

    async fn write_all(&self, items: &[Value]) -> Result<(), PreferenceError> {
        let io_err = |source| PreferenceError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let mut json = serde_json::to_vec_pretty(items).map_err(|source| PreferenceError::Parse {
            path: self.path.clone(),
            source,
        })?;
        json.push(b'\n');

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}
