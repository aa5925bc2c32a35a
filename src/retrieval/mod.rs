//! Embedding-based ranking of evidence snippets.

mod error;
pub mod highlight;


pub use error::RetrievalError;
pub use highlight::{
    build_persona_query, extract_candidate_texts, extract_highlight_snippet, is_positive_review,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::embedding::TextEmbedder;

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSnippet {
    pub score: f32,
    /// Position in the candidate list passed to [`VectorRanker::rank`].
    pub index: usize,
    pub text: String,
    pub snippet: String,
}

/// A CRM example ranked against a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrmSnippet {
    pub score: f32,
    pub source_index: Option<serde_json::Value>,
    pub filename: Option<String>,
    pub text: String,
}

/// Cosine similarity over the common prefix; 0.0 when either side has zero norm.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let (a, b) = (&a[..len], &b[..len]);

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Ranks candidate strings against a query by embedding similarity.
#[derive(Clone)]
pub struct VectorRanker {
    embedder: Arc<dyn TextEmbedder>,
}

impl std::fmt::Debug for VectorRanker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorRanker").finish_non_exhaustive()
    }
}

impl VectorRanker {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Self {
        Self { embedder }
    }

    /// Returns the `top_k` best candidates, score descending, ties by original index.
    ///
    /// An empty candidate list never reaches the embedder.
    #[instrument(skip(self, query, candidates), fields(candidates = candidates.len()))]
    pub fn rank(
        &self,
        query: &str,
        candidates: &[String],
        top_k: usize,
    ) -> Result<Vec<RankedSnippet>, RetrievalError> {
        if candidates.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let mut texts: Vec<&str> = Vec::with_capacity(candidates.len() + 1);
        texts.push(query);
        texts.extend(candidates.iter().map(String::as_str));

        let vectors = self.embedder.embed_batch(&texts)?;
        if vectors.len() != texts.len() {
            return Err(RetrievalError::VectorCountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }

        let (query_vec, candidate_vecs) = vectors.split_at(1);
        let mut scored: Vec<(f32, usize)> = candidate_vecs
            .iter()
            .enumerate()
            .map(|(i, v)| (cosine(&query_vec[0], v), i))
            .collect();

        // Stable: equal scores keep ascending index order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);

        debug!(
            returned = scored.len(),
            best = scored.first().map(|s| s.0),
            "ranked candidates"
        );

        Ok(scored
            .into_iter()
            .map(|(score, index)| RankedSnippet {
                score,
                index,
                text: candidates[index].clone(),
                snippet: extract_highlight_snippet(&candidates[index]),
            })
            .collect())
    }
}
