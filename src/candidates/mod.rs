//! Candidate normalization and deduplication.
//!
//! Generator output arrives in several shapes: an object holding a list under a
//! known key, a bare list, or a single value. [`normalize`] flattens all of them
//! into [`Candidate`]s with stable response ids; [`dedupe`] keeps the first
//! occurrence of each trimmed text.

mod error;


pub use error::CandidateError;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Object keys that may hold the candidate list, in probe order.
const LIST_KEYS: &[&str] = &["candidates", "messages", "crm_messages"];

/// Object keys that may hold a candidate's text, in probe order.
const TEXT_KEYS: &[&str] = &["text", "crm_message", "message", "content"];

const ID_KEY: &str = "response_id";

/// One generated message competing for the `chosen` slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub response_id: i64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Candidate {
    pub fn new(response_id: i64, text: impl Into<String>) -> Self {
        Self {
            response_id,
            text: text.into(),
            metadata: Map::new(),
        }
    }
}

/// Coerces raw generator output into candidates.
///
/// Ids come from a supplied `response_id` when present, otherwise from the
/// position in the normalized list. Ids are unique within the result: a
/// supplied id claims its value first, and a repeated supplied id or a taken
/// position moves to the next free id. Elements without text are dropped.
pub fn normalize(raw: &Value) -> Vec<Candidate> {
    let selected = match raw {
        Value::Object(map) => list_under_known_key(map).unwrap_or(raw),
        _ => raw,
    };
    let items: Vec<&Value> = match selected {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    let mut drafts = Vec::with_capacity(items.len());
    for item in items {
        let Some((text, text_key)) = candidate_text(item) else {
            continue;
        };
        let (supplied, metadata) = match item {
            Value::Object(map) => {
                let metadata = map
                    .iter()
                    .filter(|(k, _)| k.as_str() != ID_KEY && Some(k.as_str()) != text_key)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                (map.get(ID_KEY).and_then(id_like), metadata)
            }
            _ => (None, Map::new()),
        };
        drafts.push((supplied, text, metadata));
    }

    let mut used: HashSet<i64> = HashSet::with_capacity(drafts.len());
    let claimed: Vec<Option<i64>> = drafts
        .iter()
        .map(|(supplied, _, _)| supplied.filter(|id| used.insert(*id)))
        .collect();

    let mut normalized = Vec::with_capacity(drafts.len());
    for ((_, text, metadata), claimed) in drafts.into_iter().zip(claimed) {
        let response_id = match claimed {
            Some(id) => id,
            None => {
                let mut id = normalized.len() as i64;
                while !used.insert(id) {
                    id += 1;
                }
                id
            }
        };
        normalized.push(Candidate {
            response_id,
            text,
            metadata,
        });
    }
    normalized
}

/// Keeps the first candidate for each distinct trimmed text, in order.
/// Empty and whitespace-only texts are dropped.
pub fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|candidate| {
            let key = candidate.text.trim();
            !key.is_empty() && seen.insert(key.to_string())
        })
        .collect()
}

/// Checks that a deduplicated batch can form at least one preference pair.
pub fn ensure_pairable(candidates: &[Candidate]) -> Result<(), CandidateError> {
    if candidates.is_empty() {
        return Err(CandidateError::NoCandidates);
    }
    if candidates.len() < 2 {
        return Err(CandidateError::Insufficient {
            found: candidates.len(),
        });
    }
    Ok(())
}

fn list_under_known_key(map: &Map<String, Value>) -> Option<&Value> {
    LIST_KEYS
        .iter()
        .find_map(|key| map.get(*key))
        .or_else(|| map.get("crm_message").filter(|v| v.is_array()))
}

fn candidate_text(item: &Value) -> Option<(String, Option<&'static str>)> {
    match item {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some((s.clone(), None)),
        Value::Object(map) => TEXT_KEYS.iter().find_map(|key| match map.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => Some((s.clone(), Some(*key))),
            _ => None,
        }),
        other => Some((other.to_string(), None)),
    }
}

fn id_like(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
