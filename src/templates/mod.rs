//! Style-template index and seeded sampling.
//!
//! The template source mixes two layouts per style group: an object keyed by
//! stage labels, or a list of `{stage, data}` entries. [`TemplateIndex`] flattens
//! both into `(group, stage) -> templates` once at load time.


use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::EVENT_HOOKS;
use crate::domain::Stage;

#[derive(Debug, Clone, Default)]
struct StyleGroup {
    name: String,
    by_stage: HashMap<Stage, Vec<String>>,
}

/// Precomputed template pools, addressed by style index (sorted group name) and stage.
#[derive(Debug, Clone, Default)]
pub struct TemplateIndex {
    groups: Vec<StyleGroup>,
}

impl TemplateIndex {
    /// Normalizes the raw style-group document. Unknown shapes are skipped with a warning.
    pub fn from_value(raw: &Value) -> Self {
        let Some(object) = raw.as_object() else {
            if !raw.is_null() {
                warn!("template document is not an object; no templates indexed");
            }
            return Self::default();
        };

        let sorted: BTreeMap<&String, &Value> = object.iter().collect();
        let groups = sorted
            .into_iter()
            .map(|(name, value)| {
                let content = value.get("content").unwrap_or(value);
                let by_stage = index_group(name, content);
                debug!(
                    group = %name,
                    stages = by_stage.len(),
                    "indexed style group"
                );
                StyleGroup {
                    name: name.clone(),
                    by_stage,
                }
            })
            .collect();

        Self { groups }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group_name(&self, style_index: i64) -> Option<&str> {
        self.group(style_index).map(|g| g.name.as_str())
    }

    /// Templates for a style group and stage; empty when either is unknown.
    pub fn templates(&self, style_index: i64, stage: Stage) -> &[String] {
        self.group(style_index)
            .and_then(|g| g.by_stage.get(&stage))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn group(&self, style_index: i64) -> Option<&StyleGroup> {
        usize::try_from(style_index)
            .ok()
            .and_then(|i| self.groups.get(i))
    }
}

fn index_group(name: &str, content: &Value) -> HashMap<Stage, Vec<String>> {
    let mut by_stage: HashMap<Stage, Vec<String>> = HashMap::new();

    match content {
        Value::Object(stages) => {
            for (label, items) in stages {
                match Stage::from_label(label) {
                    Some(stage) => by_stage.entry(stage).or_default().extend(render_items(items)),
                    None => debug!(group = %name, label = %label, "unrecognized stage label"),
                }
            }
        }
        Value::Array(entries) => {
            for entry in entries {
                let stage = match entry.get("stage") {
                    Some(Value::Number(n)) => n.as_i64().and_then(Stage::from_index),
                    Some(Value::String(s)) => Stage::from_label(s),
                    _ => None,
                };
                let Some(stage) = stage else {
                    debug!(group = %name, "template entry without a usable stage");
                    continue;
                };
                let data = entry.get("data").unwrap_or(&Value::Null);
                by_stage.entry(stage).or_default().extend(render_items(data));
            }
        }
        _ => warn!(group = %name, "style group content has unsupported shape"),
    }

    by_stage
}

fn render_items(items: &Value) -> Vec<String> {
    match items {
        Value::Array(list) => list.iter().filter_map(render_item).collect(),
        other => render_item(other).into_iter().collect(),
    }
}

/// Strings pass through; `{style, title, content}` objects render as `"[style] title :: content"`.
fn render_item(item: &Value) -> Option<String> {
    match item {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => {
            let field = |key: &str| map.get(key).and_then(Value::as_str).unwrap_or("");
            let (style, title, content) = (field("style"), field("title"), field("content"));
            if title.is_empty() && content.is_empty() {
                return None;
            }
            Some(format!("[{style}] {title} :: {content}"))
        }
        _ => None,
    }
}

/// Deterministic-when-seeded selection of style templates and event hooks.
pub struct TemplateSampler {
    rng: Mutex<ChaCha8Rng>,
}

impl std::fmt::Debug for TemplateSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSampler").finish_non_exhaustive()
    }
}

impl TemplateSampler {
    /// `None` seeds from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Up to `limit` distinct templates, in sampled order.
    pub fn sample(&self, pool: &[String], limit: usize) -> Vec<String> {
        let mut rng = self.rng.lock();
        pool.choose_multiple(&mut *rng, limit).cloned().collect()
    }

    pub fn event_hook(&self) -> &'static str {
        let mut rng = self.rng.lock();
        EVENT_HOOKS.choose(&mut *rng).copied().unwrap_or_default()
    }
}
