//! Reference data and the per-row unit of work.
//!
//! Personas and products are read once from the catalog and never mutated.
//! A [`GenerationRow`] is created per input row and dropped after its output is produced.

pub(crate) mod serde_helpers;


use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use serde_helpers::{bool_like, opt_f64_like, opt_string_like, string_or_list};

/// Lifecycle-marketing stage, in index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Acquisition,
    Activation,
    Retention,
    Revenue,
    Referral,
}

/// All stages; position equals `stage_index`.
pub const STAGE_ORDER: [Stage; 5] = [
    Stage::Acquisition,
    Stage::Activation,
    Stage::Retention,
    Stage::Revenue,
    Stage::Referral,
];

impl Stage {
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| STAGE_ORDER.get(i).copied())
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Acquisition => "Acquisition",
            Stage::Activation => "Activation",
            Stage::Retention => "Retention",
            Stage::Revenue => "Revenue",
            Stage::Referral => "Referral",
        }
    }

    /// Resolves a template-source stage label: a bare index (`"2"`) or any label
    /// containing the stage name (`"3_Retention_..."`), case-insensitive.
    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        if let Ok(index) = trimmed.parse::<i64>() {
            return Self::from_index(index);
        }
        let lower = trimmed.to_lowercase();
        STAGE_ORDER
            .into_iter()
            .find(|stage| lower.contains(&stage.name().to_lowercase()))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A customer review; only used as a retrieval candidate source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub text: String,
    #[serde(default, deserialize_with = "opt_f64_like")]
    pub rating: Option<f64>,
}

/// Customer-archetype profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub skin_type: String,
    #[serde(default)]
    pub value_focus: String,
    #[serde(default)]
    pub shopping_style: String,
    #[serde(default)]
    pub growth_point: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub traits: Vec<String>,
    /// Any other profile fields, preserved for output records.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "opt_string_like")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub brand_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "opt_string_like")]
    pub price: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Product {
    /// Identity used in highlight cache keys: the id when present, else the name.
    pub fn identity(&self) -> &str {
        self.product_id.as_deref().unwrap_or(&self.name)
    }
}

/// How a row refers to its persona: list index or display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersonaRef {
    Index(i64),
    Name(String),
}

impl PersonaRef {
    /// Integer-looking strings become indices.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(i) => PersonaRef::Index(i),
            Err(_) => PersonaRef::Name(trimmed.to_string()),
        }
    }
}

impl fmt::Display for PersonaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaRef::Index(i) => write!(f, "{i}"),
            PersonaRef::Name(name) => f.write_str(name),
        }
    }
}

/// The unit of work submitted to a generation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRow {
    pub persona: PersonaRef,
    pub brand: String,
    pub product: String,
    pub stage_index: i64,
    #[serde(default)]
    pub style_index: i64,
    #[serde(default, deserialize_with = "bool_like")]
    pub is_event: bool,
}

impl GenerationRow {
    pub fn stage(&self) -> Option<Stage> {
        Stage::from_index(self.stage_index)
    }
}

/// `1/true/yes/y/t` (case-insensitive, trimmed) are true; everything else is false.
pub fn parse_bool_like(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "t"
    )
}
