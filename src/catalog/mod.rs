//! Reference catalog: personas, products, brand stories, CRM goals and CRM example buckets.
//!
//! Loaded once from the data directory and shared read-only afterwards.

mod error;

#[cfg(test)]
mod tests;

pub use error::CatalogError;

use std::collections::HashMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::domain::{Persona, PersonaRef, Product, Stage};

pub const PERSONAS_FILE: &str = "personas.json";
pub const PRODUCTS_FILE: &str = "products.json";
pub const BRAND_STORIES_FILE: &str = "brand_stories.json";
pub const CRM_GOALS_FILE: &str = "crm_goals.json";
pub const CRM_BUCKETS_FILE: &str = "crm_analysis_results_categorized.json";
pub const TEMPLATES_FILE: &str = "integrated_crm_templates.json";

/// Brand narrative and tone used by the tone-correction stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandStory {
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub story: String,
    #[serde(default)]
    pub tone_keywords: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What a message for one stage should achieve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmGoal {
    #[serde(default)]
    pub stage_kr: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub target_state: String,
    #[serde(default)]
    pub allowed_context: Vec<String>,
    #[serde(default)]
    pub forbidden_context: Vec<String>,
    #[serde(default)]
    pub cta_style: String,
}

/// One analysed CRM message example.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmItem {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub extracted_text: String,
    #[serde(default)]
    pub source_index: Option<Value>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl CrmItem {
    /// Retrieval document: description and extracted text joined by a space.
    pub fn document(&self) -> String {
        format!("{} {}", self.description, self.extracted_text)
            .trim()
            .to_string()
    }
}

/// CRM examples grouped under one stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageBucket {
    pub stage_index: i64,
    #[serde(default)]
    pub items: Vec<CrmItem>,
}

/// Immutable reference data.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub personas: Vec<Persona>,
    pub products: Vec<Product>,
    pub brand_stories: HashMap<String, BrandStory>,
    pub crm_goals: HashMap<String, CrmGoal>,
    pub crm_buckets: Vec<StageBucket>,
    /// Raw style-group document; normalized by [`crate::templates::TemplateIndex`].
    pub templates: Value,
}

impl Catalog {
    /// Reads every catalog file from `data_dir`. Only personas and products are required.
    pub fn load(data_dir: &Path) -> Result<Self, CatalogError> {
        let personas: Vec<Persona> = read_json(&data_dir.join(PERSONAS_FILE))?;
        let products: Vec<Product> = read_json(&data_dir.join(PRODUCTS_FILE))?;
        let brand_stories = read_optional_json(&data_dir.join(BRAND_STORIES_FILE))?;
        let crm_goals = read_optional_json(&data_dir.join(CRM_GOALS_FILE))?;
        let crm_buckets = read_optional_json(&data_dir.join(CRM_BUCKETS_FILE))?;
        let templates =
            read_optional_json::<Value>(&data_dir.join(TEMPLATES_FILE))?.unwrap_or(Value::Null);

        let catalog = Self {
            personas,
            products,
            brand_stories: brand_stories.unwrap_or_default(),
            crm_goals: crm_goals.unwrap_or_default(),
            crm_buckets: crm_buckets.unwrap_or_default(),
            templates,
        };

        info!(
            data_dir = %data_dir.display(),
            personas = catalog.personas.len(),
            products = catalog.products.len(),
            brand_stories = catalog.brand_stories.len(),
            crm_buckets = catalog.crm_buckets.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Integer references (or integer-looking names) index the persona list;
    /// anything else matches the display name case-insensitively.
    pub fn find_persona(&self, input: &PersonaRef) -> Result<&Persona, CatalogError> {
        let index = match input {
            PersonaRef::Index(i) => Some(*i),
            PersonaRef::Name(name) => name.trim().parse::<i64>().ok(),
        };

        let found = match index {
            Some(i) => usize::try_from(i).ok().and_then(|i| self.personas.get(i)),
            None => {
                let wanted = input.to_string().to_lowercase();
                self.personas
                    .iter()
                    .find(|p| p.name.to_lowercase() == wanted)
            }
        };

        found.ok_or_else(|| CatalogError::PersonaNotFound {
            input: input.to_string(),
        })
    }

    /// Prefers an exact brand with a name containing `name`; otherwise the first
    /// product whose brand contains `brand` or whose name contains `name`.
    pub fn find_product(&self, brand: &str, name: &str) -> Result<&Product, CatalogError> {
        let brand_l = brand.trim().to_lowercase();
        let name_l = name.trim().to_lowercase();

        let exact = self.products.iter().find(|p| {
            p.brand_name.trim().to_lowercase() == brand_l
                && p.name.trim().to_lowercase().contains(&name_l)
        });
        if let Some(product) = exact {
            return Ok(product);
        }

        self.products
            .iter()
            .find(|p| {
                p.brand_name.trim().to_lowercase().contains(&brand_l)
                    || p.name.trim().to_lowercase().contains(&name_l)
            })
            .ok_or_else(|| CatalogError::ProductNotFound {
                brand: brand.to_string(),
                product: name.to_string(),
            })
    }

    /// Exact key, then case-insensitive `name_en`, else an empty story.
    pub fn pick_brand_story(&self, brand: &str) -> BrandStory {
        if let Some(story) = self.brand_stories.get(brand) {
            return story.clone();
        }
        let wanted = brand.to_lowercase();
        self.brand_stories
            .values()
            .find(|s| !s.name_en.is_empty() && s.name_en.to_lowercase() == wanted)
            .cloned()
            .unwrap_or_default()
    }

    pub fn crm_goal(&self, stage: Stage) -> CrmGoal {
        self.crm_goals.get(stage.name()).cloned().unwrap_or_default()
    }

    pub fn stage_bucket(&self, stage: Stage) -> Option<&StageBucket> {
        self.crm_buckets
            .iter()
            .find(|b| b.stage_index == stage.index() as i64)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_optional_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CatalogError> {
    if !path.exists() {
        debug!(path = %path.display(), "optional catalog file absent");
        return Ok(None);
    }
    read_json(path).map(Some)
}
