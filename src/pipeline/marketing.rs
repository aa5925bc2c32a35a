use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::error::PipelineError;
use crate::cache::{
    CachePolicy, CacheRegistry, ChatGeneratorFactory, EchoGeneratorFactory, GeneratorFactory,
    GeneratorKey, HighlightKey,
};
use crate::catalog::{Catalog, StageBucket};
use crate::config::Config;
use crate::constants::{CRM_SNIPPET_MAX_CHARS, DRAFT_QUERY_CHARS, STYLE_EXAMPLE_LIMIT};
use crate::domain::{GenerationRow, Persona, PersonaRef, Product, Stage};
use crate::embedding::{EmbedderConfig, LazyEmbedder};
use crate::generation::prompts::{
    CorrectionInput, DraftInput, clean_model_output, corrector_messages, drafter_messages,
    summarize_persona,
};
use crate::generation::{ChatTurn, GenerationError, GeneratorRole};
use crate::invoker::{CallError, GenerationStage, PipelinePayload};
use crate::retrieval::highlight::clip_chars;
use crate::retrieval::{
    CrmSnippet, RankedSnippet, RetrievalError, VectorRanker, build_persona_query,
    extract_candidate_texts,
};
use crate::templates::{TemplateIndex, TemplateSampler};

/// Per-run settings that callers may override.
#[derive(Debug, Clone)]
pub struct PipelineDefaults {
    pub drafter_model: String,
    pub corrector_model: String,
    pub top_k: usize,
    pub cache: CachePolicy,
}

impl From<&Config> for PipelineDefaults {
    fn from(config: &Config) -> Self {
        Self {
            drafter_model: config.drafter_model.clone(),
            corrector_model: config.corrector_model.clone(),
            top_k: config.top_k,
            cache: CachePolicy::from_enabled(config.cache_enabled),
        }
    }
}

/// One pipeline invocation: a row plus optional overrides.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub row: GenerationRow,
    pub top_k: Option<usize>,
    pub drafter_model: Option<String>,
    pub corrector_model: Option<String>,
    pub cache: Option<CachePolicy>,
}

impl From<GenerationRow> for RunRequest {
    fn from(row: GenerationRow) -> Self {
        Self {
            row,
            top_k: None,
            drafter_model: None,
            corrector_model: None,
            cache: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductBasic {
    pub product_id: Option<String>,
    pub name: String,
    pub brand_name: String,
    pub price: Option<String>,
    pub url: Option<String>,
}

impl From<&Product> for ProductBasic {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.product_id.clone(),
            name: product.name.clone(),
            brand_name: product.brand_name.clone(),
            price: product.price.clone(),
            url: product.url.clone(),
        }
    }
}

/// Context a judge sees next to the candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summarization {
    pub persona: String,
    pub brand: String,
    pub product: String,
    pub stage: String,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrafterDetails {
    pub model: String,
    pub draft: String,
    pub highlights: Vec<RankedSnippet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectorDetails {
    pub model: String,
    pub prompt_messages: Vec<ChatTurn>,
    pub crm_snippets: Vec<CrmSnippet>,
    pub style_examples: Vec<String>,
    pub event_hook: Option<String>,
    pub result_raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub step: String,
    pub model: String,
    pub started_at: String,
    pub ended_at: String,
    pub duration_seconds: f64,
}

/// Full result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub run_id: String,
    pub timestamp: String,
    pub persona_input: PersonaRef,
    pub persona_profile: Persona,
    pub brand: String,
    pub product_query: String,
    pub product_basic: ProductBasic,
    pub stage_index: i64,
    pub stage_name: String,
    pub style_index: i64,
    pub is_event: bool,
    pub summarization: Summarization,
    pub crm_message: String,
    pub drafter: DrafterDetails,
    pub corrector: CorrectorDetails,
    pub timeline: Vec<TimelineEntry>,
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Draft-then-correct generation for one (persona, product, stage) row.
pub struct MarketingPipeline {
    catalog: Arc<Catalog>,
    registry: Arc<CacheRegistry>,
    ranker: VectorRanker,
    sampler: TemplateSampler,
    defaults: PipelineDefaults,
}

impl std::fmt::Debug for MarketingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketingPipeline")
            .field("personas", &self.catalog.personas.len())
            .field("products", &self.catalog.products.len())
            .field("registry", &self.registry)
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl MarketingPipeline {
    pub fn new(
        catalog: Arc<Catalog>,
        registry: Arc<CacheRegistry>,
        ranker: VectorRanker,
        sampler: TemplateSampler,
        defaults: PipelineDefaults,
    ) -> Self {
        Self {
            catalog,
            registry,
            ranker,
            sampler,
            defaults,
        }
    }

    /// Loads the catalog and wires embedder, generator factory and sampler from `config`.
    ///
    /// The embedding model is loaded on first use, not here.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let catalog = Catalog::load(&config.data_dir)?;
        let templates = TemplateIndex::from_value(&catalog.templates);

        let factory: Arc<dyn GeneratorFactory> = if config.mock_generators {
            Arc::new(EchoGeneratorFactory)
        } else {
            Arc::new(ChatGeneratorFactory::new(genai::Client::default()))
        };

        let embedder_config = match &config.embedding_model_path {
            Some(dir) => EmbedderConfig::new(dir.clone()),
            None => EmbedderConfig::stub(),
        };
        let ranker = VectorRanker::new(Arc::new(LazyEmbedder::new(embedder_config)));

        info!(
            personas = catalog.personas.len(),
            products = catalog.products.len(),
            style_groups = templates.group_count(),
            mock_generators = config.mock_generators,
            "pipeline initialized"
        );

        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(CacheRegistry::new(factory, templates)),
            ranker,
            TemplateSampler::new(config.seed),
            PipelineDefaults::from(config),
        ))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &CacheRegistry {
        &self.registry
    }

    pub fn defaults(&self) -> &PipelineDefaults {
        &self.defaults
    }

    #[instrument(
        skip(self, request),
        fields(persona = %request.row.persona, brand = %request.row.brand, stage = request.row.stage_index)
    )]
    pub async fn execute(&self, request: &RunRequest) -> Result<PipelineRecord, PipelineError> {
        let row = &request.row;
        let stage = row.stage().ok_or(GenerationError::InvalidStage {
            stage: row.stage_index,
        })?;
        let persona = self.catalog.find_persona(&row.persona)?;
        let product = self.catalog.find_product(&row.brand, &row.product)?;

        let top_k = request.top_k.unwrap_or(self.defaults.top_k);
        let policy = request.cache.unwrap_or(self.defaults.cache);
        let drafter_model = request
            .drafter_model
            .as_deref()
            .unwrap_or(&self.defaults.drafter_model);
        let corrector_model = request
            .corrector_model
            .as_deref()
            .unwrap_or(&self.defaults.corrector_model);

        let highlights = self.highlights(persona, product, top_k, policy)?;
        let highlight_texts: Vec<String> = highlights.iter().map(|h| h.snippet.clone()).collect();

        let mut timeline = Vec::with_capacity(2);

        let draft_messages = drafter_messages(&DraftInput {
            brand: &product.brand_name,
            product_name: &product.name,
            persona,
            reviews: &product.reviews,
            highlights: &highlight_texts,
        });
        let draft = self
            .generate(GeneratorRole::Drafter, drafter_model, &draft_messages, policy, &mut timeline)
            .await?;

        let brand_story = self.catalog.pick_brand_story(&row.brand);
        let crm_goal = self.catalog.crm_goal(stage);
        let crm_snippets = match self.catalog.stage_bucket(stage) {
            Some(bucket) => self.crm_snippets(bucket, &draft, top_k)?,
            None => {
                debug!(stage = %stage, "no CRM bucket for stage");
                Vec::new()
            }
        };
        let style_examples = self.sampler.sample(
            self.registry.templates().templates(row.style_index, stage),
            STYLE_EXAMPLE_LIMIT,
        );
        let event_hook = row.is_event.then(|| self.sampler.event_hook());

        let correction_messages = corrector_messages(&CorrectionInput {
            draft: &draft,
            persona,
            brand_story: &brand_story,
            crm_goal: &crm_goal,
            stage,
            crm_snippets: &crm_snippets,
            style_examples: &style_examples,
            event_hook,
        });
        let corrected = self
            .generate(
                GeneratorRole::Corrector,
                corrector_model,
                &correction_messages,
                policy,
                &mut timeline,
            )
            .await?;

        info!(
            highlights = highlights.len(),
            crm_snippets = crm_snippets.len(),
            style_examples = style_examples.len(),
            "pipeline run finished"
        );

        Ok(PipelineRecord {
            run_id: uuid::Uuid::new_v4().to_string(),
            timestamp: rfc3339(Utc::now()),
            persona_input: row.persona.clone(),
            persona_profile: persona.clone(),
            brand: row.brand.clone(),
            product_query: row.product.clone(),
            product_basic: ProductBasic::from(product),
            stage_index: row.stage_index,
            stage_name: stage.name().to_string(),
            style_index: row.style_index,
            is_event: row.is_event,
            summarization: Summarization {
                persona: summarize_persona(persona),
                brand: product.brand_name.clone(),
                product: product.name.clone(),
                stage: stage.name().to_string(),
                highlights: highlight_texts,
            },
            crm_message: corrected.clone(),
            drafter: DrafterDetails {
                model: drafter_model.to_string(),
                draft,
                highlights: highlights.to_vec(),
            },
            corrector: CorrectorDetails {
                model: corrector_model.to_string(),
                prompt_messages: correction_messages,
                crm_snippets,
                style_examples,
                event_hook: event_hook.map(str::to_string),
                result_raw: corrected,
            },
            timeline,
        })
    }

    fn highlights(
        &self,
        persona: &Persona,
        product: &Product,
        top_k: usize,
        policy: CachePolicy,
    ) -> Result<Arc<Vec<RankedSnippet>>, RetrievalError> {
        let key = HighlightKey {
            persona: persona.name.clone(),
            product: product.identity().to_string(),
            top_k,
        };
        self.registry.highlights_for(key, policy, || {
            let query = build_persona_query(persona);
            let candidates = extract_candidate_texts(&product.reviews);
            self.ranker.rank(&query, &candidates, top_k)
        })
    }

    fn crm_snippets(
        &self,
        bucket: &StageBucket,
        draft: &str,
        top_k: usize,
    ) -> Result<Vec<CrmSnippet>, RetrievalError> {
        let documents: Vec<String> = bucket.items.iter().map(|item| item.document()).collect();
        let query = clip_chars(draft, DRAFT_QUERY_CHARS, "");
        let ranked = self.ranker.rank(&query, &documents, top_k)?;

        Ok(ranked
            .into_iter()
            .map(|hit| {
                let item = &bucket.items[hit.index];
                CrmSnippet {
                    score: hit.score,
                    source_index: item.source_index.clone(),
                    filename: item.filename.clone(),
                    text: clip_chars(&hit.text, CRM_SNIPPET_MAX_CHARS, ""),
                }
            })
            .collect())
    }

    async fn generate(
        &self,
        role: GeneratorRole,
        model: &str,
        messages: &[ChatTurn],
        policy: CachePolicy,
        timeline: &mut Vec<TimelineEntry>,
    ) -> Result<String, GenerationError> {
        let generator = self
            .registry
            .generators()
            .get(&GeneratorKey::new(model, role), policy)?;

        let started_at = Utc::now();
        let clock = Instant::now();
        let raw = generator.generate(messages, &role.sampling()).await?;
        let elapsed = clock.elapsed();

        timeline.push(TimelineEntry {
            step: role.step().to_string(),
            model: model.to_string(),
            started_at: rfc3339(started_at),
            ended_at: rfc3339(Utc::now()),
            duration_seconds: elapsed.as_secs_f64(),
        });

        let text = clean_model_output(&raw);
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse {
                model: model.to_string(),
            });
        }
        debug!(step = role.step(), chars = text.chars().count(), "stage output");
        Ok(text)
    }

    /// Writes `record` as pretty JSON under `output_dir`, returning the file path.
    pub async fn save_record(
        &self,
        record: &PipelineRecord,
        output_dir: &Path,
    ) -> Result<PathBuf, PipelineError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| PipelineError::Output { path, source }
        };

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(io_err(output_dir))?;

        let brand: String = record
            .brand
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        let short_id = record.run_id.get(..8).unwrap_or(&record.run_id);
        let path = output_dir.join(format!(
            "pipeline_{brand}_{}_{stamp}_{short_id}.json",
            record.stage_name
        ));

        let json = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&path, json).await.map_err(io_err(&path))?;
        info!(path = %path.display(), "pipeline output saved");
        Ok(path)
    }
}

#[async_trait]
impl GenerationStage for MarketingPipeline {
    async fn run(&self, row: &GenerationRow) -> Result<PipelinePayload, CallError> {
        let record = self
            .execute(&RunRequest::from(row.clone()))
            .await
            .map_err(|e| CallError::Failed(e.to_string()))?;
        let summarization = serde_json::to_value(&record.summarization)
            .map_err(|e| CallError::Failed(e.to_string()))?;

        Ok(PipelinePayload {
            summarization: Some(summarization),
            crm_message: Some(Value::String(record.crm_message)),
        })
    }
}
