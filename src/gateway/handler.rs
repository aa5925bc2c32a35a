use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::error::GatewayError;
use super::state::HandlerState;
use crate::cache::CachePolicy;
use crate::constants::{DEFAULT_TOP_K, MAX_REPEAT};
use crate::domain::serde_helpers::bool_like;
use crate::domain::{GenerationRow, PersonaRef};
use crate::pipeline::{PipelineRecord, RunRequest};

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_n() -> usize {
    1
}

/// Body of `POST /generate` and one element of a batch.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub persona: PersonaRef,
    pub brand: String,
    pub product: String,
    pub stage_index: i64,
    #[serde(default)]
    pub style_index: i64,
    #[serde(default, deserialize_with = "bool_like")]
    pub is_event: bool,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default, alias = "qwen_model")]
    pub drafter_model: Option<String>,
    #[serde(default, alias = "exa_model")]
    pub corrector_model: Option<String>,
    #[serde(default)]
    pub disable_cache: bool,
    #[serde(default = "default_n")]
    pub n: usize,
}

impl GenerateRequest {
    fn validate(&self) -> Result<(), GatewayError> {
        if self.top_k == 0 {
            return Err(GatewayError::InvalidRequest(
                "top_k must be at least 1".to_string(),
            ));
        }
        if self.n > MAX_REPEAT {
            return Err(GatewayError::InvalidRequest(format!(
                "n must be at most {MAX_REPEAT}, got {}",
                self.n
            )));
        }
        if self.brand.trim().is_empty() || self.product.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "brand and product must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// An explicit `disable_cache` wins; otherwise the server default applies.
    pub fn to_run_request(&self) -> RunRequest {
        RunRequest {
            row: GenerationRow {
                persona: self.persona.clone(),
                brand: self.brand.clone(),
                product: self.product.clone(),
                stage_index: self.stage_index,
                style_index: self.style_index,
                is_event: self.is_event,
            },
            top_k: Some(self.top_k),
            drafter_model: self.drafter_model.clone(),
            corrector_model: self.corrector_model.clone(),
            cache: self.disable_cache.then_some(CachePolicy::Bypass),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub items: Vec<GenerateRequest>,
    #[serde(default)]
    pub disable_cache: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GenerateResponse {
    Single { result: Box<PipelineRecord> },
    Repeated { results: Vec<PipelineRecord> },
}

#[derive(Debug, Serialize)]
pub struct BatchFailure {
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<PipelineRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<BatchFailure>,
}

/// Runs one request `n` times, sequentially.
#[instrument(
    skip(state, request),
    fields(persona = %request.persona, brand = %request.brand, n = request.n)
)]
pub async fn generate_handler(
    State(state): State<HandlerState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, GatewayError> {
    request.validate()?;
    let run = request.to_run_request();

    if request.n <= 1 {
        let record = state.pipeline.execute(&run).await?;
        return Ok(Json(GenerateResponse::Single {
            result: Box::new(record),
        }));
    }

    let mut results = Vec::with_capacity(request.n);
    for _ in 0..request.n {
        results.push(state.pipeline.execute(&run).await?);
    }
    info!(count = results.len(), "repeated generation complete");
    Ok(Json(GenerateResponse::Repeated { results }))
}

/// Items run in order; a failing item is logged and reported, never fatal to the batch.
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn generate_batch_handler(
    State(state): State<HandlerState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, GatewayError> {
    let mut results = Vec::with_capacity(request.items.len());
    let mut failures = Vec::new();

    for (index, item) in request.items.iter().enumerate() {
        let mut run = item.to_run_request();
        if request.disable_cache {
            run.cache = Some(CachePolicy::Bypass);
        }

        let outcome = match item.validate() {
            Ok(()) => state.pipeline.execute(&run).await.map_err(GatewayError::from),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(record) => results.push(record),
            Err(err) => {
                warn!(item = index, error = %err, "batch item failed");
                failures.push(BatchFailure {
                    index,
                    error: err.to_string(),
                });
            }
        }
    }

    info!(
        succeeded = results.len(),
        failed = failures.len(),
        "batch complete"
    );
    Ok(Json(BatchResponse { results, failures }))
}
