//! crmforge library crate (used by the `crmforge` binary and integration tests).
//!
//! # Public API Surface
//!
//! ## Generation
//! - [`MarketingPipeline`] - two-stage (draft, tone-correct) CRM message generation
//! - [`CacheRegistry`], [`CachePolicy`] - generator pool, highlight cache, template index
//! - [`VectorRanker`] - embedding similarity ranking of review and CRM snippets
//! - [`Catalog`] - personas, products, brand stories, CRM goals and templates
//!
//! ## Preference Dataset
//! - [`PreferenceDatasetBuilder`] - rows in, `{prompt, chosen, rejected}` records out
//! - [`AdaptiveInvoker`] - calls generation entry points of unknown shape
//! - [`normalize`], [`dedupe`] - candidate message normalization
//! - [`EvaluatorClient`] - remote judge that picks the best candidate
//! - [`PreferenceStore`] - additive JSON store of preference records
//!
//! ## Serving
//! - [`gateway`] - `/generate`, `/generate_batch`, `/healthz`
//!
//! ## Test/Mock Support
//! Scripted generators are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod candidates;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod domain;
pub mod embedding;
pub mod evaluator;
pub mod gateway;
pub mod generation;
pub mod invoker;
pub mod pipeline;
pub mod preference;
pub mod retrieval;
pub mod templates;

pub use cache::{CachePolicy, CacheRegistry, GeneratorKey, GeneratorPool, HighlightKey};
pub use candidates::{Candidate, CandidateError, dedupe, ensure_pairable, normalize};
pub use catalog::{Catalog, CatalogError};
pub use config::{Config, ConfigError};
pub use domain::{GenerationRow, Persona, PersonaRef, Product, Review, STAGE_ORDER, Stage};
pub use embedding::{EmbedderConfig, EmbeddingError, LazyEmbedder, TextEmbedder};
pub use evaluator::{EvaluatorClient, EvaluatorConfig, EvaluatorError, Judge};
pub use generation::{GenerationError, Generator, GeneratorRole};
#[cfg(any(test, feature = "mock"))]
pub use generation::ScriptedGenerator;
pub use invoker::{
    AdaptiveInvoker, CommandEntry, GenerationStage, InvocationError, PipelineCallable,
    PipelinePayload, Strategy, Typed,
};
pub use pipeline::{
    DatasetReport, MarketingPipeline, PipelineError, PipelineRecord, PreferenceDatasetBuilder,
    RowError, RunRequest,
};
pub use preference::{PreferenceError, PreferenceRecord, PreferenceStore};
pub use retrieval::{RankedSnippet, RetrievalError, VectorRanker};
pub use templates::{TemplateIndex, TemplateSampler};
