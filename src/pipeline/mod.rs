//! Orchestration: the two-stage marketing pipeline and the preference
//! dataset run that drives it.
//!
//! ```text
//! rows ──► AdaptiveInvoker ──► MarketingPipeline (×N) ──► normalize/dedupe
//!                                                            │
//!                  PreferenceStore ◄── build pairs ◄── Judge ◄┘
//! ```

mod dataset;
mod error;
mod marketing;
mod rows;


pub use dataset::{DatasetReport, PreferenceDatasetBuilder, RowFailure, format_prompt};
pub use error::{DatasetError, PipelineError, RowError, RowSourceError};
pub use marketing::{
    CorrectorDetails, DrafterDetails, MarketingPipeline, PipelineDefaults, PipelineRecord,
    ProductBasic, RunRequest, Summarization, TimelineEntry,
};
pub use rows::{IndexedRow, load_rows, parse_row};
