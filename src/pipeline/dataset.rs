use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::error::{DatasetError, RowError};
use super::rows::IndexedRow;
use crate::candidates::{dedupe, ensure_pairable, normalize};
use crate::constants::DEFAULT_NUM_CANDIDATES;
use crate::domain::GenerationRow;
use crate::evaluator::Judge;
use crate::invoker::{AdaptiveInvoker, PipelineCallable, extract_pipeline_output};
use crate::preference::{self, PreferenceRecord, PreferenceStore};

/// A row that produced no records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    pub index: usize,
    pub stage: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetReport {
    pub rows_seen: usize,
    pub rows_succeeded: usize,
    pub records_added: usize,
    pub total_records: usize,
    pub failures: Vec<RowFailure>,
}

/// Turns input rows into preference pairs.
///
/// Each row runs the target `num_candidates` times, deduplicates the
/// messages, asks the judge for the best one, and pairs it against the rest.
/// Rows run strictly in order; a failed row is logged and skipped.
pub struct PreferenceDatasetBuilder {
    target: Arc<dyn PipelineCallable>,
    judge: Arc<dyn Judge>,
    invoker: AdaptiveInvoker,
    num_candidates: usize,
}

impl PreferenceDatasetBuilder {
    pub fn new(target: Arc<dyn PipelineCallable>, judge: Arc<dyn Judge>) -> Self {
        Self {
            target,
            judge,
            invoker: AdaptiveInvoker::new(),
            num_candidates: DEFAULT_NUM_CANDIDATES,
        }
    }

    pub fn with_num_candidates(mut self, num_candidates: usize) -> Self {
        self.num_candidates = num_candidates.max(1);
        self
    }

    /// Processes up to `max_rows` rows, saving after every successful row.
    ///
    /// Only store failures abort the run.
    #[instrument(skip(self, rows, store), fields(path = %store.path().display(), rows = rows.len()))]
    pub async fn run(
        &self,
        rows: &[IndexedRow],
        store: &PreferenceStore,
        max_rows: Option<usize>,
    ) -> Result<DatasetReport, DatasetError> {
        let existing = store.load().await?.len();
        info!(
            existing,
            num_candidates = self.num_candidates,
            "starting preference dataset run"
        );

        let mut report = DatasetReport {
            total_records: existing,
            ..Default::default()
        };

        for indexed in rows.iter().take(max_rows.unwrap_or(usize::MAX)) {
            report.rows_seen += 1;
            let row = &indexed.row;
            info!(
                row = indexed.index,
                persona = %row.persona,
                brand = %row.brand,
                product = %row.product,
                stage_index = row.stage_index,
                style_index = row.style_index,
                is_event = row.is_event,
                "processing row"
            );

            match self.process_row(row).await {
                Ok(records) => {
                    report.total_records = store.append_and_save(&records).await?;
                    report.records_added += records.len();
                    report.rows_succeeded += 1;
                    info!(row = indexed.index, records = records.len(), "row saved");
                }
                Err(err) => {
                    warn!(row = indexed.index, stage = err.stage(), error = %err, "row failed");
                    report.failures.push(RowFailure {
                        index: indexed.index,
                        stage: err.stage(),
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            seen = report.rows_seen,
            succeeded = report.rows_succeeded,
            added = report.records_added,
            total = report.total_records,
            "preference dataset run finished"
        );
        Ok(report)
    }

    /// Records for one row; nothing is persisted here.
    pub async fn process_row(&self, row: &GenerationRow) -> Result<Vec<PreferenceRecord>, RowError> {
        let (summarization, raw) = self.collect(row).await?;

        let prompt = format_prompt(summarization.as_ref());
        if prompt.is_empty() {
            return Err(RowError::EmptyPrompt);
        }

        let raw_count = raw.len();
        let candidates = dedupe(normalize(&Value::Array(raw)));
        debug!(raw = raw_count, deduped = candidates.len(), "candidates collected");
        ensure_pairable(&candidates)?;

        let chosen = self.judge.pick_best(&prompt, &candidates).await?;
        Ok(preference::build(&prompt, &candidates, chosen)?)
    }

    async fn collect(&self, row: &GenerationRow) -> Result<(Option<Value>, Vec<Value>), RowError> {
        let mut summarization: Option<Value> = None;
        let mut messages = Vec::with_capacity(self.num_candidates);

        for attempt in 1..=self.num_candidates {
            let (strategy, value) = self.invoker.invoke(self.target.as_ref(), row).await?;
            debug!(attempt, strategy = strategy.name(), "pipeline returned");
            let payload = extract_pipeline_output(&value)?;

            if summarization.is_none() && payload.summarization.as_ref().is_some_and(is_truthy) {
                summarization = payload.summarization;
            }
            match payload.crm_message {
                Some(Value::String(text)) if !text.trim().is_empty() => {
                    messages.push(Value::String(text.trim().to_string()));
                }
                Some(Value::Array(items)) => messages.extend(items),
                Some(other @ Value::Object(_)) => messages.push(other),
                _ => debug!(attempt, "attempt produced no message"),
            }
        }
        Ok((summarization, messages))
    }
}

/// Strings are trimmed; structured values are pretty-printed.
pub fn format_prompt(summarization: Option<&Value>) -> String {
    match summarization {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
