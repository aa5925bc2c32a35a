use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::InvocationError;

/// The two fields a pipeline run contributes to a preference batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelinePayload {
    pub summarization: Option<Value>,
    pub crm_message: Option<Value>,
}

fn non_null(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

/// Accepts an object with `summarization`/`crm_message`, a pair-like list, or a JSON string of either.
pub fn extract_pipeline_output(result: &Value) -> Result<PipelinePayload, InvocationError> {
    match result {
        Value::Object(map) => Ok(PipelinePayload {
            summarization: non_null(map.get("summarization")),
            crm_message: non_null(map.get("crm_message")),
        }),
        Value::Array(items) if items.len() >= 2 => Ok(PipelinePayload {
            summarization: non_null(items.first()),
            crm_message: non_null(items.get(1)),
        }),
        Value::String(text) => {
            let parsed: Value = serde_json::from_str(text)
                .map_err(|_| InvocationError::UnexpectedOutput(preview(text)))?;
            if parsed.is_string() {
                return Err(InvocationError::UnexpectedOutput(preview(text)));
            }
            extract_pipeline_output(&parsed)
        }
        other => Err(InvocationError::UnexpectedOutput(preview(&other.to_string()))),
    }
}

/// The last line of captured output that is a complete JSON object.
pub fn parse_stdout_payload(stdout: &str) -> Result<Value, InvocationError> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{') && line.ends_with('}'))
        .find_map(|line| serde_json::from_str::<Value>(line).ok())
        .ok_or(InvocationError::NoPayload)
}

fn preview(text: &str) -> String {
    crate::retrieval::highlight::clip_chars(text, 200, "...")
}
