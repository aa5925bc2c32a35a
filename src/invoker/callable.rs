use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::error::CallError;
use super::output::PipelinePayload;
use crate::domain::{GenerationRow, PersonaRef};

/// A generation entry point whose argument shape is only known at run time.
///
/// Every call method defaults to [`CallError::SignatureMismatch`]; implementors
/// override the shapes they accept.
#[async_trait]
pub trait PipelineCallable: Send + Sync {
    /// Declared parameter count, when known.
    fn arity(&self) -> Option<usize>;

    async fn call_keyword(&self, _args: &Map<String, Value>) -> Result<Value, CallError> {
        Err(CallError::mismatch("keyword"))
    }

    async fn call_structured(&self, _row: &GenerationRow) -> Result<Value, CallError> {
        Err(CallError::mismatch("structured"))
    }

    async fn call_positional(&self, _args: &[Value]) -> Result<Value, CallError> {
        Err(CallError::mismatch("positional"))
    }

    /// Runs with a synthesized argument vector, writing any output to `stdout`.
    /// `Ok(None)` means the result must be parsed from `stdout`.
    async fn call_with_argv(
        &self,
        _argv: &[String],
        _stdout: &mut Vec<u8>,
    ) -> Result<Option<Value>, CallError> {
        Err(CallError::mismatch("argv"))
    }
}

/// A pipeline stage with a typed boundary: one row in, one payload out.
#[async_trait]
pub trait GenerationStage: Send + Sync {
    async fn run(&self, row: &GenerationRow) -> Result<PipelinePayload, CallError>;
}

#[async_trait]
impl<S: GenerationStage + ?Sized> GenerationStage for std::sync::Arc<S> {
    async fn run(&self, row: &GenerationRow) -> Result<PipelinePayload, CallError> {
        (**self).run(row).await
    }
}

/// Exposes a [`GenerationStage`] through the keyword and structured conventions.
pub struct Typed<S>(pub S);

#[async_trait]
impl<S: GenerationStage> PipelineCallable for Typed<S> {
    fn arity(&self) -> Option<usize> {
        Some(1)
    }

    async fn call_keyword(&self, args: &Map<String, Value>) -> Result<Value, CallError> {
        let row: GenerationRow = serde_json::from_value(Value::Object(args.clone()))
            .map_err(|e| CallError::SignatureMismatch(e.to_string()))?;
        self.call_structured(&row).await
    }

    async fn call_structured(&self, row: &GenerationRow) -> Result<Value, CallError> {
        let payload = self.0.run(row).await?;
        serde_json::to_value(payload).map_err(|e| CallError::Failed(e.to_string()))
    }
}

fn persona_value(persona: &PersonaRef) -> Value {
    match persona {
        PersonaRef::Index(i) => json!(i),
        PersonaRef::Name(name) => json!(name),
    }
}

/// Row fields by name.
pub fn keyword_args(row: &GenerationRow) -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("persona".into(), persona_value(&row.persona));
    args.insert("brand".into(), json!(row.brand));
    args.insert("product".into(), json!(row.product));
    args.insert("stage_index".into(), json!(row.stage_index));
    args.insert("style_index".into(), json!(row.style_index));
    args.insert("is_event".into(), json!(row.is_event));
    args
}

/// Row fields in declaration order.
pub fn positional_args(row: &GenerationRow) -> Vec<Value> {
    vec![
        persona_value(&row.persona),
        json!(row.brand),
        json!(row.product),
        json!(row.stage_index),
        json!(row.style_index),
        json!(row.is_event),
    ]
}

/// Command-line form of a row (without a program name).
pub fn row_argv(row: &GenerationRow) -> Vec<String> {
    vec![
        "--persona".into(),
        row.persona.to_string(),
        "--brand".into(),
        row.brand.clone(),
        "--product".into(),
        row.product.clone(),
        "--stage_index".into(),
        row.stage_index.to_string(),
        "--style_index".into(),
        row.style_index.to_string(),
        "--is_event".into(),
        if row.is_event { "1" } else { "0" }.into(),
    ]
}
