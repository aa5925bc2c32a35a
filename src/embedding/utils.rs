use std::path::Path;

use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

use super::error::EmbeddingError;

/// Loads `tokenizer.json` from a model directory, padded to the batch's longest
/// sequence and truncated to `max_len` tokens.
pub fn load_batch_tokenizer(model_dir: &Path, max_len: usize) -> Result<Tokenizer, EmbeddingError> {
    let tokenizer_path = model_dir.join("tokenizer.json");
    if !tokenizer_path.exists() {
        return Err(EmbeddingError::ModelNotFound {
            path: tokenizer_path,
        });
    }

    let mut tokenizer =
        Tokenizer::from_file(&tokenizer_path).map_err(|e| EmbeddingError::TokenizationFailed {
            reason: format!("failed to load tokenizer: {e}"),
        })?;

    tokenizer.with_padding(Some(PaddingParams::default()));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_len,
            ..Default::default()
        }))
        .map_err(|e| EmbeddingError::TokenizationFailed {
            reason: format!("failed to configure truncation: {e}"),
        })?;

    Ok(tokenizer)
}

/// Scales a vector to unit length in place (zero vectors are left untouched).
pub fn l2_normalize(values: &mut [f32]) {
    let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in values.iter_mut() {
            *x /= norm;
        }
    }
}
