use std::env;
use std::time::Duration;

use crate::config::ConfigError;

/// Evaluator endpoint settings.
///
/// The credential itself is not stored here: it is read from `api_key_var`
/// on every call.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    pub api_key_var: String,
}

pub const DEFAULT_EVALUATOR_URL: &str = "https://api.openai.com/v1/responses";
pub const DEFAULT_EVALUATOR_MODEL: &str = "gpt-5-nano";
pub const DEFAULT_EVALUATOR_TIMEOUT_SECS: u64 = 30;
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_EVALUATOR_URL.to_string(),
            model: DEFAULT_EVALUATOR_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_EVALUATOR_TIMEOUT_SECS),
            api_key_var: API_KEY_VAR.to_string(),
        }
    }
}

impl EvaluatorConfig {
    const ENV_URL: &'static str = "CRMFORGE_EVALUATOR_URL";
    const ENV_MODEL: &'static str = "CRMFORGE_EVALUATOR_MODEL";
    const ENV_TIMEOUT_SECS: &'static str = "CRMFORGE_EVALUATOR_TIMEOUT_SECS";

    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let endpoint = Self::non_blank(Self::ENV_URL).unwrap_or(defaults.endpoint);
        let model = Self::non_blank(Self::ENV_MODEL).unwrap_or(defaults.model);
        let timeout = match Self::non_blank(Self::ENV_TIMEOUT_SECS) {
            Some(value) => {
                let secs: u64 = value.parse().map_err(|_| ConfigError::InvalidNumber {
                    name: Self::ENV_TIMEOUT_SECS,
                    value: value.clone(),
                })?;
                Duration::from_secs(secs.max(1))
            }
            None => defaults.timeout,
        };

        Ok(Self {
            endpoint,
            model,
            timeout,
            api_key_var: defaults.api_key_var,
        })
    }

    fn non_blank(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}
