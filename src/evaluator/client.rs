use std::env;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::config::EvaluatorConfig;
use super::error::EvaluatorError;
use super::protocol::{build_request, extract_response_text, parse_choice, resolve_choice, user_prompt};
use super::Judge;
use crate::candidates::Candidate;

/// HTTP judge speaking the `responses` wire format.
#[derive(Debug, Clone)]
pub struct EvaluatorClient {
    client: Client,
    config: EvaluatorConfig,
}

impl EvaluatorClient {
    pub fn new(config: EvaluatorConfig) -> Result<Self, EvaluatorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EvaluatorError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    fn credential(&self) -> Result<HeaderValue, EvaluatorError> {
        let var = &self.config.api_key_var;
        let key = env::var(var)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| EvaluatorError::MissingCredential { var: var.clone() })?;
        HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| EvaluatorError::InvalidCredential { var: var.clone() })
    }

    async fn send(&self, prompt: &str, candidates: &[Candidate]) -> Result<String, EvaluatorError> {
        let auth = self.credential()?;
        let user = user_prompt(prompt, candidates);
        let body = build_request(&self.config.model, &user);

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EvaluatorError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| EvaluatorError::InvalidResponse(e.to_string()))?;
        extract_response_text(&data)
    }

    fn transport_error(&self, err: reqwest::Error) -> EvaluatorError {
        if err.is_timeout() {
            EvaluatorError::Timeout {
                secs: self.config.timeout.as_secs(),
            }
        } else {
            EvaluatorError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl Judge for EvaluatorClient {
    #[instrument(skip(self, prompt, candidates), fields(model = %self.config.model, candidates = candidates.len()))]
    async fn pick_best(&self, prompt: &str, candidates: &[Candidate]) -> Result<i64, EvaluatorError> {
        let reply = self.send(prompt, candidates).await?;
        debug!(reply = %reply, "evaluator replied");

        let choice = parse_choice(&reply)?;
        let position = resolve_choice(choice, candidates)?;
        let chosen = candidates[position].response_id;
        info!(choice, chosen, "evaluator picked candidate");
        Ok(chosen)
    }
}
