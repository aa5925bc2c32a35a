//! Text generators and the prompts fed to them.

mod chat;
mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
pub mod prompts;
mod stub;


pub use chat::ChatGenerator;
pub use error::GenerationError;
#[cfg(any(test, feature = "mock"))]
pub use mock::ScriptedGenerator;
pub use stub::EchoGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
}

/// Which pipeline slot a generator fills. Part of the generator-pool key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorRole {
    Drafter,
    Corrector,
}

impl GeneratorRole {
    pub fn sampling(self) -> SamplingParams {
        match self {
            GeneratorRole::Drafter => SamplingParams {
                temperature: 0.1,
                max_tokens: 512,
                top_p: 0.9,
            },
            GeneratorRole::Corrector => SamplingParams {
                temperature: 0.4,
                max_tokens: 512,
                top_p: 0.9,
            },
        }
    }

    /// Timeline step label.
    pub fn step(self) -> &'static str {
        match self {
            GeneratorRole::Drafter => "draft_generation",
            GeneratorRole::Corrector => "tone_correction",
        }
    }
}

/// A chat model bound to one model name.
///
/// One instance may be shared by concurrent requests; implementations must be `Sync`.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model(&self) -> &str;

    async fn generate(
        &self,
        messages: &[ChatTurn],
        sampling: &SamplingParams,
    ) -> Result<String, GenerationError>;
}
