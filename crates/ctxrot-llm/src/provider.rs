use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ctxrot_core::types::TokenUsage;

/// Sampling configuration shared by every call of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { temperature: 0.7, max_tokens: 500 }
    }
}

/// One completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub usage: TokenUsage,
    pub model: String,
}

/// Trait for text generation backends. Each provider implements this.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Provider name as used in configuration (`ollama`, `openai`, ...).
    fn provider(&self) -> &str;
    fn model(&self) -> &str;
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Generation, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}
