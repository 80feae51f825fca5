use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use ctxrot_core::types::TokenUsage;

use super::{count, http_client, send_json};
use crate::provider::{Generation, GenerationParams, Generator, LlmError};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama2";

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Self {
        Self { client: http_client(timeout), base_url: base_url.trim_end_matches('/').to_string(), model }
    }

    pub fn build_request_body(&self, prompt: &str, params: &GenerationParams) -> serde_json::Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": params.temperature,
                "num_predict": params.max_tokens,
            },
        })
    }

    pub fn parse_response(&self, resp: &serde_json::Value) -> Result<Generation, LlmError> {
        let text = resp["response"]
            .as_str()
            .ok_or_else(|| LlmError::Parse("missing response".into()))?
            .to_string();
        let usage = TokenUsage::new(count(&resp["prompt_eval_count"]), count(&resp["eval_count"]));
        Ok(Generation { text, usage, model: self.model.clone() })
    }
}

#[async_trait]
impl Generator for OllamaProvider {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Generation, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        debug!("Ollama request to {}", url);
        let resp = send_json(self.client.post(&url).json(&self.build_request_body(prompt, params))).await?;
        self.parse_response(&resp)
    }
}
