use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use ctxrot_core::types::TokenUsage;

use super::{count, http_client, send_json};
use crate::provider::{Generation, GenerationParams, Generator, LlmError};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Self {
        Self { client: http_client(timeout), api_key, model, base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn build_request_body(&self, prompt: &str, params: &GenerationParams) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        })
    }

    /// Concatenates every `text` content block.
    pub fn parse_response(&self, resp: &serde_json::Value) -> Result<Generation, LlmError> {
        let blocks = resp["content"]
            .as_array()
            .ok_or_else(|| LlmError::Parse("missing content".into()))?;
        let text: String = blocks
            .iter()
            .filter(|b| b["type"].as_str().map_or(true, |t| t == "text"))
            .filter_map(|b| b["text"].as_str())
            .collect();
        let usage = TokenUsage::new(count(&resp["usage"]["input_tokens"]), count(&resp["usage"]["output_tokens"]));
        let model = resp["model"].as_str().unwrap_or(&self.model).to_string();
        Ok(Generation { text, usage, model })
    }
}

#[async_trait]
impl Generator for AnthropicProvider {
    fn provider(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Generation, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!("Anthropic request to {}", url);
        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.build_request_body(prompt, params));
        let resp = send_json(request).await?;
        self.parse_response(&resp)
    }
}
