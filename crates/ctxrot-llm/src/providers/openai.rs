use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use ctxrot_core::types::TokenUsage;

use super::{count, http_client, send_json};
use crate::provider::{Generation, GenerationParams, Generator, LlmError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
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

    pub fn parse_response(&self, resp: &serde_json::Value) -> Result<Generation, LlmError> {
        let text = resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::Parse("missing choices[0].message.content".into()))?
            .to_string();
        let usage = &resp["usage"];
        let (prompt, completion) = (count(&usage["prompt_tokens"]), count(&usage["completion_tokens"]));
        let total = usage["total_tokens"].as_u64().unwrap_or(prompt + completion);
        let model = resp["model"].as_str().unwrap_or(&self.model).to_string();
        Ok(Generation { text, usage: TokenUsage { prompt, completion, total }, model })
    }
}

#[async_trait]
impl Generator for OpenAiProvider {
    fn provider(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Generation, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("OpenAI request to {}", url);
        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request_body(prompt, params));
        let resp = send_json(request).await?;
        self.parse_response(&resp)
    }
}
