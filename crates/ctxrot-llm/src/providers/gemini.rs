use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use ctxrot_core::types::TokenUsage;

use super::{count, http_client, send_json};
use crate::provider::{Generation, GenerationParams, Generator, LlmError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub const BLOCKED_TEXT: &str = "[Blocked by safety filter or other candidate issue]";
pub const EMPTY_TEXT: &str = "[No response generated]";

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Self {
        Self { client: http_client(timeout), api_key, model, base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn build_request_body(&self, prompt: &str, params: &GenerationParams) -> serde_json::Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": params.temperature,
                "maxOutputTokens": params.max_tokens,
            },
        })
    }

    /// A candidate without text (safety block) yields a marker string, not an error.
    pub fn parse_response(&self, resp: &serde_json::Value) -> Result<Generation, LlmError> {
        let candidates = resp["candidates"].as_array();
        let text: Option<String> = candidates
            .and_then(|c| c.first())
            .and_then(|c| c["content"]["parts"].as_array())
            .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect::<String>())
            .filter(|t| !t.is_empty());
        let text = match (text, candidates.map_or(0, Vec::len)) {
            (Some(t), _) => t,
            (None, 0) => EMPTY_TEXT.to_string(),
            (None, _) => BLOCKED_TEXT.to_string(),
        };

        let meta = &resp["usageMetadata"];
        let (prompt, completion) = (count(&meta["promptTokenCount"]), count(&meta["candidatesTokenCount"]));
        let total = meta["totalTokenCount"].as_u64().unwrap_or(prompt + completion);
        Ok(Generation { text, usage: TokenUsage { prompt, completion, total }, model: self.model.clone() })
    }
}

#[async_trait]
impl Generator for GeminiProvider {
    fn provider(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Generation, LlmError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        debug!("Gemini request to model={}", self.model);
        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request_body(prompt, params));
        let resp = send_json(request).await?;
        self.parse_response(&resp)
    }
}
