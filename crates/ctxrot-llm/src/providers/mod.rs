pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

use std::time::Duration;

use crate::provider::LlmError;

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder().timeout(timeout).build().unwrap_or_else(|_| reqwest::Client::new())
}

/// Send a JSON request and return the decoded body, mapping non-2xx to `LlmError::Api`.
pub(crate) async fn send_json(request: reqwest::RequestBuilder) -> Result<serde_json::Value, LlmError> {
    let response = request.header("Content-Type", "application/json").send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Api { status: status.as_u16(), body });
    }
    Ok(response.json().await?)
}

pub(crate) fn count(value: &serde_json::Value) -> u64 {
    value.as_u64().unwrap_or(0)
}
