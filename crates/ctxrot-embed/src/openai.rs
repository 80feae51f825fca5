use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ctxrot_core::traits::Embedder;

/// OpenAI-compatible `/embeddings` backend.
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    dim: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, model: String, base_url: String, dim: usize, batch_size: usize, timeout: Duration) -> Self {
        Self {
            client: Client::builder().timeout(timeout).build().unwrap_or_else(|_| Client::new()),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            dim,
            batch_size: batch_size.max(1),
        }
    }

    async fn embed_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest { model: &self.model, input: texts };
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("embedding API error {status}: {body}");
        }
        let resp: EmbedResponse = response.json().await?;
        parse_embeddings(resp, texts.len())
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
pub(crate) struct EmbedResponse {
    data: Vec<EmbedItem>,
}

#[derive(Deserialize)]
struct EmbedItem {
    embedding: Vec<f32>,
    index: usize,
}

/// Order vectors by their `index` field and check one came back per input.
pub(crate) fn parse_embeddings(mut resp: EmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    resp.data.sort_by_key(|item| item.index);
    if resp.data.len() != expected {
        return Err(anyhow!("embedding API returned {} vectors for {} inputs", resp.data.len(), expected));
    }
    Ok(resp.data.into_iter().map(|item| item.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        8191
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(texts = texts.len(), model = %self.model, "remote embed_batch");
        let parts = try_join_all(texts.chunks(self.batch_size).map(|chunk| self.embed_request(chunk))).await?;
        Ok(parts.into_iter().flatten().collect())
    }
}
