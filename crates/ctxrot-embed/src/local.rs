//! Sentence-transformer embeddings computed in-process with candle.
//!
//! Expects a Hugging Face style model directory containing `config.json`,
//! `tokenizer.json` and either `model.safetensors` or `pytorch_model.bin`
//! (e.g. a local copy of `sentence-transformers/all-MiniLM-L6-v2`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use ctxrot_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

struct Encoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    max_len: usize,
    pad_id: u32,
}

impl Encoder {
    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()?)
    }
}

/// Inference runs on tokio's blocking pool so async workers stay free.
pub struct LocalEmbedder {
    encoder: Arc<Encoder>,
    model_id: String,
    dim: usize,
    max_len: usize,
    batch_size: usize,
}

impl LocalEmbedder {
    pub fn load(model_dir: &Path, max_len: usize, batch_size: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;

        let model_id = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string());
        info!(model = %model_id, dim, "embedding model loaded");
        let encoder = Encoder { model, tokenizer, device, max_len, pad_id };
        Ok(Self { encoder: Arc::new(encoder), model_id, dim, max_len, batch_size: batch_size.max(1) })
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let bin: PathBuf = model_dir.join("pytorch_model.bin");
    if bin.exists() {
        let weights = candle_core::pickle::read_all(&bin)?;
        return weights
            .into_iter()
            .map(|(name, t)| -> Result<(String, Tensor)> { Ok((name, t.to_device(device)?)) })
            .collect();
    }
    Err(anyhow!("no model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

/// Run CPU-bound work on the blocking pool and surface a panicked task as an error.
async fn off_runtime<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("embedding task panicked or was cancelled")?
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let encoder = Arc::clone(&self.encoder);
        let batch_size = self.batch_size;
        let owned = texts.to_vec();
        let out = off_runtime(move || {
            let mut out = Vec::with_capacity(owned.len());
            for chunk in owned.chunks(batch_size) {
                out.extend(encoder.embed_chunk(chunk)?);
            }
            Ok(out)
        })
        .await?;
        let elapsed = start.elapsed();
        debug!(texts = texts.len(), ms = elapsed.as_millis() as u64, "local embed_batch");
        if !texts.is_empty() && elapsed.as_millis() > 100 * texts.len() as u128 {
            warn!(texts = texts.len(), ms = elapsed.as_millis() as u64, "slow embedding");
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[tokio::test(flavor = "current_thread")]
    async fn blocking_work_leaves_the_runtime_free() {
        let (tx, rx) = mpsc::channel::<u32>();
        // only completes if the async half below gets to run concurrently
        let work = off_runtime(move || Ok(rx.recv_timeout(Duration::from_secs(5))?));
        let signal = async move {
            tx.send(7).unwrap();
        };
        let (got, ()) = tokio::join!(work, signal);
        assert_eq!(got.unwrap(), 7);
    }

    #[tokio::test]
    async fn panicking_work_becomes_an_error() {
        let err = off_runtime::<(), _>(|| panic!("boom")).await.unwrap_err();
        assert!(err.to_string().contains("panicked"));
    }
}
