//! Embedding backends behind the `ctxrot_core::traits::Embedder` trait.
//!
//! `get_default_embedder` picks the backend from settings. Set
//! `APP_USE_FAKE_EMBEDDINGS=1` to force the deterministic `FakeEmbedder`
//! regardless of configuration (tests, CI, offline demos).

pub mod cache;
pub mod device;
pub mod fake;
pub mod local;
pub mod openai;
pub mod pool;
pub mod tokenize;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::info;

use ctxrot_core::config::{EmbeddingProviderKind, Settings};
use ctxrot_core::traits::Embedder;

pub use cache::{hash_content, CachedEmbedder};
pub use fake::FakeEmbedder;
pub use local::LocalEmbedder;
pub use openai::OpenAiEmbedder;
pub use pool::masked_mean_l2;

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn get_default_embedder(settings: &Settings) -> Result<Box<dyn Embedder>> {
    let cfg = &settings.embedding;
    let provider = if use_fake_embeddings() { EmbeddingProviderKind::Fake } else { cfg.provider };

    let embedder: Box<dyn Embedder> = match provider {
        EmbeddingProviderKind::Fake => {
            info!(dim = cfg.dimension, "using FakeEmbedder");
            Box::new(FakeEmbedder::new(cfg.dimension))
        }
        EmbeddingProviderKind::Local => {
            let dir = resolve_model_dir(cfg.model_dir_path(), &settings.embedding_model)?;
            Box::new(LocalEmbedder::load(&dir, cfg.max_len, cfg.batch_size)?)
        }
        EmbeddingProviderKind::OpenAi => {
            let api_key = cfg
                .api_key
                .clone()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or_else(|| anyhow!("OpenAI embeddings need embedding.api_key or OPENAI_API_KEY"))?;
            info!(model = %settings.embedding_model, "using OpenAI embeddings");
            Box::new(OpenAiEmbedder::new(
                api_key,
                settings.embedding_model.clone(),
                cfg.base_url.clone(),
                cfg.dimension,
                cfg.batch_size,
                Duration::from_secs(cfg.timeout_secs),
            ))
        }
    };

    if cfg.cache {
        Ok(Box::new(CachedEmbedder::with_capacity(embedder, cfg.cache_capacity)))
    } else {
        Ok(embedder)
    }
}

fn resolve_model_dir(configured: Option<PathBuf>, model_name: &str) -> Result<PathBuf> {
    if let Some(p) = configured {
        if p.exists() {
            return Ok(p);
        }
        return Err(anyhow!("embedding.model_dir {} does not exist", p.display()));
    }
    if let Ok(dir) = std::env::var("MODEL_DIR") {
        let p = PathBuf::from(dir);
        if p.exists() {
            info!(dir = %p.display(), "using MODEL_DIR");
            return Ok(p);
        }
    }
    for candidate in [PathBuf::from("models").join(model_name), PathBuf::from("../models").join(model_name)] {
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(anyhow!("Could not locate model directory for {model_name}; set embedding.model_dir"))
}
