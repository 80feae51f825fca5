use std::ops::Range;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{IndexEntry, RetrievalResult};

/// Maps texts to fixed-dimension vectors.
///
/// Implementations must return exactly one vector per input, in input order,
/// each of length `dim()`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier of the underlying model (e.g. `all-MiniLM-L6-v2`).
    fn model_id(&self) -> &str;
    /// Embedding dimensionality (D).
    fn dim(&self) -> usize;
    /// Maximum token length the model accepts per input.
    fn max_len(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Append-only similarity index over embedded segments.
pub trait VectorIndexer: Send + Sync {
    fn dim(&self) -> usize;
    /// Appends all entries or none; returns the handles assigned to them.
    fn insert(&self, entries: Vec<IndexEntry>) -> Result<Range<usize>>;
    /// Exact k nearest neighbours of `query`, closest first.
    fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult>;
    fn size(&self) -> usize;
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn max_len(&self) -> usize {
        (**self).max_len()
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for std::sync::Arc<T> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn max_len(&self) -> usize {
        (**self).max_len()
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }
}
