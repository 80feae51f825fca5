//! In-memory embedding cache keyed by `(model_id, content)`.
//!
//! Consulted before calling the wrapped embedder; misses are written through.
//! Re-ingesting the same document costs no embedding calls. The cache holds at
//! most `capacity` vectors and evicts in insertion order.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::debug;

use ctxrot_core::traits::Embedder;

/// Hex blake3 digest of `model_id` and `text`.
pub fn hash_content(model_id: &str, text: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(model_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Default)]
struct Entries {
    vectors: HashMap<String, Vec<f32>>,
    order: VecDeque<String>,
}

impl Entries {
    fn insert(&mut self, key: String, vector: Vec<f32>, capacity: usize) {
        if self.vectors.contains_key(&key) {
            return;
        }
        while self.vectors.len() >= capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.vectors.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.vectors.insert(key, vector);
    }
}

pub struct CachedEmbedder<E> {
    inner: E,
    entries: Mutex<Entries>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: E, capacity: usize) -> Self {
        Self {
            inner,
            entries: Mutex::new(Entries::default()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CachedEmbedder<E> {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn max_len(&self) -> usize {
        self.inner.max_len()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let keys: Vec<String> = texts.iter().map(|t| hash_content(self.inner.model_id(), t)).collect();

        let mut found: Vec<Option<Vec<f32>>> = {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            keys.iter().map(|k| entries.vectors.get(k).cloned()).collect()
        };

        // unique misses, first occurrence wins
        let mut miss_keys: Vec<&str> = Vec::new();
        let mut miss_texts: Vec<String> = Vec::new();
        for (i, slot) in found.iter().enumerate() {
            if slot.is_none() && !miss_keys.contains(&keys[i].as_str()) {
                miss_keys.push(&keys[i]);
                miss_texts.push(texts[i].clone());
            }
        }
        let hit_count = found.iter().filter(|s| s.is_some()).count() as u64;
        self.hits.fetch_add(hit_count, Ordering::Relaxed);
        self.misses.fetch_add(miss_texts.len() as u64, Ordering::Relaxed);
        debug!(hits = hit_count, misses = miss_texts.len(), "embedding cache lookup");

        if !miss_texts.is_empty() {
            let fresh = self.inner.embed_batch(&miss_texts).await?;
            if fresh.len() != miss_texts.len() {
                return Err(anyhow!("embedder returned {} vectors for {} inputs", fresh.len(), miss_texts.len()));
            }
            let fresh: HashMap<&str, Vec<f32>> = miss_keys.into_iter().zip(fresh).collect();
            {
                let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
                // malformed vectors are passed through but never cached
                let dim = self.inner.dim();
                for (k, v) in &fresh {
                    if v.len() == dim && v.iter().all(|x| x.is_finite()) {
                        entries.insert((*k).to_string(), v.clone(), self.capacity);
                    }
                }
            }
            for (i, slot) in found.iter_mut().enumerate() {
                if slot.is_none() {
                    *slot = fresh.get(keys[i].as_str()).cloned();
                }
            }
        }

        found
            .into_iter()
            .map(|v| v.ok_or_else(|| anyhow!("embedding cache lost an entry")))
            .collect()
    }
}
