//! Ingest and retrieve on top of an `Embedder` and a `VectorIndexer`.
//!
//! Ingest chunks a document, embeds every segment in one call and inserts the
//! whole batch at once; a failure anywhere before the insert leaves the index
//! untouched. Both halves are exposed (`prepare` and `publish`) so callers can
//! make the insert atomic with their own bookkeeping. Retrieve embeds the
//! query, searches, and assembles a bounded context from the hits.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{error, info, warn};

use ctxrot_core::chunker::Chunker;
use ctxrot_core::error::{Error, Result};
use ctxrot_core::traits::{Embedder, VectorIndexer};
use ctxrot_core::types::{Embedding, IndexEntry, IngestStats, Retrieval, RetrievalResult, SegmentId};

use crate::context::assemble_context;
use crate::dedup::{deduplicate, distinct_texts};
use crate::explain::Explanation;

/// Chunked and embedded document, not yet visible to searches.
#[derive(Debug)]
pub struct PreparedIngest {
    source: String,
    entries: Vec<IndexEntry>,
}

impl PreparedIngest {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segment_count(&self) -> usize {
        self.entries.len()
    }
}

pub struct Retriever<VI: VectorIndexer> {
    embedder: Box<dyn Embedder>,
    index: VI,
    chunker: Chunker,
    max_context_chars: usize,
    dedup_threshold: Option<f64>,
    next_id: AtomicU64,
}

impl<VI: VectorIndexer> Retriever<VI> {
    /// Fails with `DimensionMismatch` when the embedder and the index disagree on `D`.
    pub fn new(embedder: Box<dyn Embedder>, index: VI, chunker: Chunker, max_context_chars: usize) -> Result<Self> {
        if embedder.dim() != index.dim() {
            error!(embedder = embedder.dim(), index = index.dim(), "embedding dimension mismatch");
            return Err(Error::DimensionMismatch { expected: index.dim(), actual: embedder.dim() });
        }
        if max_context_chars == 0 {
            return Err(Error::InvalidConfig("max_context_chars must be greater than 0".into()));
        }
        Ok(Self { embedder, index, chunker, max_context_chars, dedup_threshold: None, next_id: AtomicU64::new(0) })
    }

    /// Drop hits whose word-level Jaccard overlap with a closer hit exceeds `threshold`.
    pub fn with_dedup_threshold(mut self, threshold: Option<f64>) -> Self {
        self.dedup_threshold = threshold;
        self
    }

    pub fn index(&self) -> &VI {
        &self.index
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    pub async fn ingest(&self, text: &str, source: &str) -> Result<IngestStats> {
        let prepared = self.prepare(text, source).await?;
        self.publish(prepared)
    }

    /// Chunk and embed `text` without touching the index.
    pub async fn prepare(&self, text: &str, source: &str) -> Result<PreparedIngest> {
        let windows = self.chunker.window_count(text);
        if windows == 0 {
            info!(source, "nothing to ingest");
            return Ok(PreparedIngest { source: source.to_string(), entries: Vec::new() });
        }
        let first_id: SegmentId = self.next_id.fetch_add(windows as u64, Ordering::Relaxed);
        let segments = self.chunker.chunk(text, source, first_id);

        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let embeddings = self.embed_validated(&texts).await?;
        if embeddings.len() != segments.len() {
            error!(segments = segments.len(), embeddings = embeddings.len(), "segment/embedding count mismatch");
            return Err(Error::Inconsistent(format!(
                "{} segments but {} embeddings",
                segments.len(),
                embeddings.len()
            )));
        }

        let entries = segments
            .into_iter()
            .zip(embeddings)
            .map(|(segment, embedding)| IndexEntry { segment, embedding })
            .collect();
        Ok(PreparedIngest { source: source.to_string(), entries })
    }

    /// Insert a prepared document in one step.
    pub fn publish(&self, prepared: PreparedIngest) -> Result<IngestStats> {
        let PreparedIngest { source, entries } = prepared;
        let segments_created = entries.len();
        if segments_created == 0 {
            return Ok(IngestStats { segments_created: 0, embeddings_stored: 0 });
        }
        let handles = self
            .index
            .insert(entries)
            .inspect_err(|e| error!(error = %e, source = %source, "index insert failed"))?;

        let stats = IngestStats { segments_created, embeddings_stored: handles.len() };
        if stats.segments_created != stats.embeddings_stored {
            return Err(Error::Inconsistent(format!(
                "{} segments created but {} stored",
                stats.segments_created, stats.embeddings_stored
            )));
        }
        info!(source = %source, segments = stats.segments_created, index_size = self.index.size(), "ingested document");
        Ok(stats)
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Retrieval> {
        Ok(self.explain(query, k).await?.0)
    }

    /// Retrieve plus a per-hit breakdown of ranking and citation.
    pub async fn explain(&self, query: &str, k: usize) -> Result<(Retrieval, Explanation)> {
        check_k(k)?;
        let query_vec = if self.index.size() == 0 { None } else { Some(self.embed_query(query).await?) };
        let hits = match &query_vec {
            Some(v) => self.search(v, k)?,
            None => Vec::new(),
        };
        let (retrieval, explanation) = self.assemble_explained(query, query_vec.as_deref(), hits);
        info!(k, cited = retrieval.cited_segments.len(), context_chars = retrieval.context.chars().count(), "retrieved context");
        Ok((retrieval, explanation))
    }

    /// Retrieve for several phrasings of one question.
    ///
    /// All queries are embedded in one call; hits are merged closest first,
    /// repeated segment texts are dropped and at most `k` hits are kept.
    pub async fn retrieve_multi(&self, queries: &[String], k: usize) -> Result<Retrieval> {
        check_k(k)?;
        if queries.is_empty() {
            return Err(Error::InvalidQuery("at least one query is required".into()));
        }
        if self.index.size() == 0 {
            return Ok(Retrieval::default());
        }
        let vectors = self.embed_validated(queries).await?;
        let mut merged: RetrievalResult = Vec::with_capacity(queries.len() * k);
        for v in &vectors {
            merged.extend(self.index.search(v, k)?);
        }
        merged.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.handle.cmp(&b.handle)));
        let mut unique = distinct_texts(merged);
        unique.truncate(k);
        let retrieval = self.assemble(unique);
        info!(queries = queries.len(), k, cited = retrieval.cited_segments.len(), "retrieved context for multiple queries");
        Ok(retrieval)
    }

    /// Embed a single query with the same retry and validation as ingest.
    pub async fn embed_query(&self, query: &str) -> Result<Embedding> {
        let mut vectors = self.embed_validated(&[query.to_string()]).await?;
        vectors.pop().ok_or_else(|| Error::EmbeddingUnavailable("no query embedding returned".into()))
    }

    /// Exact k nearest segments for an already embedded query.
    pub fn search(&self, query_vec: &[f32], k: usize) -> Result<RetrievalResult> {
        check_k(k)?;
        self.index.search(query_vec, k)
    }

    /// Apply near-duplicate suppression and build the bounded context.
    pub fn assemble(&self, hits: RetrievalResult) -> Retrieval {
        assemble_context(self.filter_duplicates(hits), self.max_context_chars)
    }

    pub fn assemble_explained(
        &self,
        query: &str,
        query_vec: Option<&[f32]>,
        hits: RetrievalResult,
    ) -> (Retrieval, Explanation) {
        let hits = self.filter_duplicates(hits);
        let retrieval = assemble_context(hits.clone(), self.max_context_chars);
        let explanation = Explanation::new(query, query_vec, &hits, retrieval.cited_segments.len());
        (retrieval, explanation)
    }

    fn filter_duplicates(&self, hits: RetrievalResult) -> RetrievalResult {
        match self.dedup_threshold {
            Some(threshold) => deduplicate(hits, threshold),
            None => hits,
        }
    }

    /// Embed `texts`, retrying once on failure or malformed output.
    async fn embed_validated(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut last_error = String::new();
        for attempt in 0..2 {
            let outcome = match self.embedder.embed_batch(texts).await {
                Ok(vectors) => self.check_embeddings(texts.len(), vectors),
                Err(e) => Err(format!("{e:#}")),
            };
            match outcome {
                Ok(vectors) => return Ok(vectors),
                Err(message) => {
                    if attempt == 0 {
                        warn!(error = %message, "embedding failed, retrying once");
                    }
                    last_error = message;
                }
            }
        }
        Err(Error::EmbeddingUnavailable(last_error))
    }

    fn check_embeddings(&self, expected: usize, vectors: Vec<Embedding>) -> std::result::Result<Vec<Embedding>, String> {
        if vectors.len() != expected {
            return Err(format!("embedder returned {} vectors for {} inputs", vectors.len(), expected));
        }
        let dim = self.index.dim();
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != dim {
                return Err(format!("vector {i} has dimension {} (expected {dim})", v.len()));
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(format!("vector {i} contains non-finite values"));
            }
        }
        Ok(vectors)
    }
}

fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::InvalidConfig("k must be greater than 0".into()));
    }
    Ok(())
}
