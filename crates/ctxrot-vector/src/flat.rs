//! Exact (brute-force) nearest-neighbour index held in memory.
//!
//! Entries are append-only and addressed by their insertion position (the
//! handle). Inserts take the write lock once per batch, so a batch is either
//! fully visible to readers or not at all.

use std::ops::Range;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use ctxrot_core::error::{Error, Result};
use ctxrot_core::traits::VectorIndexer;
use ctxrot_core::types::{IndexEntry, RetrievalResult, SearchHit, Segment};

use crate::distance::squared_l2;

#[derive(Debug)]
pub struct VectorIndex {
    dim: usize,
    entries: RwLock<Vec<IndexEntry>>,
}

impl VectorIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, entries: RwLock::new(Vec::new()) }
    }

    fn check_dim(&self, len: usize) -> Result<()> {
        if len != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: len });
        }
        Ok(())
    }

    /// Segment stored under `handle`, if any.
    pub fn segment(&self, handle: usize) -> Option<Segment> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(handle).map(|e| e.segment.clone())
    }

    /// Distinct source labels, in first-insertion order.
    pub fn sources(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<String> = Vec::new();
        for e in entries.iter() {
            if !out.iter().any(|s| s == &e.segment.source) {
                out.push(e.segment.source.clone());
            }
        }
        out
    }
}

impl VectorIndexer for VectorIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn insert(&self, batch: Vec<IndexEntry>) -> Result<Range<usize>> {
        for entry in &batch {
            self.check_dim(entry.embedding.len())?;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let start = entries.len();
        entries.extend(batch);
        let handles = start..entries.len();
        debug!(inserted = handles.len(), total = entries.len(), "index insert");
        Ok(handles)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        self.check_dim(query.len())?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut scored: Vec<(f64, usize)> = entries
            .iter()
            .enumerate()
            .map(|(handle, e)| (squared_l2(query, &e.embedding), handle))
            .collect();

        // ascending distance, then ascending handle
        let cmp = |a: &(f64, usize), b: &(f64, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
        if scored.len() > k {
            scored.select_nth_unstable_by(k - 1, cmp);
            scored.truncate(k);
        }
        scored.sort_unstable_by(cmp);

        debug!(k, scanned = entries.len(), returned = scored.len(), "index search");
        Ok(scored
            .into_iter()
            .map(|(distance, handle)| SearchHit { handle, entry: entries[handle].clone(), distance })
            .collect())
    }

    fn size(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
