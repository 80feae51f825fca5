//! Domain types shared by the chunker, the vector index and the retrieval engine.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type SegmentId = u64;

/// Fixed-length embedding vector. Length is the process-wide dimension `D`.
pub type Embedding = Vec<f32>;

/// A bounded span of a source document produced by the chunker.
///
/// - `id`: engine-wide unique identifier
/// - `source`: label of the document the span was cut from (usually the file name)
/// - `ordinal`: 0-based position within the source document
/// - `char_start`/`char_end`: character offsets into the extracted text, end exclusive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub text: String,
    pub source: String,
    pub ordinal: usize,
    pub char_start: usize,
    pub char_end: usize,
}

impl Segment {
    /// Number of characters covered by this segment.
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }

    /// First `max_chars` characters, with a trailing ellipsis when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        preview(&self.text, max_chars)
    }
}

/// Truncate `text` to at most `max_chars` characters, appending "..." when shortened.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// A segment paired with its embedding, as stored in the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub segment: Segment,
    pub embedding: Embedding,
}

/// One search result. `handle` is the insertion-order row id inside the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub handle: usize,
    pub entry: IndexEntry,
    pub distance: f64,
}

/// Search results, closest first.
pub type RetrievalResult = Vec<SearchHit>;

/// Output of `ingest`. Both counts are equal on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub segments_created: usize,
    pub embeddings_stored: usize,
}

/// Assembled context plus the segments it was built from, most relevant first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Retrieval {
    pub context: String,
    pub cited_segments: Vec<Segment>,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.cited_segments.is_empty()
    }
}

/// Which generation path a metric or failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    Full,
    Retrieved,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKind::Full => f.write_str("full"),
            PathKind::Retrieved => f.write_str("retrieved"),
        }
    }
}

/// Provider-declared token usage for one generation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

impl TokenUsage {
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self { prompt, completion, total: prompt + completion }
    }
}

/// Latency and cost of one generation path for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub path: PathKind,
    pub latency_ms: f64,
    pub tokens_used: u64,
    pub model: String,
}
