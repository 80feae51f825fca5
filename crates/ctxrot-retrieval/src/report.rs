//! Serializable result surfaces for ingest, query and stats.

use serde::{Deserialize, Serialize};

use ctxrot_core::types::{preview, Segment, TokenUsage};

use crate::compare::{Comparison, PathOutput};
use crate::explain::Explanation;
use crate::prompt::Prompts;

pub const CONTEXT_PREVIEW_CHARS: usize = 500;
pub const SOURCE_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    /// One of the two generation paths failed.
    Partial,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub status: Status,
    pub message: String,
    pub chunks_created: usize,
    pub embeddings_stored: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathReport {
    pub text: String,
    pub model: String,
    pub latency_ms: f64,
    pub tokens_used: TokenUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PathReport {
    fn from_outcome(outcome: &ctxrot_core::Result<PathOutput>, fallback_model: &str) -> Self {
        match outcome {
            Ok(out) => Self {
                text: out.text.clone(),
                model: out.metrics.model.clone(),
                latency_ms: out.metrics.latency_ms,
                tokens_used: out.usage,
                context_used: None,
                error: None,
            },
            Err(e) => Self {
                text: String::new(),
                model: fallback_model.to_string(),
                latency_ms: 0.0,
                tokens_used: TokenUsage::default(),
                context_used: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Responses {
    /// Generation over the full document.
    pub standard: PathReport,
    /// Generation over the retrieved context.
    pub rag: PathReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryReport {
    pub status: Status,
    pub query: String,
    pub total_chunks: usize,
    pub retrieved_chunks_count: usize,
    pub responses: Responses,
    pub sources: Vec<String>,
    /// Ranking breakdown, filled in verbose mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval: Option<Explanation>,
    /// Exact prompts sent to the generator, filled in verbose mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<Prompts>,
}

impl QueryReport {
    pub fn build(
        query: &str,
        total_chunks: usize,
        cited: &[Segment],
        context: &str,
        comparison: &Comparison,
        model: &str,
    ) -> Self {
        let status = match comparison.succeeded() {
            2 => Status::Success,
            1 => Status::Partial,
            _ => Status::Error,
        };
        let standard = PathReport::from_outcome(&comparison.full, model);
        let mut rag = PathReport::from_outcome(&comparison.retrieved, model);
        rag.context_used = Some(preview(context, CONTEXT_PREVIEW_CHARS));

        Self {
            status,
            query: query.to_string(),
            total_chunks,
            retrieved_chunks_count: cited.len(),
            responses: Responses { standard, rag },
            sources: cited.iter().map(|s| s.preview(SOURCE_PREVIEW_CHARS)).collect(),
            retrieval: None,
            prompts: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub total_chunks: usize,
    pub embedding_dimension: usize,
    pub files_ingested: usize,
    pub embedding_model: String,
    pub llm_provider: String,
}
