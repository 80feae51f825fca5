//! Per-hit breakdown of a retrieval, for debugging ranking and budget cuts.

use serde::{Deserialize, Serialize};

use ctxrot_core::types::{preview, RetrievalResult, SegmentId};

pub const HIT_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitExplanation {
    pub rank: usize,
    pub segment_id: SegmentId,
    pub source: String,
    pub ordinal: usize,
    pub distance: f64,
    /// Whether the segment made it into the assembled context.
    pub cited: bool,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub query: String,
    /// L2 norm of the query embedding; absent when the index was empty and nothing was embedded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_norm: Option<f64>,
    pub hits: Vec<HitExplanation>,
}

impl Explanation {
    /// `cited` is the number of leading hits that were assembled into the context.
    pub fn new(query: &str, embedding: Option<&[f32]>, hits: &RetrievalResult, cited: usize) -> Self {
        let embedding_norm = embedding.map(|v| v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt());
        let hits = hits
            .iter()
            .enumerate()
            .map(|(rank, hit)| HitExplanation {
                rank,
                segment_id: hit.entry.segment.id,
                source: hit.entry.segment.source.clone(),
                ordinal: hit.entry.segment.ordinal,
                distance: hit.distance,
                cited: rank < cited,
                preview: preview(&hit.entry.segment.text, HIT_PREVIEW_CHARS),
            })
            .collect();
        Self { query: query.to_string(), embedding_norm, hits }
    }
}
