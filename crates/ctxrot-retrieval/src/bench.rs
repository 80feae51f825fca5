//! Synthetic recall benchmark: a long filler document with one verifiable fact
//! per block, asked back one question at a time through both generation paths.

use serde::{Deserialize, Serialize};
use tracing::info;

use ctxrot_core::error::Result;

use crate::engine::RagEngine;
use crate::report::PathReport;

const NAMES: [&str; 10] = ["Xylon", "Zarcon", "Quilp", "Moxie", "Vortex", "Blinker", "Jolt", "Flux", "Glint", "Snark"];
const COLORS: [&str; 10] =
    ["Crimson", "Azure", "Emerald", "Amber", "Indigo", "Teal", "Violet", "Ochre", "Cyan", "Magenta"];

/// Filler words placed on each side of a fact.
pub const FILLER_WORDS: usize = 50;
pub const SOURCE_LABEL: &str = "fact_sheet";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub name: String,
    pub color: String,
}

impl Fact {
    pub fn sentence(&self) -> String {
        format!("The secret color of {} is {}.", self.name, self.color)
    }

    pub fn question(&self) -> String {
        format!("What is the secret color of {}?", self.name)
    }
}

#[derive(Debug, Clone)]
pub struct FactSheet {
    pub document: String,
    pub facts: Vec<Fact>,
}

impl FactSheet {
    /// Names repeat every ten facts and get a numeric suffix so each question has one answer.
    pub fn generate(num_facts: usize) -> Self {
        let filler = vec!["filler"; FILLER_WORDS].join(" ");
        let mut parts = Vec::with_capacity(num_facts * 3);
        let mut facts = Vec::with_capacity(num_facts);
        for i in 0..num_facts {
            let base = NAMES[i % NAMES.len()];
            let name = match i / NAMES.len() {
                0 => base.to_string(),
                round => format!("{base}{}", round + 1),
            };
            let fact = Fact { name, color: COLORS[i % COLORS.len()].to_string() };
            parts.push(filler.clone());
            parts.push(fact.sentence());
            parts.push(filler.clone());
            facts.push(fact);
        }
        Self { document: parts.join(" "), facts }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathScore {
    pub correct: usize,
    /// Questions where generation itself failed; counted as incorrect.
    pub failed: usize,
    pub total: usize,
    pub accuracy: f64,
    pub mean_latency_ms: f64,
    pub total_tokens: u64,
}

impl PathScore {
    fn record(&mut self, path: &PathReport, expected: &str) {
        self.total += 1;
        if path.error.is_some() {
            self.failed += 1;
            return;
        }
        if path.text.to_lowercase().contains(&expected.to_lowercase()) {
            self.correct += 1;
        }
        self.mean_latency_ms += path.latency_ms;
        self.total_tokens += path.tokens_used.total;
    }

    fn finish(mut self) -> Self {
        if self.total > 0 {
            self.accuracy = self.correct as f64 / self.total as f64;
        }
        let answered = self.total - self.failed;
        if answered > 0 {
            self.mean_latency_ms /= answered as f64;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub facts: usize,
    pub document_chars: usize,
    pub top_k: usize,
    pub full: PathScore,
    pub rag: PathScore,
    /// `rag.accuracy - full.accuracy`.
    pub improvement: f64,
}

/// Ingest `sheet` into `engine` and ask every fact back through both paths.
///
/// Retrieval errors abort the run; a failed generation only counts against its path.
pub async fn run_benchmark(engine: &RagEngine, sheet: &FactSheet, top_k: usize) -> Result<BenchmarkReport> {
    engine.ingest_text(&sheet.document, SOURCE_LABEL).await?;
    info!(facts = sheet.facts.len(), chars = sheet.document.chars().count(), "running recall benchmark");

    let mut full = PathScore::default();
    let mut rag = PathScore::default();
    for fact in &sheet.facts {
        let report = engine.query(&fact.question(), Some(top_k)).await?;
        full.record(&report.responses.standard, &fact.color);
        rag.record(&report.responses.rag, &fact.color);
    }
    let (full, rag) = (full.finish(), rag.finish());
    info!(full = full.accuracy, rag = rag.accuracy, "recall benchmark finished");

    Ok(BenchmarkReport {
        facts: sheet.facts.len(),
        document_chars: sheet.document.chars().count(),
        top_k,
        improvement: rag.accuracy - full.accuracy,
        full,
        rag,
    })
}
