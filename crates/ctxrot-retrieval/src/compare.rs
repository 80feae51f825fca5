//! Side-by-side generation over the full document and the retrieved context.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use ctxrot_core::error::{Error, Result};
use ctxrot_core::types::{PathKind, QueryMetrics, TokenUsage};
use ctxrot_llm::{GenerationParams, Generator};

use crate::prompt::Prompts;

#[derive(Debug, Clone, PartialEq)]
pub struct PathOutput {
    pub text: String,
    pub usage: TokenUsage,
    pub metrics: QueryMetrics,
}

/// Per-path outcomes; one path failing leaves the other intact.
#[derive(Debug)]
pub struct Comparison {
    pub full: Result<PathOutput>,
    pub retrieved: Result<PathOutput>,
}

impl Comparison {
    pub fn succeeded(&self) -> usize {
        usize::from(self.full.is_ok()) + usize::from(self.retrieved.is_ok())
    }
}

pub struct ComparisonHarness {
    generator: Arc<dyn Generator>,
    params: GenerationParams,
}

impl ComparisonHarness {
    pub fn new(generator: Arc<dyn Generator>, params: GenerationParams) -> Self {
        Self { generator, params }
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    /// Runs both generations concurrently with identical model and sampling.
    ///
    /// Dropping the returned future cancels both in-flight calls.
    pub async fn compare(&self, question: &str, full_document: &str, retrieved_context: &str) -> Comparison {
        self.compare_prompts(&Prompts::new(question, full_document, retrieved_context)).await
    }

    /// Same as `compare` for prompts that were already rendered.
    pub async fn compare_prompts(&self, prompts: &Prompts) -> Comparison {
        let (full, retrieved) = tokio::join!(
            self.run(PathKind::Full, &prompts.standard),
            self.run(PathKind::Retrieved, &prompts.rag),
        );
        Comparison { full, retrieved }
    }

    async fn run(&self, path: PathKind, prompt: &str) -> Result<PathOutput> {
        let start = Instant::now();
        let outcome = self.generator.generate(prompt, &self.params).await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(generation) => {
                info!(%path, latency_ms, tokens = generation.usage.total, "generation finished");
                Ok(PathOutput {
                    metrics: QueryMetrics {
                        path,
                        latency_ms,
                        tokens_used: generation.usage.total,
                        model: generation.model,
                    },
                    usage: generation.usage,
                    text: generation.text,
                })
            }
            Err(e) => {
                error!(%path, latency_ms, error = %e, "generation failed");
                Err(Error::GenerationFailure { path, message: e.to_string() })
            }
        }
    }
}
