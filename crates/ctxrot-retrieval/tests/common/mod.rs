#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Barrier;

use ctxrot_core::traits::Embedder;
use ctxrot_core::types::TokenUsage;
use ctxrot_embed::FakeEmbedder;
use ctxrot_llm::{Generation, GenerationParams, Generator, LlmError};

pub const DIM: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Fault {
    None,
    /// Return an error for the first `n` calls.
    FailFirst(usize),
    /// Return an error on every call from the `n`th (0-based) on.
    FailFrom(usize),
    /// Put a NaN into the last vector of every batch.
    NonFinite,
    /// Return one vector fewer than requested.
    ShortBatch,
}

/// `FakeEmbedder` with call counting and injectable faults.
pub struct MockEmbedder {
    inner: FakeEmbedder,
    fault: Fault,
    pub calls: Arc<AtomicUsize>,
}

impl MockEmbedder {
    pub fn new(fault: Fault) -> Self {
        Self { inner: FakeEmbedder::new(DIM), fault, calls: Arc::new(AtomicUsize::new(0)) }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn model_id(&self) -> &str {
        "mock"
    }
    fn dim(&self) -> usize {
        DIM
    }
    fn max_len(&self) -> usize {
        512
    }
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let mut out = self.inner.embed_batch(texts).await?;
        match self.fault {
            Fault::None => {}
            Fault::FailFirst(n) if call < n => anyhow::bail!("embedding service unreachable"),
            Fault::FailFirst(_) => {}
            Fault::FailFrom(n) if call >= n => anyhow::bail!("embedding service unreachable"),
            Fault::FailFrom(_) => {}
            Fault::NonFinite => {
                if let Some(last) = out.last_mut() {
                    last[0] = f32::NAN;
                }
            }
            Fault::ShortBatch => {
                out.pop();
            }
        }
        Ok(out)
    }
}

/// Generator that records prompts and answers with a fixed string.
pub struct MockGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub params: Mutex<Vec<GenerationParams>>,
    fail_when_contains: Option<String>,
    barrier: Option<Arc<Barrier>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self { prompts: Mutex::new(Vec::new()), params: Mutex::new(Vec::new()), fail_when_contains: None, barrier: None }
    }

    pub fn failing_when(mut self, needle: &str) -> Self {
        self.fail_when_contains = Some(needle.to_string());
        self
    }

    /// Every call waits on `barrier` before answering.
    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    fn provider(&self) -> &str {
        "mock"
    }
    fn model(&self) -> &str {
        "mock-model"
    }
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<Generation, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.params.lock().unwrap().push(*params);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(needle) = &self.fail_when_contains {
            if prompt.contains(needle.as_str()) {
                return Err(LlmError::Api { status: 503, body: "overloaded".into() });
            }
        }
        let prompt_tokens = prompt.split_whitespace().count() as u64;
        Ok(Generation { text: "mock answer".into(), usage: TokenUsage::new(prompt_tokens, 2), model: "mock-model".into() })
    }
}

/// Answers "What is the secret color of X?" only when the prompt states the fact.
pub struct FactGenerator;

#[async_trait]
impl Generator for FactGenerator {
    fn provider(&self) -> &str {
        "mock"
    }
    fn model(&self) -> &str {
        "fact-model"
    }
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<Generation, LlmError> {
        let marker = "Question: What is the secret color of ";
        let name = prompt
            .find(marker)
            .map(|i| &prompt[i + marker.len()..])
            .and_then(|rest| rest.split('?').next())
            .unwrap_or_default();
        let statement = format!("The secret color of {name} is ");
        let text = match prompt.find(&statement) {
            Some(i) => prompt[i + statement.len()..].split('.').next().unwrap_or_default().to_string(),
            None => "I don't know".to_string(),
        };
        Ok(Generation { text, usage: TokenUsage::new(1, 1), model: "fact-model".into() })
    }
}
