//! `RagEngine` ties ingest, retrieval and the comparison harness together and
//! keeps the raw text of every ingested document for the full-document path.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use ctxrot_core::chunker::Chunker;
use ctxrot_core::config::Settings;
use ctxrot_core::error::{Error, Result};
use ctxrot_core::extract::read_document;
use ctxrot_core::traits::{Embedder, VectorIndexer};
use ctxrot_embed::get_default_embedder;
use ctxrot_llm::{create_generator, params_from, Generator};
use ctxrot_vector::VectorIndex;

use crate::compare::ComparisonHarness;
use crate::context::DELIMITER;
use crate::orchestrator::Retriever;
use crate::prompt::Prompts;
use crate::report::{IngestReport, QueryReport, StatsReport, Status};

#[derive(Debug, Clone)]
struct Document {
    source: String,
    text: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Overrides the configured `top_k`.
    pub top_k: Option<usize>,
    /// Attach the ranking breakdown and both prompts to the report.
    pub verbose: bool,
}

pub struct RagEngine {
    retriever: Retriever<VectorIndex>,
    harness: ComparisonHarness,
    documents: RwLock<Vec<Document>>,
    top_k: usize,
    llm_provider: String,
}

impl RagEngine {
    /// Build the engine from explicit providers. Fails before any work on bad settings
    /// or when the embedder's dimension differs from `embedding.dimension`.
    pub fn new(settings: &Settings, embedder: Box<dyn Embedder>, generator: Arc<dyn Generator>) -> Result<Self> {
        settings.validate()?;
        let index = VectorIndex::new(settings.embedding.dimension);
        let chunker = Chunker::new(settings.chunking())?;
        let retriever = Retriever::new(embedder, index, chunker, settings.max_context_chars)?
            .with_dedup_threshold(settings.dedup_threshold);
        let harness = ComparisonHarness::new(generator, params_from(&settings.llm));
        Ok(Self {
            retriever,
            harness,
            documents: RwLock::new(Vec::new()),
            top_k: settings.top_k,
            llm_provider: settings.llm_provider.to_string(),
        })
    }

    /// Build the engine with the providers selected by configuration.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let embedder = get_default_embedder(settings)?;
        let generator: Arc<dyn Generator> = Arc::from(create_generator(settings.llm_provider, &settings.llm)?);
        Ok(Self::new(settings, embedder, generator)?)
    }

    pub fn retriever(&self) -> &Retriever<VectorIndex> {
        &self.retriever
    }

    /// Segments and the document text become visible to queries together.
    pub async fn ingest_text(&self, text: &str, source: &str) -> Result<IngestReport> {
        let prepared = self.retriever.prepare(text, source).await?;
        let stats = {
            let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
            let stats = self.retriever.publish(prepared)?;
            if stats.segments_created > 0 {
                documents.push(Document { source: source.to_string(), text: text.to_string() });
            }
            stats
        };
        Ok(IngestReport {
            status: Status::Success,
            message: format!("Processed {source}"),
            chunks_created: stats.segments_created,
            embeddings_stored: stats.embeddings_stored,
        })
    }

    pub async fn ingest_path(&self, path: &Path) -> Result<IngestReport> {
        let (text, source) = read_document(path)?;
        self.ingest_text(&text, &source).await
    }

    /// All ingested documents joined in ingest order.
    pub fn full_document(&self) -> String {
        join_documents(&self.documents.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn sources(&self) -> Vec<String> {
        let docs = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        docs.iter().map(|d| d.source.clone()).collect()
    }

    /// Retrieve context for `question` and run both generation paths.
    ///
    /// Retrieval errors fail the whole query; a generation error only marks its path.
    pub async fn query(&self, question: &str, top_k: Option<usize>) -> Result<QueryReport> {
        self.query_with(question, QueryOptions { top_k, verbose: false }).await
    }

    pub async fn query_with(&self, question: &str, options: QueryOptions) -> Result<QueryReport> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidQuery("query cannot be empty".into()));
        }
        let k = options.top_k.unwrap_or(self.top_k);
        if k == 0 {
            return Err(Error::InvalidConfig("k must be greater than 0".into()));
        }
        let query_vec = if self.retriever.index().size() == 0 {
            None
        } else {
            Some(self.retriever.embed_query(question).await?)
        };

        // search and snapshot the registry under one lock so both paths see the same documents
        let (retrieval, explanation, full_document, total_chunks) = {
            let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
            let hits = match &query_vec {
                Some(v) => self.retriever.search(v, k)?,
                None => Vec::new(),
            };
            let (retrieval, explanation) = self.retriever.assemble_explained(question, query_vec.as_deref(), hits);
            (retrieval, explanation, join_documents(&documents), self.retriever.index().size())
        };

        let prompts = Prompts::new(question, &full_document, &retrieval.context);
        info!(k, full_chars = full_document.chars().count(), context_chars = retrieval.context.chars().count(), "running comparison");
        let comparison = self.harness.compare_prompts(&prompts).await;

        let mut report = QueryReport::build(
            question,
            total_chunks,
            &retrieval.cited_segments,
            &retrieval.context,
            &comparison,
            self.harness.generator().model(),
        );
        if options.verbose {
            report.retrieval = Some(explanation);
            report.prompts = Some(prompts);
        }
        Ok(report)
    }

    pub fn stats(&self) -> StatsReport {
        StatsReport {
            total_chunks: self.retriever.index().size(),
            embedding_dimension: self.retriever.index().dim(),
            files_ingested: self.documents.read().unwrap_or_else(PoisonError::into_inner).len(),
            embedding_model: self.retriever.embedder().model_id().to_string(),
            llm_provider: self.llm_provider.clone(),
        }
    }
}

fn join_documents(documents: &[Document]) -> String {
    documents.iter().map(|d| d.text.as_str()).collect::<Vec<_>>().join(DELIMITER)
}
