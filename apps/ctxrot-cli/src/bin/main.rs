use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ctxrot_core::config::Config;
use ctxrot_core::extract::list_documents;
use ctxrot_core::types::{preview, Retrieval};
use ctxrot_retrieval::report::SOURCE_PREVIEW_CHARS;
use ctxrot_retrieval::{run_benchmark, FactSheet, IngestReport, QueryOptions, RagEngine, Status};

#[derive(Parser, Debug)]
#[command(name = "ctxrot", version, about = "Compare full-document and retrieved-context answers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest documents and print per-file reports plus index stats.
    Ingest {
        /// Files or directories (walked for .txt, .md and .pdf).
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ingest documents, then answer one question both ways.
    Query {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(short, long)]
        question: String,
        /// Segments to retrieve (defaults to `top_k` from config).
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Include the ranking breakdown and both prompts in the report.
        #[arg(short, long)]
        verbose: bool,
    },
    /// Ingest documents and print the context retrieved for one or more phrasings, without generating.
    Retrieve {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Repeat to merge results across phrasings.
        #[arg(short = 'q', long = "question", required = true)]
        questions: Vec<String>,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Run the synthetic recall benchmark: hidden facts in filler, asked back through both paths.
    Demo {
        #[arg(long, default_value_t = 10)]
        facts: usize,
        #[arg(short = 'k', long, default_value_t = 2)]
        top_k: usize,
    },
    /// Ingest documents and print index stats.
    Stats {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ingest documents, then read questions from stdin until `exit`.
    Interactive {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
}

#[derive(Serialize)]
struct CitedSegment {
    source: String,
    ordinal: usize,
    preview: String,
}

#[derive(Serialize)]
struct RetrieveReport {
    queries: Vec<String>,
    segments: Vec<CitedSegment>,
    context: String,
}

impl RetrieveReport {
    fn new(queries: Vec<String>, retrieval: Retrieval) -> Self {
        let segments = retrieval
            .cited_segments
            .iter()
            .map(|s| CitedSegment {
                source: s.source.clone(),
                ordinal: s.ordinal,
                preview: preview(&s.text, SOURCE_PREVIEW_CHARS),
            })
            .collect();
        Self { queries, segments, context: retrieval.context }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn ingest_all(engine: &RagEngine, roots: &[PathBuf]) -> anyhow::Result<Vec<IngestReport>> {
    let files: Vec<PathBuf> = roots.iter().flat_map(|root| list_documents(root)).collect();
    if files.is_empty() {
        anyhow::bail!("no ingestable documents under {:?}", roots);
    }
    info!(files = files.len(), "ingesting");

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );

    let mut reports = Vec::with_capacity(files.len());
    for path in &files {
        pb.set_message(path.display().to_string());
        match engine.ingest_path(path).await {
            Ok(report) => reports.push(report),
            Err(e) if e.is_fatal() => {
                pb.abandon();
                return Err(e).with_context(|| format!("ingesting {}", path.display()));
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "ingest failed");
                reports.push(IngestReport {
                    status: Status::Error,
                    message: format!("{}: {e}", path.display()),
                    chunks_created: 0,
                    embeddings_stored: 0,
                });
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");
    Ok(reports)
}

async fn interactive(engine: &RagEngine, top_k: Option<usize>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"question> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }
        match engine.query(line, top_k).await {
            Ok(report) => print_json(&report)?,
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;
    let engine = RagEngine::from_settings(&settings)?;

    match cli.command {
        Command::Ingest { paths } => {
            let reports = ingest_all(&engine, &paths).await?;
            print_json(&reports)?;
            print_json(&engine.stats())?;
        }
        Command::Query { paths, question, top_k, verbose } => {
            ingest_all(&engine, &paths).await?;
            let report = engine.query_with(&question, QueryOptions { top_k, verbose }).await?;
            print_json(&report)?;
        }
        Command::Retrieve { paths, questions, top_k } => {
            ingest_all(&engine, &paths).await?;
            let k = top_k.unwrap_or(settings.top_k);
            let retrieval = engine.retriever().retrieve_multi(&questions, k).await?;
            print_json(&RetrieveReport::new(questions, retrieval))?;
        }
        Command::Demo { facts, top_k } => {
            let report = run_benchmark(&engine, &FactSheet::generate(facts), top_k).await?;
            print_json(&report)?;
        }
        Command::Stats { paths } => {
            ingest_all(&engine, &paths).await?;
            print_json(&engine.stats())?;
        }
        Command::Interactive { paths, top_k } => {
            ingest_all(&engine, &paths).await?;
            print_json(&engine.stats())?;
            interactive(&engine, top_k).await?;
        }
    }
    Ok(())
}
