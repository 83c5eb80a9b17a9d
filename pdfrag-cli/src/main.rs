mod chat;
mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pdfrag::{
    AnswerSynthesizer, ChannelObserver, OpenAICompletionProvider, OpenAIEmbeddingProvider,
    RagConfig, RagPipeline, RagSession, RetryingCompletion, RetryingEmbedder, StatusEvent, Task,
    TaskOutput, TaskRunner,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let session = build_session(&config)?;

    let (observer, events) = ChannelObserver::channel();
    let printer = tokio::spawn(print_events(events));

    session.configure(&cli.db, &observer).await?;
    let runner = TaskRunner::new(session, Arc::new(observer.clone()));

    let outcome = match cli.command {
        Command::Ingest { dir } => ingest(&runner, dir).await,
        Command::Add { file } => {
            run_task(&runner, Task::AddDocument(file)).await.map(|_| ()).map_err(Into::into)
        }
        Command::Search { query, top_k } => search(&runner, &query, top_k, &observer).await,
        Command::Ask { query } => ask(&runner, query).await,
        Command::Chat => chat::run(&runner).await,
    };

    drop(runner);
    drop(observer);
    printer.await.context("status printer failed")?;
    outcome
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdfrag=info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_config(cli: &Cli) -> Result<RagConfig> {
    let mut config = match &cli.config {
        Some(path) => RagConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RagConfig::default(),
    };
    if let Some(collection) = &cli.collection {
        config.collection = collection.clone();
    }
    config.validate()?;
    Ok(config)
}

fn build_session(config: &RagConfig) -> Result<Arc<RagSession>> {
    let mut embedder =
        OpenAIEmbeddingProvider::from_env()?.with_model(config.embedding_model.as_str());
    let mut completion =
        OpenAICompletionProvider::from_env()?.with_model(config.completion_model.as_str());
    if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
        embedder = embedder.with_base_url(base_url.as_str());
        completion = completion.with_base_url(base_url);
    }

    let pipeline = RagPipeline::builder()
        .config(config.clone())
        .embedding_provider(Arc::new(RetryingEmbedder::new(embedder, config.retry.clone())))
        .build()?;
    let synthesizer = AnswerSynthesizer::new(
        Arc::new(RetryingCompletion::new(completion, config.retry.clone())),
        config,
    );
    Ok(Arc::new(RagSession::new(Arc::new(pipeline), Arc::new(synthesizer))))
}

/// Submit `task` and wait for it, cancelling it on Ctrl-C.
pub(crate) async fn run_task(runner: &TaskRunner, task: Task) -> pdfrag::Result<TaskOutput> {
    let handle = runner.submit(task);
    let cancel = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            cancel.cancel();
        }
    });

    let outcome = handle.wait().await;
    interrupt.abort();
    outcome
}

async fn ingest(runner: &TaskRunner, dir: PathBuf) -> Result<()> {
    if let TaskOutput::Ingested(report) = run_task(runner, Task::IngestDirectory(dir)).await? {
        eprintln!(
            "{} documents, {} entries, {} empty, {} pages skipped",
            report.documents.len(),
            report.entries(),
            report.empty_documents(),
            report.failed_pages()
        );
    }
    Ok(())
}

pub(crate) async fn ask(runner: &TaskRunner, query: String) -> Result<()> {
    if let TaskOutput::Answered(answer) = run_task(runner, Task::Answer(query)).await? {
        println!("{}", answer.text);
    }
    Ok(())
}

async fn search(
    runner: &TaskRunner,
    query: &str,
    top_k: Option<usize>,
    observer: &ChannelObserver,
) -> Result<()> {
    let results = runner.session().retrieve(query, top_k, observer).await?;
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} #{}\n   {}",
            rank + 1,
            result.score,
            result.chunk.source,
            result.chunk.index,
            preview(&result.chunk.text, 200)
        );
    }
    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Print progress and status lines until every observer is dropped.
///
/// Answers are printed by the command that asked for them.
async fn print_events(mut events: UnboundedReceiver<StatusEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            StatusEvent::Progress { completed, total } if total > 0 => {
                eprintln!("[{completed}/{total}]");
            }
            StatusEvent::Progress { .. } => eprintln!("no PDF files found"),
            StatusEvent::Status { message } => eprintln!("{message}"),
            StatusEvent::Answer { .. } => {}
        }
    }
}
