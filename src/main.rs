//! Sift CLI entry point.
//!
//! Provides `serve`, `classify`, and `migrate` subcommands for running the
//! HTTP service, classifying one document from the terminal, or applying
//! the database schema.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::io::Read as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use sift::attachments::decode::NativeDecoders;
use sift::attachments::storage::{HttpObjectStore, ObjectStore};
use sift::attachments::AttachmentDecoder;
use sift::classifier::{BoardSummary, ClassificationInput, EntityClassifier};
use sift::config::SiftConfig;
use sift::extractors::contact::extract_contact_info;
use sift::materializer::Materializer;
use sift::normalize::normalize_content;
use sift::pipeline::Pipeline;
use sift::providers::{self, LlmProvider};
use sift::server::{self, AppState};
use sift::store;

/// Sift — classify unstructured content into CRM records.
#[derive(Parser)]
#[command(name = "sift", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve,
    /// Classify a document and print the entities as JSON. Nothing is stored.
    Classify {
        /// File to read; stdin when omitted.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Board offered to the model as a task destination (repeatable).
        #[arg(long = "board")]
        boards: Vec<String>,
        /// Skip the language model and use the keyword classifier.
        #[arg(long)]
        offline: bool,
    },
    /// Create the database schema and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = SiftConfig::load().context("failed to load configuration")?;

    match cli.command {
        Command::Serve => handle_serve(config).await,
        Command::Classify {
            file,
            boards,
            offline,
        } => handle_classify(config, file, boards, offline).await,
        Command::Migrate => handle_migrate(config).await,
    }
}

/// Run the HTTP service until Ctrl-C.
async fn handle_serve(config: SiftConfig) -> anyhow::Result<()> {
    let _logging_guard = sift::logging::init(&config.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), "sift starting");

    let pool = store::connect(&config.database)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))?;
    store::apply_schema(&pool)
        .await
        .context("failed to apply schema")?;

    let provider = build_provider(&config)?;
    let classifier = EntityClassifier::new(provider, &config.classifier, &config.llm);

    let client = providers::http_client(Duration::from_secs(config.llm.timeout_secs))
        .context("failed to build HTTP client")?;
    let object_store: Option<Arc<dyn ObjectStore>> = match config.storage.as_ref() {
        Some(storage) if !storage.base_url.trim().is_empty() => Some(Arc::new(
            HttpObjectStore::from_config(storage, client).context("invalid storage configuration")?,
        )),
        _ => None,
    };
    let key_prefix = config
        .storage
        .as_ref()
        .map(|s| s.key_prefix.clone())
        .unwrap_or_default();
    let attachments = AttachmentDecoder::new(object_store, Arc::new(NativeDecoders), key_prefix);

    let allocator = store::tasks::allocator_for(config.classifier.position_policy);
    let materializer = Materializer::new(pool.clone(), allocator);
    let pipeline = Pipeline::new(pool, classifier, attachments, materializer);

    let state = AppState {
        pipeline: Arc::new(pipeline),
    };
    server::serve(state, &config.server.bind).await
}

/// Classify one document and print the result.
async fn handle_classify(
    config: SiftConfig,
    file: Option<PathBuf>,
    boards: Vec<String>,
    offline: bool,
) -> anyhow::Result<()> {
    sift::logging::init_cli("warn");

    let raw = match file.as_ref() {
        Some(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            String::from_utf8_lossy(&bytes).into_owned()
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    let content = normalize_content(Some(&raw));
    if content.trim().is_empty() {
        anyhow::bail!("no content to classify");
    }

    let provider = if offline { None } else { build_provider(&config)? };
    let classifier = EntityClassifier::new(provider, &config.classifier, &config.llm);

    let input = ClassificationInput {
        content,
        file_name: file
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned()),
        file_type: None,
        boards: boards
            .into_iter()
            .map(|name| BoardSummary {
                name,
                description: None,
            })
            .collect(),
    };
    let info = extract_contact_info(&input.content);
    let classification = classifier.classify(&input, &info).await;

    let source = match classification.source {
        sift::classifier::ClassificationSource::Model => "model",
        sift::classifier::ClassificationSource::Fallback => "fallback",
    };
    let output = json!({
        "source": source,
        "contactInfo": info,
        "entities": classification.entities,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Apply the schema and exit.
async fn handle_migrate(config: SiftConfig) -> anyhow::Result<()> {
    sift::logging::init_cli(&config.logging.level);
    let pool = store::connect(&config.database)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))?;
    store::apply_schema(&pool)
        .await
        .context("failed to apply schema")?;
    info!(url = %config.database.url, "schema applied");
    pool.close().await;
    Ok(())
}

fn build_provider(config: &SiftConfig) -> anyhow::Result<Option<Arc<dyn LlmProvider>>> {
    providers::from_config(&config.llm).context("failed to configure language model provider")
}
