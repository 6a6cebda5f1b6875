//! Strata application binary - composition root.
//!
//! Ties the workspace crates into a single interactive assistant:
//! 1. Load configuration from TOML
//! 2. Discover the per-category indexes written by the ingestion component
//! 3. Build the retrieval gateway and generation backend
//! 4. Run the chat shell until the user ends the session

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use strata_chat::orchestrator::{Orchestrator, TurnLimits};
use strata_chat::session::ChatSession;
use strata_chat::OllamaGenerator;
use strata_core::config::StrataConfig;
use strata_core::error::StrataError;
use strata_retrieval::embedding::{DynEmbeddingService, HashEmbedding, OllamaEmbedding};
use strata_retrieval::gateway::RetrievalGateway;
use strata_retrieval::registry::CategoryRegistry;

/// Vector size of the default Ollama embedding model.
const NOMIC_EMBED_DIMENSIONS: usize = 768;

const BANNER: &str = "\
Commands:
  //exit    - end the session
  //history - print the conversation window
  //clear   - clear the conversation window
Chat started.";

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

fn build_embedder(config: &StrataConfig) -> Result<Arc<dyn DynEmbeddingService>, StrataError> {
    match config.embedding.backend.as_str() {
        "hash" => Ok(Arc::new(HashEmbedding::new())),
        "ollama" => Ok(Arc::new(OllamaEmbedding::new(
            config.embedding.endpoint.clone(),
            config.embedding.model.clone(),
            NOMIC_EMBED_DIMENSIONS,
        ))),
        other => Err(StrataError::Config(format!(
            "Unknown embedding backend: {}",
            other
        ))),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Strata v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config = StrataConfig::load_or_default(&config_path());

    // Retrieval stack: registry -> gateway.
    let embedder = build_embedder(&config)?;
    let index_dir = Path::new(&config.general.data_dir).join("indexes");
    let registry = CategoryRegistry::discover(&index_dir)?;
    if registry.is_empty() {
        tracing::warn!(
            "No indexed collections under {}; answering from model knowledge only",
            index_dir.display()
        );
    }
    let gateway = RetrievalGateway::from_registry(&registry, embedder, config.retrieval.top_k);

    // Generation backend.
    let generator = OllamaGenerator::new(
        config.generation.endpoint.clone(),
        config.generation.model.clone(),
    );

    let limits = TurnLimits {
        max_rounds: config.chat.max_rounds,
        turn_timeout: std::time::Duration::from_secs(config.chat.turn_timeout_secs),
        ..TurnLimits::default()
    };
    let orchestrator = Orchestrator::new(Box::new(generator), gateway, limits);
    let mut session = ChatSession::new(config.chat.history_capacity);

    println!("{}", BANNER);

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline("\nuser: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let input = line.trim();

        match input.to_lowercase().as_str() {
            "" => continue,
            "//exit" => break,
            "//clear" => {
                session.clear_history();
                println!("\nChat history cleared.");
                continue;
            }
            "//history" => {
                println!("\n{}", session.formatted_history());
                continue;
            }
            _ => {}
        }

        editor.add_history_entry(input)?;
        match orchestrator.take_turn(&mut session, input).await {
            Ok(answer) => println!("\nagent: {}", answer),
            Err(e) => {
                tracing::error!(error = %e, "Turn failed");
                println!("\nagent: I hit a problem handling that ({}). Please try again.", e);
            }
        }
    }

    println!("\nGoodbye!");
    Ok(())
}
