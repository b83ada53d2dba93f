//! Ana application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Open the session store (SQLite or in-memory)
//! 3. Build the Gemini backend and the chat orchestrator
//! 4. Serve the REST API, or answer a single `--once` message

mod cli;

use std::sync::Arc;

use clap::Parser;

use ana_api::state::AppState;
use ana_chat::{ChatOrchestrator, GeminiBackend};
use ana_core::config::{AnaConfig, StorageBackend};
use ana_storage::{Database, InMemorySessionStore, SessionStore, SqliteSessionStore};

use cli::CliArgs;

/// Open the configured session store.
fn open_store(config: &AnaConfig) -> Result<Arc<dyn SessionStore>, Box<dyn std::error::Error>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory session store; history is lost on exit");
            Ok(Arc::new(InMemorySessionStore::new()))
        }
        StorageBackend::Sqlite => {
            let data_dir = config.general.resolved_data_dir();
            if let Err(e) = std::fs::create_dir_all(&data_dir) {
                tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
                return Err(e.into());
            }
            let db_path = data_dir.join("ana.db");
            let db = Database::new(&db_path)?;
            tracing::info!(path = %db_path.display(), "SQLite database opened");
            Ok(Arc::new(SqliteSessionStore::new(Arc::new(db))))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing starts so its log level can apply.
    let config_file = args.resolve_config_path();
    let loaded = if config_file.exists() {
        Some(AnaConfig::load(&config_file))
    } else {
        None
    };
    let mut config = match loaded {
        Some(Ok(ref config)) => config.clone(),
        _ => AnaConfig::default(),
    };
    args.apply_overrides(&mut config);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Ana v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Some(Ok(_)) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(Err(e)) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
        None => tracing::info!(path = %config_file.display(), "No config file, using defaults"),
    }

    let store = open_store(&config)?;
    let backend = Arc::new(GeminiBackend::from_config(&config.llm));
    tracing::info!(model = %config.llm.model, "Gemini backend configured");
    let orchestrator = ChatOrchestrator::from_config(&config, backend, store);

    if let Some(ref message) = args.once {
        let reply = orchestrator.handle_message(message, None).await?;
        println!("{}", reply.reply);
        if reply.transaction.is_some() || reply.reminder.is_some() {
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        return Ok(());
    }

    let state = AppState::new(config.clone(), orchestrator);
    if let Err(e) = ana_api::start_server(&config, state).await {
        tracing::error!(error = %e, "API server stopped");
        tracing::error!("Try: ANA_PORT={} ana", config.general.port.saturating_add(1));
        return Err(e.into());
    }

    Ok(())
}
