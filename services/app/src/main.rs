use anyhow::Result;
use clap::{Parser, ValueEnum};
use common::{
    backend::{AuthBackend, TableBackend},
    config::{BackendConfig, BackendMode},
    memory::InMemoryBackend,
    rest::RestBackend,
    routes::Route,
};
use std::sync::Arc;
use tokio::io::{BufReader, stdin, stdout};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;
mod console;

use auth::SessionManager;
use console::Console;
use tasks::TaskStore;

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Talk to the hosted service configured through TASKBOARD_* variables
    Rest,
    /// Keep everything in this process
    Memory,
}

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Taskboard - task groups and tasks from the terminal", long_about = None)]
struct Cli {
    /// Backend to use; defaults to TASKBOARD_MODE, then rest
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match cli.mode {
        Some(Mode::Memory) => BackendConfig::memory(),
        Some(Mode::Rest) => BackendConfig {
            mode: BackendMode::Rest,
            ..BackendConfig::from_env()?
        },
        None => BackendConfig::from_env()?,
    };
    config.validate()?;

    let (auth, tables): (Arc<dyn AuthBackend>, Arc<dyn TableBackend>) = match config.mode {
        BackendMode::Rest => {
            info!("Using hosted service at {}", config.url);
            let backend = Arc::new(RestBackend::new(&config)?);
            (
                backend.clone() as Arc<dyn AuthBackend>,
                backend as Arc<dyn TableBackend>,
            )
        }
        BackendMode::Memory => {
            info!("Using in-memory backend");
            let backend = Arc::new(InMemoryBackend::new());
            (
                backend.clone() as Arc<dyn AuthBackend>,
                backend as Arc<dyn TableBackend>,
            )
        }
    };

    let mut session = SessionManager::new(auth, tables.clone());
    let state = session.initialize().await;
    info!("Session initialized: {:?}", state.status);

    let mut console = Console::new(session, TaskStore::new(tables), stdout());
    let start = if state.is_authenticated() {
        Route::Dashboard
    } else {
        Route::Home
    };
    console.navigate(start).await?;
    console.run(BufReader::new(stdin())).await?;
    console.close().await;

    Ok(())
}
