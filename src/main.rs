#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::uninlined_format_args)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use jaga::config::Config;
use jaga::gateway;
use jaga::persona::JsonPersonaStore;
use jaga::session::{discover_sessions, SessionId, Supervisor, TransportFactory};
use jaga::status::StatusBoard;
use jaga::transport::{ConsoleTransport, Transport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

/// `jaga` - keeps watch over your chat accounts while you are away.
#[derive(Parser, Debug)]
#[command(name = "jaga")]
#[command(version)]
#[command(about = "Multi-account offline guard with auto-replies.", long_about = None)]
struct Cli {
    /// Path to the TOML config (compiled-in defaults when absent)
    #[arg(long, default_value = "jaga.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start all discovered sessions and the admin panel
    Run {
        /// Override the panel bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the panel port
        #[arg(long)]
        port: Option<u16>,
    },
    /// List discovered session identities
    Sessions,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Run { host, port } => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            run(config, host, port).await
        }
        Commands::Sessions => {
            let sessions = discover_sessions(&config.sessions_root)?;
            if sessions.is_empty() {
                println!(
                    "No sessions under {} (expected auth_info_* directories)",
                    config.sessions_root.display()
                );
            }
            for session in sessions {
                println!("{}\t{}", session.name, session.path.display());
            }
            Ok(())
        }
    }
}

fn transport_factory(config: &Config) -> Result<Arc<TransportFactory>> {
    match config.transport.as_str() {
        "console" => Ok(Arc::new(|_id: &SessionId| -> Arc<dyn Transport> {
            Arc::new(ConsoleTransport::new())
        })),
        other => bail!("unknown transport '{other}' (available: console)"),
    }
}

async fn run(config: Config, host: String, port: u16) -> Result<()> {
    let sessions = discover_sessions(&config.sessions_root)?;
    if sessions.is_empty() {
        tracing::warn!(
            "no sessions under {}; the panel still runs",
            config.sessions_root.display()
        );
    }

    let board = Arc::new(StatusBoard::new());
    for session in &sessions {
        board.register(&session.name);
    }

    let store = Arc::new(JsonPersonaStore::new(config.persona_root.clone()));
    let transports = transport_factory(&config)?;
    let supervisor = Supervisor::new(
        store,
        board.clone(),
        transports,
        Duration::from_secs(config.cooldown_secs),
        Duration::from_secs(config.reconnect.initial_secs),
        Duration::from_secs(config.reconnect.max_secs),
    );

    let mut handles = supervisor.start_all(sessions);

    {
        let board = board.clone();
        let host = host.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = gateway::run_gateway(&host, port, board).await {
                tracing::error!("panel failed: {e:#}");
            }
        }));
    }

    println!("🤖 jaga started");
    println!("   Panel:    http://{host}:{port}");
    println!("   Sessions: {}", board.status_lines().len());
    println!("   Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}
