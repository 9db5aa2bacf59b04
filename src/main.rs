//! battled - battle server daemon

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use battled::auth::MemoryCredentials;
use battled::catalog::{Catalog, StaticCatalog};
use battled::{Config, Server};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Turn-based battle server
#[derive(Parser, Debug)]
#[command(name = "battled", version, about = "Turn-based multiplayer battle server")]
struct Args {
    /// Port to listen on; falls back to the configured port if invalid
    port: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Full listen address, overrides the configured one
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

const HELP: &str = "commands: status, help, stop";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "battled=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let mut config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(port) = &args.port {
        match port.parse::<u16>() {
            Ok(port) if port != 0 => config.bind_addr.set_port(port),
            _ => warn!(
                "Invalid port '{}', using {}",
                port,
                config.bind_addr.port()
            ),
        }
    }

    let catalog = match &config.catalog_path {
        Some(path) => StaticCatalog::from_file(path)?,
        None => StaticCatalog::builtin(),
    };
    config
        .check_catalog(catalog.len())
        .context("Catalog cannot fill a team")?;
    let catalog: Arc<dyn Catalog> = Arc::new(catalog);

    let credentials = MemoryCredentials::new();
    if let (Ok(username), Ok(password)) = (
        std::env::var("BATTLED_ADMIN_USERNAME"),
        std::env::var("BATTLED_ADMIN_PASSWORD"),
    ) {
        credentials
            .register(&username, &password, true)
            .context("Failed to create admin account")?;
        info!(%username, "Admin account created");
    }

    let server = Arc::new(Server::new(config, catalog, Arc::new(credentials)));
    let mut runner = {
        let server = server.clone();
        tokio::spawn(async move { server.run().await })
    };

    tokio::select! {
        result = &mut runner => return result?,
        _ = console(&server) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupt received"),
    }

    server.shutdown();
    runner.await??;
    Ok(())
}

/// Operator console on stdin. Returns on `stop`; idles forever without stdin.
async fn console(server: &Server) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);

    while let Ok(Some(line)) = lines.next_line().await {
        match line.trim() {
            "" => {}
            "status" => {
                let status = server.status().await;
                println!(
                    "listening on {} | rooms: {} | waiting: {} | connections: {} | tracked addresses: {}",
                    server.bind_addr(),
                    status.active_rooms,
                    status.waiting_players,
                    status.connections,
                    status.tracked_addresses
                );
            }
            "help" => println!("{}", HELP),
            "stop" => {
                info!("Stop requested from console");
                return;
            }
            other => println!("unknown command '{}'; {}", other, HELP),
        }
    }

    std::future::pending::<()>().await;
}
