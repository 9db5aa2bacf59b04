//! battled - turn-based battle server daemon
//!
//! Players connect over TCP, queue for a match, and fight two-player
//! battles whose rules live in `combat` and `orchestrator`. The wire format
//! is newline-delimited JSON (`protocol`).

pub mod auth;
pub mod catalog;
pub mod client;
pub mod combat;
pub mod orchestrator;
pub mod protocol;
pub mod ratelimit;
pub mod session;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

use auth::CredentialService;
use catalog::Catalog;
use combat::{ImmunityPolicy, MAX_ROSTER};
use orchestrator::Orchestrator;
use ratelimit::{RateLimitConfig, RateLimiter};
use session::{Lobby, SessionContext};

/// Port used when none is configured
pub const DEFAULT_PORT: u16 = 5555;

/// Prefix for environment overrides, e.g. `BATTLED_MAX_BATTLES=8`
pub const ENV_PREFIX: &str = "BATTLED_";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Concurrent battles; the connection pool holds twice as many
    pub max_battles: usize,
    /// Species per player
    pub team_size: usize,
    pub rate_limit: RateLimitConfig,
    pub immunity_policy: ImmunityPolicy,
    /// JSON species file; the built-in roster is used when unset
    pub catalog_path: Option<PathBuf>,
    /// Longest request line a client may send
    pub max_line_bytes: usize,
}

/// Configuration that cannot be loaded or could never start a match
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Figment(#[from] figment::Error),

    #[error("team_size must be between 1 and {max}, got {0}", max = MAX_ROSTER)]
    TeamSize(usize),

    #[error("team_size {team_size} exceeds the {species} species in the catalog")]
    CatalogTooSmall { team_size: usize, species: usize },

    #[error("max_line_bytes must be at least 1")]
    LineLimit,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            max_battles: 64,
            team_size: 3,
            rate_limit: RateLimitConfig::default(),
            immunity_policy: ImmunityPolicy::default(),
            catalog_path: None,
            max_line_bytes: 64 * 1024,
        }
    }
}

impl Config {
    /// Layer defaults, an optional TOML file, then `BATTLED_*` variables.
    ///
    /// Nested keys use a double underscore:
    /// `BATTLED_RATE_LIMIT__COOLDOWN_MS=250`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let config: Config = figment.merge(Env::prefixed(ENV_PREFIX).split("__")).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.team_size == 0 || self.team_size > MAX_ROSTER {
            return Err(ConfigError::TeamSize(self.team_size));
        }
        if self.max_line_bytes == 0 {
            return Err(ConfigError::LineLimit);
        }
        Ok(())
    }

    /// Check that a catalog of `species` entries can fill every team
    pub fn check_catalog(&self, species: usize) -> Result<(), ConfigError> {
        if species < self.team_size {
            return Err(ConfigError::CatalogTooSmall {
                team_size: self.team_size,
                species,
            });
        }
        Ok(())
    }

    /// Size of the connection pool
    pub fn max_connections(&self) -> usize {
        self.max_battles.saturating_mul(2).max(1)
    }
}

/// Snapshot for the server console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerStatus {
    pub active_rooms: usize,
    pub waiting_players: usize,
    pub connections: usize,
    pub tracked_addresses: usize,
}

/// The battled server instance
pub struct Server {
    config: Config,
    ctx: Arc<SessionContext>,
    limiter: Arc<RateLimiter>,
    permits: Arc<Semaphore>,
    live: Arc<AtomicUsize>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Create a server over the given collaborators
    pub fn new(
        config: Config,
        catalog: Arc<dyn Catalog>,
        credentials: Arc<dyn CredentialService>,
    ) -> Self {
        let orchestrator = Orchestrator::new(config.immunity_policy);
        let lobby = Arc::new(Lobby::new(
            catalog.clone(),
            orchestrator,
            config.team_size,
            config.max_battles,
        ));
        let ctx = Arc::new(SessionContext {
            lobby,
            catalog,
            credentials,
            max_line_bytes: config.max_line_bytes,
        });
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let permits = Arc::new(Semaphore::new(config.max_connections()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            ctx,
            limiter,
            permits,
            live: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Run the accept loop until shutdown
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(
            max_battles = self.config.max_battles,
            "battled listening on {}", local_addr
        );

        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            // A free worker slot comes first; pending sockets wait in the backlog
            let permit = tokio::select! {
                permit = self.permits.clone().acquire_owned() => permit?,
                _ = shutdown_rx.changed() => break,
            };

            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Accept failed: {}", e);
                        continue;
                    }
                },
                _ = shutdown_rx.changed() => break,
            };

            if !self.limiter.check(peer.ip()) {
                // Refused silently
                debug!(%peer, "Connection rate limited");
                drop(stream);
                continue;
            }

            let ctx = self.ctx.clone();
            let shutdown = self.shutdown_rx.clone();
            let live = self.live.clone();
            live.fetch_add(1, Ordering::Relaxed);
            tokio::spawn(async move {
                session::serve(stream, peer, ctx, shutdown).await;
                live.fetch_sub(1, Ordering::Relaxed);
                drop(permit);
            });
        }

        info!("battled shutdown complete");
        Ok(())
    }

    /// Signal the server to shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current room, connection, and limiter counters
    pub async fn status(&self) -> ServerStatus {
        let lobby = self.ctx.lobby.stats().await;
        ServerStatus {
            active_rooms: lobby.active_rooms,
            waiting_players: lobby.waiting_players,
            connections: self.live.load(Ordering::Relaxed),
            tracked_addresses: self.limiter.tracked(),
        }
    }
}
