//! Client connector
//!
//! Connects to a battle server and speaks the line protocol:
//! - One background listener reads every line for the life of the connection
//! - Replies are matched to calls by `requestId`
//! - Pushed events go to a channel or a registered callback
//!
//! Calls are not pipelined. The write lock is held until the reply to the
//! current call arrives, so at most one request is in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::protocol::{to_line, Command, Event, JoinStatus, ProtocolError, Response};

/// Default timeout for connecting and for each call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection-level and call-level failures
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("connection closed")]
    Closed,

    /// The server answered with `success=false`
    #[error("{0}")]
    Rejected(String),

    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

/// Result of `UserService.LOGIN`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResult {
    pub authenticated: bool,
    pub admin: bool,
}

/// Calls waiting for a reply; `closed` is set once the listener stops
#[derive(Default)]
struct PendingCalls {
    closed: bool,
    calls: HashMap<String, oneshot::Sender<Response>>,
}

type Pending = Arc<Mutex<PendingCalls>>;

/// Connection to a battle server
pub struct BattleClient {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    pending: Pending,
    events: Mutex<Option<mpsc::UnboundedReceiver<Event>>>,
    listener: JoinHandle<()>,
    timeout: Duration,
}

impl BattleClient {
    /// Connect to `addr` (`host:port`), giving up after `timeout`.
    ///
    /// The same timeout bounds every later call.
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self, ClientError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::ConnectTimeout(timeout))??;
        stream.set_nodelay(true)?;
        debug!(%addr, "Connected");

        let (read_half, write_half) = stream.into_split();
        let pending: Pending = Arc::new(Mutex::new(PendingCalls::default()));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let listener = tokio::spawn(listen(read_half, pending.clone(), event_tx));

        Ok(Self {
            writer: tokio::sync::Mutex::new(write_half),
            pending,
            events: Mutex::new(Some(event_rx)),
            listener,
            timeout,
        })
    }

    /// Take the stream of pushed events. Only the first call gets it.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<Event>> {
        self.events.lock().take()
    }

    /// Run `callback` for every pushed event.
    ///
    /// Returns false if the event stream was already taken.
    pub fn on_event<F>(&self, mut callback: F) -> bool
    where
        F: FnMut(Event) + Send + 'static,
    {
        let Some(mut rx) = self.take_events() else {
            return false;
        };
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                callback(event);
            }
        });
        true
    }

    /// Whether the listener is still reading
    pub fn is_connected(&self) -> bool {
        !self.pending.lock().closed
    }

    /// Send one command and wait for its reply's `data`
    pub async fn call(&self, command: Command) -> Result<Value, ClientError> {
        let request = command.into_request();
        let request_id = request.request_id.clone();
        let line = to_line(&request)?;

        let mut writer = self.writer.lock().await;
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            if pending.closed {
                return Err(ClientError::Closed);
            }
            pending.calls.insert(request_id.clone(), tx);
        }

        if let Err(e) = writer.write_all(line.as_bytes()).await {
            self.pending.lock().calls.remove(&request_id);
            return Err(e.into());
        }

        let response = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(ClientError::Closed),
            Err(_) => {
                self.pending.lock().calls.remove(&request_id);
                return Err(ClientError::Timeout(self.timeout));
            }
        };
        drop(writer);

        if response.success {
            Ok(response.data.unwrap_or(Value::Null))
        } else {
            Err(ClientError::Rejected(
                response.error.unwrap_or_else(|| "request failed".into()),
            ))
        }
    }

    async fn call_as<T: DeserializeOwned>(&self, command: Command) -> Result<T, ClientError> {
        let data = self.call(command).await?;
        serde_json::from_value(data).map_err(|e| ClientError::UnexpectedReply(e.to_string()))
    }

    pub async fn join_queue(&self, username: &str) -> Result<JoinStatus, ClientError> {
        self.call_as(Command::JoinQueue {
            username: username.to_string(),
        })
        .await
    }

    pub async fn attack(&self, move_index: usize) -> Result<Event, ClientError> {
        self.call_as(Command::Attack { move_index }).await
    }

    pub async fn switch_pokemon(&self, index: usize) -> Result<Event, ClientError> {
        self.call_as(Command::SwitchPokemon { index }).await
    }

    /// Battle snapshot as raw JSON
    pub async fn get_state(&self) -> Result<Value, ClientError> {
        self.call(Command::GetState).await
    }

    pub async fn leave_battle(&self) -> Result<(), ClientError> {
        self.call(Command::LeaveBattle).await.map(|_| ())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResult, ClientError> {
        self.call_as(Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await
    }

    pub async fn get_types(&self) -> Result<Vec<String>, ClientError> {
        self.call_as(Command::GetTypes).await
    }

    /// Random team with moves, as raw JSON
    pub async fn random_team(&self, size: usize) -> Result<Value, ClientError> {
        self.call(Command::RandomTeam { size }).await
    }

    /// Close the write side and stop listening
    pub async fn close(&self) -> Result<(), ClientError> {
        self.writer.lock().await.shutdown().await?;
        self.listener.abort();
        self.pending.lock().closed = true;
        Ok(())
    }
}

impl Drop for BattleClient {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Read lines until the connection ends; pending calls fail with `Closed`
async fn listen(read_half: OwnedReadHalf, pending: Pending, events: mpsc::UnboundedSender<Event>) {
    let mut lines = BufReader::new(read_half).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                debug!("Read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match Response::from_line(&line) {
            Ok(response) => response,
            Err(e) => {
                warn!("Ignoring unreadable line: {}", e);
                continue;
            }
        };

        if let Some(event) = response.event() {
            let _ = events.send(event);
            continue;
        }

        let waiting = pending.lock().calls.remove(&response.request_id);
        match waiting {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => debug!(request_id = %response.request_id, "Reply with no waiting call"),
        }
    }
    {
        let mut pending = pending.lock();
        pending.closed = true;
        pending.calls.clear();
    }
    debug!("Listener stopped");
}
