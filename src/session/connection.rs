//! Per-connection handling
//!
//! Each accepted socket gets a reader loop and a writer task. Replies and
//! room pushes both go through the connection's outbox, so the writer is
//! the only thing touching the write half and lines never interleave.
//! A read error or EOF counts as leaving the battle.
//!
//! Request lines are capped at `max_line_bytes`. An oversized line is
//! skipped up to its newline and answered with an error; the connection
//! stays usable and never buffers more than the cap.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::auth::CredentialService;
use crate::catalog::Catalog;
use crate::combat::{moves_for, Move, Species, MAX_ROSTER};
use crate::protocol::{to_line, Command, Request, Response};

use super::lobby::{ConnectionId, Lobby, LobbyError};
use super::room::RoomHandle;

/// Outbox depth per connection
const OUTBOX_CAPACITY: usize = 64;

/// Everything a connection needs to answer requests
pub struct SessionContext {
    pub lobby: Arc<Lobby>,
    pub catalog: Arc<dyn Catalog>,
    pub credentials: Arc<dyn CredentialService>,
    /// Longest accepted request line, newline excluded
    pub max_line_bytes: usize,
}

/// Species plus the moves it would battle with
#[derive(Debug, Serialize)]
struct SpeciesView<'a> {
    #[serde(flatten)]
    species: &'a Species,
    moves: Vec<Move>,
}

impl<'a> SpeciesView<'a> {
    fn new(species: &'a Species) -> Self {
        Self {
            species,
            moves: moves_for(species),
        }
    }
}

/// Outcome of one bounded line read
#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    Line,
    TooLong,
    Eof,
}

/// Read one newline-terminated line into `buf` without holding more than
/// `max + 1` bytes. An oversized line is consumed through its newline.
async fn read_line_bounded<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
) -> io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let read = (&mut *reader)
        .take(max as u64 + 1)
        .read_until(b'\n', buf)
        .await?;
    if read == 0 {
        return Ok(LineRead::Eof);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        return Ok(LineRead::Line);
    }
    if buf.len() <= max {
        // Final line without a newline
        return Ok(LineRead::Line);
    }

    buf.clear();
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            return Ok(LineRead::TooLong);
        }
        match chunk.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(LineRead::TooLong);
            }
            None => {
                let len = chunk.len();
                reader.consume(len);
            }
        }
    }
}

struct Session {
    ctx: Arc<SessionContext>,
    id: ConnectionId,
    peer: SocketAddr,
    outbox: mpsc::Sender<Response>,
    username: Option<String>,
}

/// Serve one client until it disconnects or the server shuts down
pub async fn serve(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: Arc<SessionContext>,
    mut shutdown: watch::Receiver<bool>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let (outbox, mut rx) = mpsc::channel::<Response>(OUTBOX_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(response) = rx.recv().await {
            let line = match to_line(&response) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to encode response: {}", e);
                    continue;
                }
            };
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    info!(%peer, "Client connected");

    let max_line_bytes = ctx.max_line_bytes;
    let mut session = Session {
        ctx,
        id: ConnectionId::new_v4(),
        peer,
        outbox,
        username: None,
    };
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();

    loop {
        tokio::select! {
            read = read_line_bounded(&mut reader, &mut buf, max_line_bytes) => {
                let response = match read {
                    Ok(LineRead::Line) => match std::str::from_utf8(&buf) {
                        Ok(line) if line.trim().is_empty() => continue,
                        Ok(line) => session.handle_line(line).await,
                        Err(e) => Response::error("", format!("malformed message: {}", e)),
                    },
                    Ok(LineRead::TooLong) => {
                        warn!(%peer, max_line_bytes, "Oversized request line skipped");
                        Response::error(
                            "",
                            format!("malformed message: line exceeds {} bytes", max_line_bytes),
                        )
                    }
                    Ok(LineRead::Eof) => break,
                    Err(e) => {
                        debug!(%peer, "Read failed: {}", e);
                        break;
                    }
                };
                if session.outbox.send(response).await.is_err() {
                    break;
                }
            }
            _ = shutdown.changed() => {
                debug!(%peer, "Closing connection for shutdown");
                break;
            }
        }
    }

    if let Some(username) = session.username.take() {
        if session.ctx.lobby.leave(&username, session.id).await {
            info!(%peer, %username, "Disconnect treated as leaving battle");
        }
    }
    // Rooms may still hold clones of the outbox; don't wait on them
    writer.abort();
    info!(%peer, "Client disconnected");
}

impl Session {
    async fn handle_line(&mut self, line: &str) -> Response {
        let value: Value = match serde_json::from_str(line.trim()) {
            Ok(value) => value,
            Err(e) => return Response::error("", format!("malformed message: {}", e)),
        };
        let request_id = value
            .get("requestId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => return Response::error(&request_id, format!("malformed message: {}", e)),
        };
        let command = match Command::from_request(&request) {
            Ok(command) => command,
            Err(e) => {
                debug!(peer = %self.peer, "Rejected request: {}", e);
                return Response::error(&request_id, e.to_string());
            }
        };

        debug!(peer = %self.peer, service = %request.service, method = %request.method, "Request");
        self.dispatch(&request_id, command).await
    }

    async fn dispatch(&mut self, id: &str, command: Command) -> Response {
        match command {
            Command::JoinQueue { username } => self.join(id, &username).await,
            Command::Attack { move_index } => {
                let (player, room) = match self.room().await {
                    Ok(found) => found,
                    Err(e) => return Response::error(id, e.to_string()),
                };
                match room.attack(&player, move_index).await {
                    Ok(event) => Response::ok(id, event),
                    Err(e) => Response::error(id, e),
                }
            }
            Command::SwitchPokemon { index } => {
                let (player, room) = match self.room().await {
                    Ok(found) => found,
                    Err(e) => return Response::error(id, e.to_string()),
                };
                match room.switch(&player, index).await {
                    Ok(event) => Response::ok(id, event),
                    Err(e) => Response::error(id, e),
                }
            }
            Command::GetState => {
                let (player, room) = match self.room().await {
                    Ok(found) => found,
                    Err(e) => return Response::error(id, e.to_string()),
                };
                match room.state(&player).await {
                    Ok(snapshot) => Response::ok(id, snapshot),
                    Err(e) => Response::error(id, e),
                }
            }
            Command::LeaveBattle => {
                let left = match &self.username {
                    Some(username) => self.ctx.lobby.leave(username, self.id).await,
                    None => false,
                };
                if left {
                    Response::ok(id, json!({ "left": true }))
                } else {
                    Response::error(id, LobbyError::NotInBattle.to_string())
                }
            }
            Command::Login { username, password } => {
                let authenticated = self.ctx.credentials.authenticate(&username, &password);
                let admin = authenticated && self.ctx.credentials.is_admin(&username);
                info!(peer = %self.peer, %username, authenticated, "Login attempt");
                Response::ok(
                    id,
                    json!({ "authenticated": authenticated, "admin": admin }),
                )
            }
            Command::GetSpecies { id: species_id } => {
                match self.ctx.catalog.find_by_id(species_id) {
                    Ok(species) => Response::ok(id, SpeciesView::new(&species)),
                    Err(e) => Response::error(id, e.to_string()),
                }
            }
            Command::GetRandomSpecies { count } => match self.ctx.catalog.find_random(count) {
                Ok(list) => {
                    let species: Vec<&Species> = list.iter().map(|s| s.as_ref()).collect();
                    Response::ok(id, species)
                }
                Err(e) => Response::error(id, e.to_string()),
            },
            Command::GetTypes => Response::ok(id, self.ctx.catalog.all_types()),
            Command::RandomTeam { size } => {
                if size == 0 || size > MAX_ROSTER {
                    return Response::error(
                        id,
                        format!("team size must be between 1 and {}", MAX_ROSTER),
                    );
                }
                match self.ctx.catalog.find_random(size) {
                    Ok(team) => {
                        let views: Vec<SpeciesView> =
                            team.iter().map(|s| SpeciesView::new(s)).collect();
                        Response::ok(id, views)
                    }
                    Err(e) => Response::error(id, e.to_string()),
                }
            }
        }
    }

    async fn join(&mut self, id: &str, username: &str) -> Response {
        // One battle per connection, whatever name it asks for next
        if let Some(current) = &self.username {
            if self.ctx.lobby.is_seated(current, self.id).await {
                return Response::error(id, LobbyError::AlreadyInBattle.to_string());
            }
        }

        match self
            .ctx
            .lobby
            .join(username, self.id, self.outbox.clone())
            .await
        {
            Ok(status) => {
                self.username = Some(username.to_string());
                Response::ok(id, status)
            }
            Err(e) => {
                debug!(peer = %self.peer, %username, "Join refused: {}", e);
                Response::error(id, e.to_string())
            }
        }
    }

    async fn room(&self) -> Result<(String, RoomHandle), LobbyError> {
        let username = self.username.as_deref().ok_or(LobbyError::NotInBattle)?;
        let room = self.ctx.lobby.room_of(username, self.id).await?;
        Ok((username.to_string(), room))
    }
}
