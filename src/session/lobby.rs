//! Matchmaking and the room table
//!
//! - One coarse lock over every room and the username index
//! - A waiting room holds only its first player; the second join fills it
//!   and starts the room actor
//! - Nothing is ever sent to a room actor while the lock is held
//! - A player is keyed by username and the id of the connection that
//!   joined, so a stale connection never reaches a later holder of its name

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::auth::is_valid_username;
use crate::catalog::{Catalog, CatalogError};
use crate::combat::{Encounter, Side};
use crate::orchestrator::Orchestrator;
use crate::protocol::{Event, JoinStatus, Response};

/// Identity of one client connection
pub type ConnectionId = uuid::Uuid;

use super::room::{spawn_room, RoomHandle, Seat};

/// Matchmaking and routing failures. The display text is the wire error code.
#[derive(Debug, Error)]
pub enum LobbyError {
    #[error("ALREADY_IN_BATTLE")]
    AlreadyInBattle,

    #[error("NOT_IN_BATTLE")]
    NotInBattle,

    #[error("WAITING_FOR_OPPONENT")]
    WaitingForOpponent,

    #[error("INVALID_USERNAME")]
    InvalidUsername,

    #[error("SERVER_FULL")]
    Full,

    #[error("TEAM_UNAVAILABLE: {0}")]
    TeamUnavailable(#[from] CatalogError),
}

/// Counters for the server console
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LobbyStats {
    pub active_rooms: usize,
    pub waiting_players: usize,
}

struct RoomEntry {
    player1: String,
    player1_outbox: mpsc::Sender<Response>,
    player2: Option<String>,
    handle: Option<RoomHandle>,
}

struct Membership {
    battle_id: String,
    conn: ConnectionId,
}

#[derive(Default)]
struct LobbyState {
    rooms: HashMap<String, RoomEntry>,
    players: HashMap<String, Membership>,
}

impl LobbyState {
    fn battle_of(&self, username: &str, conn: ConnectionId) -> Option<&str> {
        self.players
            .get(username)
            .filter(|m| m.conn == conn)
            .map(|m| m.battle_id.as_str())
    }

    fn seat(&mut self, username: &str, conn: ConnectionId, battle_id: &str) {
        self.players.insert(
            username.to_string(),
            Membership {
                battle_id: battle_id.to_string(),
                conn,
            },
        );
    }

    /// Unmap `username` only if it still points at `battle_id`
    fn unseat(&mut self, username: &str, battle_id: &str) {
        if self
            .players
            .get(username)
            .is_some_and(|m| m.battle_id == battle_id)
        {
            self.players.remove(username);
        }
    }
}

/// Room table shared by every connection
pub struct Lobby {
    state: Mutex<LobbyState>,
    catalog: Arc<dyn Catalog>,
    orchestrator: Orchestrator,
    team_size: usize,
    max_battles: usize,
}

impl Lobby {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        orchestrator: Orchestrator,
        team_size: usize,
        max_battles: usize,
    ) -> Self {
        Self {
            state: Mutex::new(LobbyState::default()),
            catalog,
            orchestrator,
            team_size,
            max_battles,
        }
    }

    /// Queue `username` for a battle on behalf of connection `conn`.
    ///
    /// `outbox` receives the pushes for this player for as long as the
    /// room lives.
    pub async fn join(
        self: &Arc<Self>,
        username: &str,
        conn: ConnectionId,
        outbox: mpsc::Sender<Response>,
    ) -> Result<JoinStatus, LobbyError> {
        if !is_valid_username(username) {
            return Err(LobbyError::InvalidUsername);
        }

        let (status, notify) = {
            let mut state = self.state.lock().await;
            if state.players.contains_key(username) {
                return Err(LobbyError::AlreadyInBattle);
            }

            let waiting = state
                .rooms
                .iter()
                .find(|(_, room)| room.player2.is_none() && room.player1 != username)
                .map(|(id, _)| id.clone());

            match waiting {
                Some(battle_id) => {
                    self.fill_room(&mut state, battle_id, username, conn, outbox)?
                }
                None => {
                    if state.rooms.len() >= self.max_battles {
                        warn!(%username, rooms = state.rooms.len(), "Room table full");
                        return Err(LobbyError::Full);
                    }
                    let battle_id = uuid::Uuid::new_v4().to_string();
                    state.rooms.insert(
                        battle_id.clone(),
                        RoomEntry {
                            player1: username.to_string(),
                            player1_outbox: outbox,
                            player2: None,
                            handle: None,
                        },
                    );
                    state.seat(username, conn, &battle_id);
                    info!(%battle_id, %username, "Player waiting for opponent");
                    (JoinStatus::WaitingOpponent { battle_id }, None)
                }
            }
        };

        if let Some((outbox, event)) = notify {
            if outbox.send(Response::push(&event)).await.is_err() {
                debug!("Waiting player disconnected before the match was announced");
            }
        }
        Ok(status)
    }

    fn fill_room(
        self: &Arc<Self>,
        state: &mut LobbyState,
        battle_id: String,
        username: &str,
        conn: ConnectionId,
        outbox: mpsc::Sender<Response>,
    ) -> Result<(JoinStatus, Option<(mpsc::Sender<Response>, Event)>), LobbyError> {
        let Some(room) = state.rooms.get_mut(&battle_id) else {
            return Err(LobbyError::NotInBattle);
        };

        let side_a = self.build_side(&room.player1)?;
        let side_b = self.build_side(username)?;
        let encounter = Encounter::new(side_a, side_b);

        let seats = [
            Seat {
                username: room.player1.clone(),
                outbox: room.player1_outbox.clone(),
            },
            Seat {
                username: username.to_string(),
                outbox,
            },
        ];
        let handle = spawn_room(
            battle_id.clone(),
            seats,
            encounter,
            self.orchestrator,
            Arc::clone(self),
        );

        room.player2 = Some(username.to_string());
        room.handle = Some(handle);
        let opponent = room.player1.clone();
        let notify = (
            room.player1_outbox.clone(),
            Event::BattleStarted {
                battle_id: battle_id.clone(),
                opponent: username.to_string(),
                first_turn: opponent.clone(),
            },
        );
        state.seat(username, conn, &battle_id);

        Ok((
            JoinStatus::BattleStarted {
                battle_id,
                opponent,
            },
            Some(notify),
        ))
    }

    fn build_side(&self, trainer: &str) -> Result<Side, LobbyError> {
        let team = self.catalog.find_random(self.team_size)?;
        Side::from_species(trainer, &team)
            .map_err(|e| LobbyError::TeamUnavailable(CatalogError::Unavailable(e.to_string())))
    }

    /// The running room `username` plays in through connection `conn`
    pub async fn room_of(
        &self,
        username: &str,
        conn: ConnectionId,
    ) -> Result<RoomHandle, LobbyError> {
        let state = self.state.lock().await;
        let battle_id = state
            .battle_of(username, conn)
            .ok_or(LobbyError::NotInBattle)?;
        state
            .rooms
            .get(battle_id)
            .and_then(|room| room.handle.clone())
            .ok_or(LobbyError::WaitingForOpponent)
    }

    /// Remove `username` from whatever room connection `conn` joined.
    ///
    /// The room and both mappings go away; the remaining peer is told by
    /// the room actor. Returns false if the player was in no room, or the
    /// name now belongs to another connection.
    pub async fn leave(&self, username: &str, conn: ConnectionId) -> bool {
        let handle = {
            let mut state = self.state.lock().await;
            let Some(battle_id) = state.battle_of(username, conn).map(str::to_string) else {
                return false;
            };
            state.players.remove(username);
            match state.rooms.remove(&battle_id) {
                Some(room) => {
                    if let Some(other) = room.player2.as_deref().filter(|p| *p != username) {
                        state.unseat(other, &battle_id);
                    }
                    if room.player1 != username {
                        state.unseat(&room.player1, &battle_id);
                    }
                    info!(%battle_id, %username, "Room closed by departure");
                    room.handle
                }
                None => None,
            }
        };

        if let Some(handle) = handle {
            handle.leave(username);
        }
        true
    }

    /// Drop a finished room and its mappings
    pub(crate) async fn dissolve(&self, battle_id: &str) {
        let mut state = self.state.lock().await;
        if let Some(room) = state.rooms.remove(battle_id) {
            state.unseat(&room.player1, battle_id);
            if let Some(player2) = room.player2 {
                state.unseat(&player2, battle_id);
            }
            debug!(%battle_id, "Room dissolved");
        }
    }

    pub async fn stats(&self) -> LobbyStats {
        let state = self.state.lock().await;
        LobbyStats {
            active_rooms: state.rooms.values().filter(|r| r.handle.is_some()).count(),
            waiting_players: state.rooms.values().filter(|r| r.handle.is_none()).count(),
        }
    }

    /// Battle id `username` is mapped to, if any
    pub async fn battle_of(&self, username: &str) -> Option<String> {
        let state = self.state.lock().await;
        state.players.get(username).map(|m| m.battle_id.clone())
    }

    /// Whether connection `conn` still holds a seat under `username`
    pub async fn is_seated(&self, username: &str, conn: ConnectionId) -> bool {
        self.state.lock().await.battle_of(username, conn).is_some()
    }
}
