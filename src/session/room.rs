//! Room actor
//!
//! Every matched pair gets one task that alone owns the `Encounter`.
//! Connections talk to it through a `RoomHandle`; commands are processed
//! one at a time, so turn checks and state changes need no locking.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::combat::{BattleSnapshot, Encounter, TurnSide};
use crate::orchestrator::{MoveOutcome, Orchestrator, SwitchOutcome};
use crate::protocol::{effectiveness_name, Event, Response};

use super::lobby::Lobby;

/// Commands accepted by a room
#[derive(Debug)]
pub(crate) enum RoomCommand {
    Attack {
        player: String,
        move_index: usize,
        reply: oneshot::Sender<Result<Event, String>>,
    },
    Switch {
        player: String,
        index: usize,
        reply: oneshot::Sender<Result<Event, String>>,
    },
    State {
        player: String,
        reply: oneshot::Sender<Result<BattleSnapshot, String>>,
    },
    Leave {
        player: String,
    },
}

/// Cheap, cloneable handle to a room task
#[derive(Debug, Clone)]
pub struct RoomHandle {
    battle_id: String,
    tx: mpsc::UnboundedSender<RoomCommand>,
}

const ROOM_CLOSED: &str = "BATTLE_OVER";

impl RoomHandle {
    pub fn battle_id(&self) -> &str {
        &self.battle_id
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, String>>) -> RoomCommand,
    ) -> Result<T, String> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| ROOM_CLOSED.to_string())?;
        rx.await.map_err(|_| ROOM_CLOSED.to_string())?
    }

    /// Use a move; the resulting event has already been broadcast
    pub async fn attack(&self, player: &str, move_index: usize) -> Result<Event, String> {
        let player = player.to_string();
        self.request(|reply| RoomCommand::Attack {
            player,
            move_index,
            reply,
        })
        .await
    }

    /// Switch the active slot; the resulting event has already been broadcast
    pub async fn switch(&self, player: &str, index: usize) -> Result<Event, String> {
        let player = player.to_string();
        self.request(|reply| RoomCommand::Switch {
            player,
            index,
            reply,
        })
        .await
    }

    /// Current battle state as seen by `player`
    pub async fn state(&self, player: &str) -> Result<BattleSnapshot, String> {
        let player = player.to_string();
        self.request(|reply| RoomCommand::State { player, reply })
            .await
    }

    /// Tell the room a player is gone. Fire and forget.
    pub fn leave(&self, player: &str) {
        let _ = self.tx.send(RoomCommand::Leave {
            player: player.to_string(),
        });
    }
}

/// One connected player of a room
#[derive(Debug)]
pub(crate) struct Seat {
    pub username: String,
    pub outbox: mpsc::Sender<Response>,
}

struct Room {
    battle_id: String,
    seats: [Seat; 2],
    encounter: Encounter,
    orchestrator: Orchestrator,
    rng: StdRng,
    lobby: Arc<Lobby>,
}

/// Start a room task; `seats[0]` plays side A and moves first
pub(crate) fn spawn_room(
    battle_id: String,
    seats: [Seat; 2],
    encounter: Encounter,
    orchestrator: Orchestrator,
    lobby: Arc<Lobby>,
) -> RoomHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let room = Room {
        battle_id: battle_id.clone(),
        seats,
        encounter,
        orchestrator,
        rng: StdRng::from_os_rng(),
        lobby,
    };
    tokio::spawn(room.run(rx));
    RoomHandle { battle_id, tx }
}

impl Room {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<RoomCommand>) {
        info!(
            battle_id = %self.battle_id,
            side_a = %self.seats[0].username,
            side_b = %self.seats[1].username,
            "Battle started"
        );

        while let Some(command) = rx.recv().await {
            match command {
                RoomCommand::Attack {
                    player,
                    move_index,
                    reply,
                } => {
                    let result = self.attack(&player, move_index).await;
                    let finished = self.finish_if_over().await;
                    let _ = reply.send(result);
                    if finished {
                        break;
                    }
                }
                RoomCommand::Switch {
                    player,
                    index,
                    reply,
                } => {
                    let result = self.switch(&player, index).await;
                    let finished = self.finish_if_over().await;
                    let _ = reply.send(result);
                    if finished {
                        break;
                    }
                }
                RoomCommand::State { player, reply } => {
                    let result = self
                        .side_of(&player)
                        .map(|side| self.encounter.snapshot(Some(side)));
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { player } => {
                    self.opponent_left(&player).await;
                    break;
                }
            }
        }

        debug!(battle_id = %self.battle_id, "Room task stopped");
    }

    /// Dissolve the room once the encounter has a winner. The lobby is
    /// cleared before the final reply goes out.
    async fn finish_if_over(&self) -> bool {
        if !self.encounter.is_terminal() {
            return false;
        }
        let winner = self
            .encounter
            .winner()
            .map(|w| self.trainer(w).to_string())
            .unwrap_or_default();
        info!(battle_id = %self.battle_id, %winner, "Battle finished");
        self.lobby.dissolve(&self.battle_id).await;
        true
    }

    fn side_of(&self, player: &str) -> Result<TurnSide, String> {
        self.encounter
            .side_of(player)
            .ok_or_else(|| "NOT_IN_BATTLE".to_string())
    }

    fn trainer(&self, side: TurnSide) -> &str {
        self.encounter.side(side).trainer()
    }

    async fn attack(&mut self, player: &str, move_index: usize) -> Result<Event, String> {
        let side = self.side_of(player)?;
        let outcome = self
            .orchestrator
            .apply_move(&mut self.encounter, side, move_index, &mut self.rng)
            .map_err(|e| e.to_string())?;
        let event = self.move_event(outcome);
        self.broadcast(&event).await;
        Ok(event)
    }

    async fn switch(&mut self, player: &str, index: usize) -> Result<Event, String> {
        let side = self.side_of(player)?;
        let outcome = self
            .orchestrator
            .switch_active(&mut self.encounter, side, index)
            .map_err(|e| e.to_string())?;
        let event = self.switch_event(outcome);
        self.broadcast(&event).await;
        Ok(event)
    }

    async fn opponent_left(&self, player: &str) {
        info!(battle_id = %self.battle_id, %player, "Player left battle");
        let event = Event::OpponentLeft {
            battle_id: self.battle_id.clone(),
            opponent: player.to_string(),
        };
        let response = Response::push(&event);
        for seat in self.seats.iter().filter(|s| s.username != player) {
            if seat.outbox.send(response.clone()).await.is_err() {
                debug!(player = %seat.username, "Remaining player already disconnected");
            }
        }
    }

    fn move_event(&self, outcome: MoveOutcome) -> Event {
        Event::Attack {
            battle_id: self.battle_id.clone(),
            attacker: self.trainer(outcome.attacker).to_string(),
            move_name: outcome.move_name,
            damage: outcome.damage,
            effectiveness: effectiveness_name(outcome.calculation.effectiveness()),
            target_fainted: outcome.target_fainted,
            message: outcome.message,
            next_turn: self.trainer(outcome.next_turn).to_string(),
            winner: outcome.winner.map(|w| self.trainer(w).to_string()),
        }
    }

    fn switch_event(&self, outcome: SwitchOutcome) -> Event {
        let side = self.encounter.side(outcome.side);
        Event::Switch {
            battle_id: self.battle_id.clone(),
            trainer: side.trainer().to_string(),
            index: outcome.index,
            species: side.active().species().name.clone(),
            forced: outcome.forced,
            message: outcome.message,
            next_turn: self.trainer(outcome.next_turn).to_string(),
        }
    }

    async fn broadcast(&self, event: &Event) {
        let response = Response::push(event);
        for seat in &self.seats {
            if seat.outbox.send(response.clone()).await.is_err() {
                warn!(
                    battle_id = %self.battle_id,
                    player = %seat.username,
                    "Failed to deliver battle event"
                );
            }
        }
    }
}
