//! Encounter state
//!
//! One battle instance: two sides, whose turn it is, and the phase of
//! the battle state machine:
//!
//! ```text
//! START -> WAITING_FOR_ACTION -> EXECUTING_MOVE -> (POKEMON_FAINTED ->)
//!       SWITCHING_POKEMON? -> WAITING_FOR_ACTION -> ... -> END
//! ```
//!
//! Mutation goes through the orchestrator; this module only exposes the
//! state and crate-internal setters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::roster::{Side, SlotSummary};
use super::species::Move;

/// Battle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Start,
    WaitingForAction,
    ExecutingMove,
    PokemonFainted,
    SwitchingPokemon,
    End,
}

/// Which of the two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnSide {
    #[serde(rename = "SIDE_A")]
    A,
    #[serde(rename = "SIDE_B")]
    B,
}

impl TurnSide {
    pub fn other(self) -> TurnSide {
        match self {
            TurnSide::A => TurnSide::B,
            TurnSide::B => TurnSide::A,
        }
    }

    fn index(self) -> usize {
        match self {
            TurnSide::A => 0,
            TurnSide::B => 1,
        }
    }
}

/// One battle between two sides
#[derive(Debug, Clone)]
pub struct Encounter {
    sides: [Side; 2],
    current_turn: TurnSide,
    phase: Phase,
    last_message: String,
    terminal: bool,
    winner: Option<TurnSide>,
}

impl Encounter {
    /// Create an encounter; side A moves first
    pub fn new(side_a: Side, side_b: Side) -> Self {
        let mut encounter = Self {
            sides: [side_a, side_b],
            current_turn: TurnSide::A,
            phase: Phase::Start,
            last_message: String::new(),
            terminal: false,
            winner: None,
        };
        encounter.last_message = format!(
            "{} challenges {}!",
            encounter.sides[0].trainer(),
            encounter.sides[1].trainer()
        );
        encounter.phase = Phase::WaitingForAction;
        encounter
    }

    pub fn side(&self, which: TurnSide) -> &Side {
        &self.sides[which.index()]
    }

    pub(crate) fn side_mut(&mut self, which: TurnSide) -> &mut Side {
        &mut self.sides[which.index()]
    }

    /// Borrow the acting side and its opponent mutably at once
    pub(crate) fn sides_mut(&mut self, actor: TurnSide) -> (&mut Side, &mut Side) {
        let [a, b] = &mut self.sides;
        match actor {
            TurnSide::A => (a, b),
            TurnSide::B => (b, a),
        }
    }

    /// Find which side a trainer is on
    pub fn side_of(&self, trainer: &str) -> Option<TurnSide> {
        [TurnSide::A, TurnSide::B]
            .into_iter()
            .find(|s| self.side(*s).trainer() == trainer)
    }

    pub fn current_turn(&self) -> TurnSide {
        self.current_turn
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn winner(&self) -> Option<TurnSide> {
        self.winner
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_turn(&mut self, turn: TurnSide) {
        self.current_turn = turn;
    }

    pub(crate) fn set_message(&mut self, message: String) {
        self.last_message = message;
    }

    pub(crate) fn finish(&mut self, winner: TurnSide) {
        self.phase = Phase::End;
        self.terminal = true;
        self.winner = Some(winner);
    }

    /// Serializable view, including the viewer's available moves
    pub fn snapshot(&self, viewer: Option<TurnSide>) -> BattleSnapshot {
        let sides = [TurnSide::A, TurnSide::B]
            .into_iter()
            .map(|which| {
                let side = self.side(which);
                SideSnapshot {
                    trainer: side.trainer().to_string(),
                    active_index: side.active_index(),
                    roster: side.slots().iter().map(|s| s.summary()).collect(),
                }
            })
            .collect();

        BattleSnapshot {
            phase: self.phase,
            current_turn: self.side(self.current_turn).trainer().to_string(),
            last_message: self.last_message.clone(),
            terminal: self.terminal,
            winner: self.winner.map(|w| self.side(w).trainer().to_string()),
            sides,
            moves: viewer
                .map(|v| self.side(v).active().moves().to_vec())
                .unwrap_or_default(),
            generated_at: Utc::now(),
        }
    }
}

/// Serializable view of one side
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideSnapshot {
    pub trainer: String,
    pub active_index: usize,
    pub roster: Vec<SlotSummary>,
}

/// Serializable view of a whole encounter
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSnapshot {
    pub phase: Phase,
    pub current_turn: String,
    pub last_message: String,
    pub terminal: bool,
    pub winner: Option<String>,
    pub sides: Vec<SideSnapshot>,
    pub moves: Vec<Move>,
    pub generated_at: DateTime<Utc>,
}
