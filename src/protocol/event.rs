//! Server push events
//!
//! Sent to both players of a room inside a response envelope with an
//! empty `requestId`. The `event` field names the variant.

use serde::{Deserialize, Serialize};

use crate::combat::Effectiveness;

/// Unsolicited battle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum Event {
    /// The waiting player has been matched
    BattleStarted {
        battle_id: String,
        opponent: String,
        first_turn: String,
    },
    /// A move was used
    Attack {
        battle_id: String,
        attacker: String,
        move_name: String,
        damage: u32,
        effectiveness: String,
        target_fainted: bool,
        message: String,
        next_turn: String,
        winner: Option<String>,
    },
    /// An active slot was switched
    Switch {
        battle_id: String,
        trainer: String,
        index: usize,
        species: String,
        forced: bool,
        message: String,
        next_turn: String,
    },
    /// The other player left or disconnected
    OpponentLeft { battle_id: String, opponent: String },
}

impl Event {
    pub fn battle_id(&self) -> &str {
        match self {
            Event::BattleStarted { battle_id, .. }
            | Event::Attack { battle_id, .. }
            | Event::Switch { battle_id, .. }
            | Event::OpponentLeft { battle_id, .. } => battle_id,
        }
    }
}

/// Wire name of an effectiveness bucket
pub(crate) fn effectiveness_name(effectiveness: Effectiveness) -> String {
    match effectiveness {
        Effectiveness::NoEffect => "NO_EFFECT",
        Effectiveness::NotVeryEffective => "NOT_VERY_EFFECTIVE",
        Effectiveness::Neutral => "NORMAL",
        Effectiveness::SuperEffective => "SUPER_EFFECTIVE",
    }
    .to_string()
}
