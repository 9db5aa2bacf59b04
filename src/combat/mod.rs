//! Combat model
//!
//! Pure battle state and math, no I/O:
//! - Elemental types and the effectiveness chart
//! - Catalog species and derived moves
//! - Roster slots and sides (HP, fainting, switching)
//! - Damage calculation
//! - Encounter state machine

mod damage;
mod encounter;
mod roster;
mod species;
mod types;

pub use damage::{
    base_damage, calculate_damage, roll_damage, DamageResult, Effectiveness, ImmunityPolicy,
    RANDOM_MAX, RANDOM_MIN, STAB_MULTIPLIER,
};
pub use encounter::{BattleSnapshot, Encounter, Phase, SideSnapshot, TurnSide};
pub use roster::{RosterError, RosterSlot, Side, SlotSummary, SwitchError, MAX_ROSTER};
pub use species::{moves_for, BaseStats, Move, Species, BATTLE_LEVEL, MOVES_PER_SLOT};
pub use types::{effectiveness, Type, TYPE_CHART};
