//! Damage calculation
//!
//! ```text
//! effectiveness = mult(move, def.type1) * mult(move, def.type2 or 1)
//! stab          = 1.5 if the attacker shares the move type, else 1.0
//! random        ∈ [0.85, 1.00)
//! raw           = ((2*50/5 + 2) * power * attack / defense) / 50 + 2
//! damage        = max(1, floor(raw * effectiveness * stab * random))
//! ```
//!
//! The `max(1, ...)` floor would let a 0x hit deal damage. Whether it does
//! is decided by [`ImmunityPolicy`].

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::species::{Move, Species, BATTLE_LEVEL};
use super::types::effectiveness;

/// Lower bound of the per-hit random factor
pub const RANDOM_MIN: f64 = 0.85;

/// Upper bound (exclusive) of the per-hit random factor
pub const RANDOM_MAX: f64 = 1.0;

/// Same-type attack bonus
pub const STAB_MULTIPLIER: f64 = 1.5;

/// How a hit with a 0x type multiplier is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImmunityPolicy {
    /// Immune targets take exactly 0 damage
    #[default]
    Zero,
    /// Every hit deals at least 1, immunity included
    MinimumOne,
}

/// Coarse effectiveness bucket used in battle messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Effectiveness {
    NoEffect,
    NotVeryEffective,
    Neutral,
    SuperEffective,
}

impl Effectiveness {
    /// Classify a type multiplier
    pub fn from_multiplier(multiplier: f64) -> Self {
        if multiplier == 0.0 {
            Effectiveness::NoEffect
        } else if multiplier < 1.0 {
            Effectiveness::NotVeryEffective
        } else if multiplier > 1.0 {
            Effectiveness::SuperEffective
        } else {
            Effectiveness::Neutral
        }
    }

    /// Qualifier appended to the hit text, if any
    pub fn qualifier(&self) -> Option<&'static str> {
        match self {
            Effectiveness::NoEffect => Some("It had no effect..."),
            Effectiveness::NotVeryEffective => Some("It's not very effective..."),
            Effectiveness::Neutral => None,
            Effectiveness::SuperEffective => Some("It's super effective!"),
        }
    }
}

/// Result of a damage calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageResult {
    /// Final damage before HP clamping
    pub damage: u32,
    /// Combined type multiplier
    pub multiplier: f64,
    /// Whether STAB applied
    pub stab: bool,
    /// Random factor used for this hit
    pub random_factor: f64,
}

impl DamageResult {
    pub fn effectiveness(&self) -> Effectiveness {
        Effectiveness::from_multiplier(self.multiplier)
    }
}

/// Unmodified damage before type, STAB and random factors
pub fn base_damage(power: u32, attack: u32, defense: u32) -> f64 {
    let level_factor = 2.0 * BATTLE_LEVEL as f64 / 5.0 + 2.0;
    let defense = defense.max(1) as f64;
    (level_factor * power as f64 * attack as f64 / defense) / 50.0 + 2.0
}

/// Compute damage with an explicit random factor
pub fn calculate_damage(
    attacker: &Species,
    defender: &Species,
    mv: &Move,
    random_factor: f64,
    policy: ImmunityPolicy,
) -> DamageResult {
    let multiplier = effectiveness(mv.move_type, defender.type1, defender.type2);
    let stab = attacker.has_type(mv.move_type);
    let stab_factor = if stab { STAB_MULTIPLIER } else { 1.0 };

    let raw = base_damage(mv.power, attacker.stats.attack, defender.stats.defense);
    let scaled = (raw * multiplier * stab_factor * random_factor).floor() as u32;

    let damage = match policy {
        ImmunityPolicy::Zero if multiplier == 0.0 => 0,
        _ => scaled.max(1),
    };

    DamageResult {
        damage,
        multiplier,
        stab,
        random_factor,
    }
}

/// Compute damage, sampling the random factor from `rng`
pub fn roll_damage<R: Rng + ?Sized>(
    attacker: &Species,
    defender: &Species,
    mv: &Move,
    rng: &mut R,
    policy: ImmunityPolicy,
) -> DamageResult {
    let random_factor = rng.random_range(RANDOM_MIN..RANDOM_MAX);
    calculate_damage(attacker, defender, mv, random_factor, policy)
}
