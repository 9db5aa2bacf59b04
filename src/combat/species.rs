//! Catalog entities: species and moves
//!
//! Both are immutable once built. Moves are not stored anywhere; each
//! roster slot derives its four moves from its species types when an
//! encounter is created.

use serde::{Deserialize, Serialize};

use super::types::Type;

/// Fixed battle level assumed by the damage formula
pub const BATTLE_LEVEL: u32 = 50;

/// Number of moves every roster slot carries
pub const MOVES_PER_SLOT: usize = 4;

/// The six base stats of a species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub sp_attack: u32,
    pub sp_defense: u32,
    pub speed: u32,
}

/// A species from the read-only catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub id: u32,
    pub name: String,
    pub type1: Type,
    pub type2: Option<Type>,
    pub stats: BaseStats,
}

impl Species {
    /// Create a new species
    pub fn new(id: u32, name: &str, type1: Type, type2: Option<Type>, stats: BaseStats) -> Self {
        Self {
            id,
            name: name.to_string(),
            type1,
            type2,
            stats,
        }
    }

    /// Maximum HP at the battle level
    pub fn max_hp(&self) -> u32 {
        2 * self.stats.hp * BATTLE_LEVEL / 100 + BATTLE_LEVEL + 10
    }

    /// Whether the species carries the given type
    pub fn has_type(&self, t: Type) -> bool {
        self.type1 == t || self.type2 == Some(t)
    }
}

/// A damaging move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub name: String,
    pub move_type: Type,
    pub power: u32,
    /// Accuracy percentage (informational; hits always land)
    pub accuracy: u32,
}

impl Move {
    /// Create a new move
    pub fn new(name: &str, move_type: Type, power: u32, accuracy: u32) -> Self {
        Self {
            name: name.to_string(),
            move_type,
            power,
            accuracy,
        }
    }
}

/// Static move entry
struct MoveData {
    name: &'static str,
    power: u32,
    accuracy: u32,
}

const fn md(name: &'static str, power: u32, accuracy: u32) -> MoveData {
    MoveData {
        name,
        power,
        accuracy,
    }
}

/// Strong and weak move for each type
fn type_moves(t: Type) -> [MoveData; 2] {
    match t {
        Type::Normal => [md("Body Slam", 85, 100), md("Quick Attack", 40, 100)],
        Type::Fire => [md("Flamethrower", 90, 100), md("Ember", 40, 100)],
        Type::Water => [md("Surf", 90, 100), md("Water Gun", 40, 100)],
        Type::Electric => [md("Thunderbolt", 90, 100), md("Thunder Shock", 40, 100)],
        Type::Grass => [md("Energy Ball", 90, 100), md("Vine Whip", 45, 100)],
        Type::Ice => [md("Ice Beam", 90, 100), md("Powder Snow", 40, 100)],
        Type::Fighting => [md("Brick Break", 75, 100), md("Karate Chop", 50, 100)],
        Type::Poison => [md("Sludge Bomb", 90, 100), md("Poison Sting", 15, 100)],
        Type::Ground => [md("Earthquake", 100, 100), md("Mud-Slap", 20, 100)],
        Type::Flying => [md("Air Slash", 75, 95), md("Gust", 40, 100)],
        Type::Psychic => [md("Psychic", 90, 100), md("Confusion", 50, 100)],
        Type::Bug => [md("X-Scissor", 80, 100), md("Bug Bite", 60, 100)],
        Type::Rock => [md("Rock Slide", 75, 90), md("Rock Throw", 50, 90)],
        Type::Ghost => [md("Shadow Ball", 80, 100), md("Lick", 30, 100)],
        Type::Dragon => [md("Dragon Claw", 80, 100), md("Twister", 40, 100)],
        Type::Dark => [md("Crunch", 80, 100), md("Bite", 60, 100)],
        Type::Steel => [md("Iron Head", 80, 100), md("Metal Claw", 50, 95)],
        Type::Fairy => [md("Moonblast", 95, 100), md("Fairy Wind", 40, 100)],
    }
}

fn build(data: &MoveData, t: Type) -> Move {
    Move::new(data.name, t, data.power, data.accuracy)
}

/// Derive the four moves of a species.
///
/// Layout: strong and weak `type1` move, strong `type2` move (Headbutt
/// when mono-typed), Tackle.
pub fn moves_for(species: &Species) -> Vec<Move> {
    let [strong, weak] = type_moves(species.type1);
    let coverage = match species.type2 {
        Some(t2) => build(&type_moves(t2)[0], t2),
        None => Move::new("Headbutt", Type::Normal, 70, 100),
    };

    vec![
        build(&strong, species.type1),
        build(&weak, species.type1),
        coverage,
        Move::new("Tackle", Type::Normal, 40, 100),
    ]
}
