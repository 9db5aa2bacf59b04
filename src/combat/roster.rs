//! Battle-scoped roster state
//!
//! A `Side` owns its `RosterSlot`s exclusively. HP is tracked per slot;
//! a slot is fainted exactly when its HP is zero.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use super::species::{moves_for, Move, Species};

/// Largest roster a side may bring
pub const MAX_ROSTER: usize = 6;

/// Roster construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("roster is empty")]
    Empty,

    #[error("roster has {0} slots (max {max})", max = MAX_ROSTER)]
    TooLarge(usize),
}

/// Reasons a switch is refused
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SwitchError {
    #[error("no roster slot at index {0}")]
    OutOfRange(usize),

    #[error("slot {0} has fainted")]
    Fainted(usize),

    #[error("slot {0} is already battling")]
    AlreadyActive(usize),
}

/// One species placed into battle
#[derive(Debug, Clone)]
pub struct RosterSlot {
    species: Arc<Species>,
    moves: Vec<Move>,
    current_hp: u32,
    max_hp: u32,
    fainted: bool,
}

impl RosterSlot {
    /// Create a full-health slot with moves derived from the species
    pub fn new(species: Arc<Species>) -> Self {
        let max_hp = species.max_hp();
        let moves = moves_for(&species);
        Self {
            species,
            moves,
            current_hp: max_hp,
            max_hp,
            fainted: false,
        }
    }

    pub fn species(&self) -> &Species {
        &self.species
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn current_hp(&self) -> u32 {
        self.current_hp
    }

    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    pub fn is_fainted(&self) -> bool {
        self.fainted
    }

    /// Apply damage, clamped to the remaining HP.
    ///
    /// Returns the HP actually removed; a fainted slot takes nothing.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        if self.fainted {
            return 0;
        }
        let applied = amount.min(self.current_hp);
        self.current_hp -= applied;
        if self.current_hp == 0 {
            self.fainted = true;
        }
        applied
    }

    /// Restore HP up to the maximum. No-op on a fainted slot.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if self.fainted {
            return 0;
        }
        let actual = amount.min(self.max_hp - self.current_hp);
        self.current_hp += actual;
        actual
    }

    /// Public view of this slot
    pub fn summary(&self) -> SlotSummary {
        SlotSummary {
            species_id: self.species.id,
            name: self.species.name.clone(),
            current_hp: self.current_hp,
            max_hp: self.max_hp,
            fainted: self.fainted,
        }
    }
}

/// Serializable view of a roster slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSummary {
    pub species_id: u32,
    pub name: String,
    pub current_hp: u32,
    pub max_hp: u32,
    pub fainted: bool,
}

/// One combatant's team
#[derive(Debug, Clone)]
pub struct Side {
    trainer: String,
    slots: Vec<RosterSlot>,
    active_index: usize,
}

impl Side {
    /// Build a side from 1..=6 slots; the first slot starts active
    pub fn new(trainer: &str, slots: Vec<RosterSlot>) -> Result<Self, RosterError> {
        if slots.is_empty() {
            return Err(RosterError::Empty);
        }
        if slots.len() > MAX_ROSTER {
            return Err(RosterError::TooLarge(slots.len()));
        }
        Ok(Self {
            trainer: trainer.to_string(),
            slots,
            active_index: 0,
        })
    }

    /// Build a side straight from catalog species
    pub fn from_species(trainer: &str, team: &[Arc<Species>]) -> Result<Self, RosterError> {
        let slots = team.iter().cloned().map(RosterSlot::new).collect();
        Self::new(trainer, slots)
    }

    pub fn trainer(&self) -> &str {
        &self.trainer
    }

    pub fn slots(&self) -> &[RosterSlot] {
        &self.slots
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active(&self) -> &RosterSlot {
        &self.slots[self.active_index]
    }

    pub fn active_mut(&mut self) -> &mut RosterSlot {
        &mut self.slots[self.active_index]
    }

    /// True once every slot has fainted
    pub fn is_defeated(&self) -> bool {
        self.slots.iter().all(RosterSlot::is_fainted)
    }

    /// Check whether `index` is a legal switch target
    pub fn check_switch(&self, index: usize) -> Result<(), SwitchError> {
        let slot = self.slots.get(index).ok_or(SwitchError::OutOfRange(index))?;
        if slot.is_fainted() {
            return Err(SwitchError::Fainted(index));
        }
        if index == self.active_index {
            return Err(SwitchError::AlreadyActive(index));
        }
        Ok(())
    }

    /// Make `index` the active slot. Nothing changes on error.
    pub fn switch_to(&mut self, index: usize) -> Result<(), SwitchError> {
        self.check_switch(index)?;
        self.active_index = index;
        Ok(())
    }

    /// Index of the first slot still able to battle
    pub fn first_healthy(&self) -> Option<usize> {
        self.slots.iter().position(|s| !s.is_fainted())
    }
}
