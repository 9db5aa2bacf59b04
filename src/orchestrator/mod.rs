//! Combat orchestrator
//!
//! Single-call battle operations shared by the networked server and any
//! local single-process mode. Every operation validates phase and turn
//! ownership first; a rejected operation leaves the encounter untouched.

use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::combat::{
    roll_damage, DamageResult, Encounter, ImmunityPolicy, Phase, SwitchError, TurnSide,
};

/// Why an action was refused. None of these are fatal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionRejected {
    #[error("the battle is already over")]
    BattleOver,

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("a fainted pokemon must be replaced first")]
    MustSwitch,

    #[error("no action allowed during {0:?}")]
    WrongPhase(Phase),

    #[error("no move at index {0}")]
    InvalidMove(usize),

    #[error(transparent)]
    InvalidSwitch(#[from] SwitchError),
}

/// Result of a successful move
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub attacker: TurnSide,
    pub move_name: String,
    /// HP actually removed from the target
    pub damage: u32,
    pub calculation: DamageResult,
    pub target_fainted: bool,
    pub message: String,
    /// Side whose turn it is afterwards
    pub next_turn: TurnSide,
    pub winner: Option<TurnSide>,
}

/// Result of a successful switch
#[derive(Debug, Clone)]
pub struct SwitchOutcome {
    pub side: TurnSide,
    pub index: usize,
    /// Replacement after a faint (does not use up the turn)
    pub forced: bool,
    pub message: String,
    pub next_turn: TurnSide,
}

/// Executes battle actions against an encounter
#[derive(Debug, Clone, Copy, Default)]
pub struct Orchestrator {
    policy: ImmunityPolicy,
}

impl Orchestrator {
    /// Create an orchestrator with the given immunity policy
    pub fn new(policy: ImmunityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ImmunityPolicy {
        self.policy
    }

    /// Check that `actor` may attack right now
    fn ensure_can_attack(encounter: &Encounter, actor: TurnSide) -> Result<(), ActionRejected> {
        if encounter.is_terminal() {
            return Err(ActionRejected::BattleOver);
        }
        if actor != encounter.current_turn() {
            return Err(ActionRejected::NotYourTurn);
        }
        match encounter.phase() {
            Phase::WaitingForAction => Ok(()),
            Phase::PokemonFainted => Err(ActionRejected::MustSwitch),
            other => Err(ActionRejected::WrongPhase(other)),
        }
    }

    /// Use the move at `move_index` of the actor's active slot
    pub fn apply_move<R: Rng + ?Sized>(
        &self,
        encounter: &mut Encounter,
        actor: TurnSide,
        move_index: usize,
        rng: &mut R,
    ) -> Result<MoveOutcome, ActionRejected> {
        Self::ensure_can_attack(encounter, actor)?;

        let mv = encounter
            .side(actor)
            .active()
            .moves()
            .get(move_index)
            .cloned()
            .ok_or(ActionRejected::InvalidMove(move_index))?;

        encounter.set_phase(Phase::ExecutingMove);

        let (attacking, defending) = encounter.sides_mut(actor);
        let attacker = attacking.active().species().clone();
        let target = defending.active_mut();
        let calculation = roll_damage(&attacker, target.species(), &mv, rng, self.policy);
        let damage = target.take_damage(calculation.damage);
        let target_fainted = target.is_fainted();
        let target_name = target.species().name.clone();

        let mut message = format!(
            "{} used {}! {} took {} damage.",
            attacker.name, mv.name, target_name, damage
        );
        if let Some(qualifier) = calculation.effectiveness().qualifier() {
            message.push(' ');
            message.push_str(qualifier);
        }
        if target_fainted {
            message.push_str(&format!(" {} fainted!", target_name));
        }

        // The defender acts next: a forced switch if it fainted, a normal
        // turn otherwise.
        encounter.set_turn(actor.other());
        encounter.set_phase(if target_fainted {
            Phase::PokemonFainted
        } else {
            Phase::WaitingForAction
        });
        encounter.set_message(message);

        debug!(
            attacker = ?actor,
            move_name = %mv.name,
            damage,
            multiplier = calculation.multiplier,
            target_fainted,
            "move applied"
        );

        self.check_termination(encounter);

        Ok(MoveOutcome {
            attacker: actor,
            move_name: mv.name,
            damage,
            calculation,
            target_fainted,
            message: encounter.last_message().to_string(),
            next_turn: encounter.current_turn(),
            winner: encounter.winner(),
        })
    }

    /// Let the AI-controlled side attack with a uniformly random move
    pub fn apply_enemy_turn<R: Rng + ?Sized>(
        &self,
        encounter: &mut Encounter,
        ai: TurnSide,
        rng: &mut R,
    ) -> Result<MoveOutcome, ActionRejected> {
        Self::ensure_can_attack(encounter, ai)?;
        let count = encounter.side(ai).active().moves().len();
        let index = rng.random_range(0..count);
        self.apply_move(encounter, ai, index, rng)
    }

    /// Switch the actor's active slot.
    ///
    /// During `PokemonFainted` this is the forced replacement and the actor
    /// keeps the turn; otherwise the switch uses up the actor's turn.
    pub fn switch_active(
        &self,
        encounter: &mut Encounter,
        actor: TurnSide,
        index: usize,
    ) -> Result<SwitchOutcome, ActionRejected> {
        if encounter.is_terminal() {
            return Err(ActionRejected::BattleOver);
        }
        if actor != encounter.current_turn() {
            return Err(ActionRejected::NotYourTurn);
        }
        let forced = match encounter.phase() {
            Phase::PokemonFainted => true,
            Phase::WaitingForAction => false,
            other => return Err(ActionRejected::WrongPhase(other)),
        };
        encounter.side(actor).check_switch(index)?;

        encounter.set_phase(Phase::SwitchingPokemon);
        let side = encounter.side_mut(actor);
        side.switch_to(index)?;
        let message = format!("{} sent out {}!", side.trainer(), side.active().species().name);

        let next_turn = if forced { actor } else { actor.other() };
        encounter.set_turn(next_turn);
        encounter.set_phase(Phase::WaitingForAction);
        encounter.set_message(message.clone());

        debug!(side = ?actor, index, forced, "active slot switched");

        self.check_termination(encounter);

        Ok(SwitchOutcome {
            side: actor,
            index,
            forced,
            message,
            next_turn,
        })
    }

    /// End the battle if either side is defeated. Idempotent.
    pub fn check_termination(&self, encounter: &mut Encounter) -> bool {
        if encounter.is_terminal() {
            return true;
        }

        let winner = if encounter.side(TurnSide::A).is_defeated() {
            TurnSide::B
        } else if encounter.side(TurnSide::B).is_defeated() {
            TurnSide::A
        } else {
            return false;
        };

        let message = format!(
            "{} {} wins the battle!",
            encounter.last_message(),
            encounter.side(winner).trainer()
        );
        encounter.set_message(message.trim_start().to_string());
        encounter.finish(winner);
        true
    }
}
