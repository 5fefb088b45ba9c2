//! The dice-roll effect.
//!
//! Rolling is a non-revertible "read" effect: `revert` is a no-op, and a
//! retried roll step simply rolls again. The rolled faces are written into
//! the active battle so later steps (and modifiers) can value them.

use std::any::Any;

use crate::dice::{roll_attack, roll_defense};
use crate::effect::{Effect, EffectKind, FailReason};
use crate::game_state::GameState;

/// Which pool a roll effect fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollPool {
    Attack(u32),
    Defense(u32),
}

/// Roll the attack or defense pool for the active battle.
#[derive(Debug, Clone, PartialEq)]
pub struct RollDiceEffect {
    pub pool: RollPool,
}

impl RollDiceEffect {
    pub fn attack(count: u32) -> Self {
        Self {
            pool: RollPool::Attack(count),
        }
    }

    pub fn defense(count: u32) -> Self {
        Self {
            pool: RollPool::Defense(count),
        }
    }
}

impl Effect for RollDiceEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::RollDice
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        if game.battle.is_none() {
            return Err(FailReason::NoActiveBattle);
        }
        match self.pool {
            RollPool::Attack(count) => {
                let faces = roll_attack(&mut game.rng, count);
                if let Some(battle) = game.battle.as_mut() {
                    battle.attack_faces = Some(faces);
                }
            }
            RollPool::Defense(count) => {
                let faces = roll_defense(&mut game.rng, count);
                if let Some(battle) = game.battle.as_mut() {
                    battle.defense_faces = Some(faces);
                }
            }
        }
        Ok(())
    }

    fn revert(&self, _game: &mut GameState) {
        // Non-revertible read: a retried step rolls afresh.
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
