//! Effects that tune the active battle.
//!
//! Powers never poke battle fields directly from their hooks; they issue
//! these effects so their contributions are recorded on the undo frame and
//! come off again when a step is rolled back and retried.

use std::any::Any;

use crate::battle::BattleFlag;
use crate::effect::{Effect, EffectKind, FailReason};
use crate::game_state::GameState;

/// Which side of the battle a bonus applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleSide {
    Attack,
    Defense,
}

/// Add a flat bonus to one side's rolled value.
#[derive(Debug, Clone, PartialEq)]
pub struct BattleBonusEffect {
    pub side: BattleSide,
    pub amount: i32,
    applied: bool,
}

impl BattleBonusEffect {
    pub fn new(side: BattleSide, amount: i32) -> Self {
        Self {
            side,
            amount,
            applied: false,
        }
    }
}

impl Effect for BattleBonusEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::BattleBonus
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        let battle = game.battle.as_mut().ok_or(FailReason::NoActiveBattle)?;
        match self.side {
            BattleSide::Attack => battle.attack_bonus += self.amount,
            BattleSide::Defense => battle.defense_bonus += self.amount,
        }
        self.applied = true;
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        if !self.applied {
            return;
        }
        if let Some(battle) = game.battle.as_mut() {
            match self.side {
                BattleSide::Attack => battle.attack_bonus -= self.amount,
                BattleSide::Defense => battle.defense_bonus -= self.amount,
            }
        }
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Raise one of the battle's loss-modifying flags, restoring the prior
/// value on revert.
#[derive(Debug, Clone, PartialEq)]
pub struct BattleFlagEffect {
    pub flag: BattleFlag,
    previous: Option<bool>,
}

impl BattleFlagEffect {
    pub fn new(flag: BattleFlag) -> Self {
        Self {
            flag,
            previous: None,
        }
    }
}

impl Effect for BattleFlagEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::BattleFlag
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        let battle = game.battle.as_mut().ok_or(FailReason::NoActiveBattle)?;
        self.previous = Some(battle.flag(self.flag));
        battle.set_flag(self.flag, true);
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        if let Some(previous) = self.previous
            && let Some(battle) = game.battle.as_mut()
        {
            battle.set_flag(self.flag, previous);
        }
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Open a battle: install a fresh `BattleResult` as the active battle.
///
/// Issued by the declare-defender step so that a rolled-back declaration
/// leaves no battle behind.
#[derive(Debug, Clone)]
pub struct OpenBattleEffect {
    pub battle: crate::battle::BattleResult,
    previous: Option<crate::battle::BattleResult>,
}

impl OpenBattleEffect {
    pub fn new(battle: crate::battle::BattleResult) -> Self {
        Self {
            battle,
            previous: None,
        }
    }
}

impl Effect for OpenBattleEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::OpenBattle
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        self.previous = game.battle.take();
        game.battle = Some(self.battle.clone());
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        game.battle = self.previous.clone();
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Record the battle plan on the active battle: targets, dice pools and the
/// forces committed by each side.
#[derive(Debug, Clone)]
pub struct BattlePlanEffect {
    pub targets: Vec<crate::ids::EntityId>,
    pub attack_pool: u32,
    pub defense_pool: u32,
    pub defender_force: u32,
    previous: Option<(Vec<crate::ids::EntityId>, u32, u32, u32)>,
}

impl BattlePlanEffect {
    pub fn new(
        targets: Vec<crate::ids::EntityId>,
        attack_pool: u32,
        defense_pool: u32,
        defender_force: u32,
    ) -> Self {
        Self {
            targets,
            attack_pool,
            defense_pool,
            defender_force,
            previous: None,
        }
    }
}

impl Effect for BattlePlanEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::BattlePlan
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        let battle = game.battle.as_mut().ok_or(FailReason::NoActiveBattle)?;
        self.previous = Some((
            std::mem::take(&mut battle.targets),
            battle.attack_pool,
            battle.defense_pool,
            battle.defender_force,
        ));
        battle.targets = self.targets.clone();
        battle.attack_pool = self.attack_pool;
        battle.defense_pool = self.defense_pool;
        battle.defender_force = self.defender_force;
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        if let Some((targets, attack_pool, defense_pool, defender_force)) = &self.previous
            && let Some(battle) = game.battle.as_mut()
        {
            battle.targets = targets.clone();
            battle.attack_pool = *attack_pool;
            battle.defense_pool = *defense_pool;
            battle.defender_force = *defender_force;
        }
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Close the active battle, annotating its final losses and moving it into
/// the battle log.
#[derive(Debug, Clone)]
pub struct CloseBattleEffect {
    pub attacker_losses: u32,
    pub defender_losses: u32,
}

impl CloseBattleEffect {
    pub fn new(attacker_losses: u32, defender_losses: u32) -> Self {
        Self {
            attacker_losses,
            defender_losses,
        }
    }
}

impl Effect for CloseBattleEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::CloseBattle
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        let mut battle = game.battle.take().ok_or(FailReason::NoActiveBattle)?;
        battle.attacker_losses = self.attacker_losses;
        battle.defender_losses = self.defender_losses;
        game.battle_log.push(battle);
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        if let Some(mut battle) = game.battle_log.pop() {
            battle.attacker_losses = 0;
            battle.defender_losses = 0;
            game.battle = Some(battle);
        }
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::BattleResult;
    use crate::ids::PlayerId;
    use crate::powers::PowerRegistry;

    fn game_with_battle() -> GameState {
        let mut game = GameState::new(9, PowerRegistry::empty());
        game.battle = Some(BattleResult::new(PlayerId::from_index(0)));
        game
    }

    #[test]
    fn test_bonus_resolves_and_reverts() {
        let mut game = game_with_battle();
        let mut effect = BattleBonusEffect::new(BattleSide::Attack, 2);
        effect.resolve(&mut game).unwrap();
        assert_eq!(game.battle.as_ref().unwrap().attack_bonus, 2);
        effect.revert(&mut game);
        assert_eq!(game.battle.as_ref().unwrap().attack_bonus, 0);
    }

    #[test]
    fn test_flag_restores_previous_value() {
        let mut game = game_with_battle();
        let mut effect = BattleFlagEffect::new(BattleFlag::DefenderLosesNothing);
        effect.resolve(&mut game).unwrap();
        assert!(game.battle.as_ref().unwrap().flag(BattleFlag::DefenderLosesNothing));
        effect.revert(&mut game);
        assert!(!game.battle.as_ref().unwrap().flag(BattleFlag::DefenderLosesNothing));
    }

    #[test]
    fn test_bonus_without_battle_is_domain_failure() {
        let mut game = GameState::new(9, PowerRegistry::empty());
        let mut effect = BattleBonusEffect::new(BattleSide::Defense, 1);
        assert_eq!(effect.resolve(&mut game).unwrap_err(), FailReason::NoActiveBattle);
    }
}
