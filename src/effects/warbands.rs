//! Warband ledger effects: mustering, movement and battle losses.

use std::any::Any;

use crate::effect::{Effect, EffectKind, FailReason};
use crate::game_state::GameState;
use crate::ids::{EntityId, PlayerId};
use crate::ledger::WarbandOwner;

/// Put warbands onto an entity (from the supply).
#[derive(Debug, Clone, PartialEq)]
pub struct PutWarbandsEffect {
    pub target: EntityId,
    pub owner: WarbandOwner,
    pub amount: u32,
    placed: u32,
}

impl PutWarbandsEffect {
    pub fn new(target: EntityId, owner: WarbandOwner, amount: u32) -> Self {
        Self {
            target,
            owner,
            amount,
            placed: 0,
        }
    }
}

impl Effect for PutWarbandsEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::PutWarbands
    }

    fn player(&self) -> Option<PlayerId> {
        self.owner
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        let entity = game.entity_mut(self.target)?;
        self.placed = entity.ledger.put_warbands(self.owner, self.amount);
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        if let Ok(entity) = game.entity_mut(self.target) {
            entity.ledger.take_warbands(self.owner, self.placed);
        }
    }

    fn actual(&self) -> u32 {
        self.placed
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Move warbands between two entities, saturating at the source balance.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveWarbandsEffect {
    pub from: EntityId,
    pub to: EntityId,
    pub owner: WarbandOwner,
    pub amount: u32,
    moved: u32,
}

impl MoveWarbandsEffect {
    pub fn new(from: EntityId, to: EntityId, owner: WarbandOwner, amount: u32) -> Self {
        Self {
            from,
            to,
            owner,
            amount,
            moved: 0,
        }
    }
}

impl Effect for MoveWarbandsEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::MoveWarbands
    }

    fn player(&self) -> Option<PlayerId> {
        self.owner
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        game.entity(self.to)?;
        let taken = game
            .entity_mut(self.from)?
            .ledger
            .take_warbands(self.owner, self.amount);
        game.entity_mut(self.to)?.ledger.put_warbands(self.owner, taken);
        self.moved = taken;
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        if let Ok(entity) = game.entity_mut(self.to) {
            entity.ledger.take_warbands(self.owner, self.moved);
        }
        if let Ok(entity) = game.entity_mut(self.from) {
            entity.ledger.put_warbands(self.owner, self.moved);
        }
    }

    fn actual(&self) -> u32 {
        self.moved
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Remove warbands as battle losses, drawing from a list of entities in
/// order until the requested amount is satisfied (or every source is empty).
///
/// Records the amount removed per entity so `revert` puts every warband back
/// exactly where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct KillWarbandsEffect {
    pub owner: WarbandOwner,
    pub sources: Vec<EntityId>,
    pub amount: u32,
    removed: Vec<(EntityId, u32)>,
}

impl KillWarbandsEffect {
    pub fn new(owner: WarbandOwner, sources: Vec<EntityId>, amount: u32) -> Self {
        Self {
            owner,
            sources,
            amount,
            removed: Vec::new(),
        }
    }
}

impl Effect for KillWarbandsEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::KillWarbands
    }

    fn player(&self) -> Option<PlayerId> {
        self.owner
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        // Every source must exist before any ledger is touched, so a bad id
        // cannot leave a half-drained ledger behind.
        for &source in &self.sources {
            game.entity(source)?;
        }
        self.removed.clear();
        let mut remaining = self.amount;
        for &source in &self.sources {
            if remaining == 0 {
                break;
            }
            let taken = game
                .entity_mut(source)?
                .ledger
                .take_warbands(self.owner, remaining);
            if taken > 0 {
                self.removed.push((source, taken));
                remaining -= taken;
            }
        }
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        for &(source, taken) in self.removed.iter().rev() {
            if let Ok(entity) = game.entity_mut(source) {
                entity.ledger.put_warbands(self.owner, taken);
            }
        }
    }

    fn actual(&self) -> u32 {
        self.removed.iter().map(|(_, n)| n).sum()
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
