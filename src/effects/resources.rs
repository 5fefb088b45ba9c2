//! Resource ledger effects: put, take, move and flip.

use std::any::Any;

use crate::effect::{Effect, EffectKind, FailReason};
use crate::game_state::GameState;
use crate::ids::{EntityId, PlayerId};
use crate::ledger::ResourceKind;

/// Put resources onto an entity (from the bank).
#[derive(Debug, Clone, PartialEq)]
pub struct PutResourcesEffect {
    pub target: EntityId,
    pub kind: ResourceKind,
    pub amount: u32,
    /// Actual amount placed, recorded at resolution.
    placed: u32,
}

impl PutResourcesEffect {
    pub fn new(target: EntityId, kind: ResourceKind, amount: u32) -> Self {
        Self {
            target,
            kind,
            amount,
            placed: 0,
        }
    }
}

impl Effect for PutResourcesEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::PutResources
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        let entity = game.entity_mut(self.target)?;
        self.placed = entity.ledger.put_resource(self.kind, self.amount);
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        if let Ok(entity) = game.entity_mut(self.target) {
            entity.ledger.take_resource(self.kind, self.placed);
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

/// Take resources from an entity (to the bank).
///
/// In saturating mode a short take is a soft failure: the effect resolves
/// and records the lesser amount. In required mode (cost payment) a short
/// take is a domain failure and nothing is mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct TakeResourcesEffect {
    pub target: EntityId,
    pub kind: ResourceKind,
    pub amount: u32,
    pub required: bool,
    pub by: Option<PlayerId>,
    /// Actual amount taken, recorded at resolution.
    taken: u32,
}

impl TakeResourcesEffect {
    /// Saturating take.
    pub fn new(target: EntityId, kind: ResourceKind, amount: u32) -> Self {
        Self {
            target,
            kind,
            amount,
            required: false,
            by: None,
            taken: 0,
        }
    }

    /// Required take: failing to pay in full aborts the enclosing decision.
    pub fn required(target: EntityId, kind: ResourceKind, amount: u32, by: PlayerId) -> Self {
        Self {
            target,
            kind,
            amount,
            required: true,
            by: Some(by),
            taken: 0,
        }
    }
}

impl Effect for TakeResourcesEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::TakeResources
    }

    fn player(&self) -> Option<PlayerId> {
        self.by
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        let entity = game.entity_mut(self.target)?;
        let available = entity.ledger.resource(self.kind);
        if self.required && available < self.amount {
            return Err(FailReason::CannotAfford {
                entity: self.target,
                kind: self.kind,
                needed: self.amount,
                available,
            });
        }
        self.taken = entity.ledger.take_resource(self.kind, self.amount);
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        if let Ok(entity) = game.entity_mut(self.target) {
            entity.ledger.put_resource(self.kind, self.taken);
        }
    }

    fn actual(&self) -> u32 {
        self.taken
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Move resources between two entities: take on the source, put of the
/// actually-taken amount on the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveResourcesEffect {
    pub from: EntityId,
    pub to: EntityId,
    pub kind: ResourceKind,
    pub amount: u32,
    pub by: Option<PlayerId>,
    /// Actual amount moved, recorded at resolution.
    moved: u32,
}

impl MoveResourcesEffect {
    pub fn new(from: EntityId, to: EntityId, kind: ResourceKind, amount: u32) -> Self {
        Self {
            from,
            to,
            kind,
            amount,
            by: None,
            moved: 0,
        }
    }

    pub fn by(mut self, player: PlayerId) -> Self {
        self.by = Some(player);
        self
    }
}

impl Effect for MoveResourcesEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::MoveResources
    }

    fn player(&self) -> Option<PlayerId> {
        self.by
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        // Validate both endpoints before touching either ledger.
        game.entity(self.to)?;
        let taken = game
            .entity_mut(self.from)?
            .ledger
            .take_resource(self.kind, self.amount);
        game.entity_mut(self.to)?.ledger.put_resource(self.kind, taken);
        self.moved = taken;
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        if let Ok(entity) = game.entity_mut(self.to) {
            entity.ledger.take_resource(self.kind, self.moved);
        }
        if let Ok(entity) = game.entity_mut(self.from) {
            entity.ledger.put_resource(self.kind, self.moved);
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

/// Flip secrets on an entity between face-up and face-down.
///
/// Modeled as a move between the `Secret` and `FlippedSecret` kinds on the
/// same ledger, not a flag toggle, so it participates in the same undo
/// machinery as every other ledger mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct FlipSecretsEffect {
    pub target: EntityId,
    pub amount: u32,
    /// True flips face-up secrets down; false turns them back up.
    pub face_down: bool,
    moved: u32,
}

impl FlipSecretsEffect {
    pub fn flip_down(target: EntityId, amount: u32) -> Self {
        Self {
            target,
            amount,
            face_down: true,
            moved: 0,
        }
    }

    pub fn flip_up(target: EntityId, amount: u32) -> Self {
        Self {
            target,
            amount,
            face_down: false,
            moved: 0,
        }
    }

    fn kinds(&self) -> (ResourceKind, ResourceKind) {
        if self.face_down {
            (ResourceKind::Secret, ResourceKind::FlippedSecret)
        } else {
            (ResourceKind::FlippedSecret, ResourceKind::Secret)
        }
    }
}

impl Effect for FlipSecretsEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::FlipSecrets
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        let (from, to) = self.kinds();
        let ledger = &mut game.entity_mut(self.target)?.ledger;
        let taken = ledger.take_resource(from, self.amount);
        ledger.put_resource(to, taken);
        self.moved = taken;
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        let (from, to) = self.kinds();
        if let Ok(entity) = game.entity_mut(self.target) {
            entity.ledger.take_resource(to, self.moved);
            entity.ledger.put_resource(from, self.moved);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityKind};
    use crate::powers::PowerRegistry;

    fn game_with_entity(favor: u32, secrets: u32) -> (GameState, EntityId) {
        let mut game = GameState::new(7, PowerRegistry::empty());
        let id = game.alloc_id();
        let mut entity = Entity::new(id, EntityKind::Site, "Harbor");
        entity.ledger.put_resource(ResourceKind::Favor, favor);
        entity.ledger.put_resource(ResourceKind::Secret, secrets);
        game.insert(entity).unwrap();
        (game, id)
    }

    #[test]
    fn test_take_records_actual_for_exact_revert() {
        let (mut game, id) = game_with_entity(2, 0);
        let mut effect = TakeResourcesEffect::new(id, ResourceKind::Favor, 5);
        effect.resolve(&mut game).unwrap();
        assert_eq!(effect.actual(), 2);
        assert_eq!(game.entity(id).unwrap().ledger.resource(ResourceKind::Favor), 0);
        effect.revert(&mut game);
        assert_eq!(game.entity(id).unwrap().ledger.resource(ResourceKind::Favor), 2);
    }

    #[test]
    fn test_required_take_fails_without_mutating() {
        let (mut game, id) = game_with_entity(2, 0);
        let player = game.add_player("Ada");
        let mut effect = TakeResourcesEffect::required(id, ResourceKind::Favor, 5, player);
        let err = effect.resolve(&mut game).unwrap_err();
        assert!(matches!(err, FailReason::CannotAfford { needed: 5, available: 2, .. }));
        assert_eq!(game.entity(id).unwrap().ledger.resource(ResourceKind::Favor), 2);
    }

    #[test]
    fn test_move_reverts_using_actual_amount() {
        let (mut game, from) = game_with_entity(3, 0);
        let to = game.alloc_id();
        game.insert(Entity::new(to, EntityKind::Site, "Keep")).unwrap();

        let mut effect = MoveResourcesEffect::new(from, to, ResourceKind::Favor, 10);
        effect.resolve(&mut game).unwrap();
        assert_eq!(effect.actual(), 3);
        assert_eq!(game.entity(to).unwrap().ledger.resource(ResourceKind::Favor), 3);

        effect.revert(&mut game);
        assert_eq!(game.entity(from).unwrap().ledger.resource(ResourceKind::Favor), 3);
        assert_eq!(game.entity(to).unwrap().ledger.resource(ResourceKind::Favor), 0);
    }

    #[test]
    fn test_flip_is_a_move_between_kinds() {
        let (mut game, id) = game_with_entity(0, 2);
        let mut effect = FlipSecretsEffect::flip_down(id, 1);
        effect.resolve(&mut game).unwrap();
        let ledger = &game.entity(id).unwrap().ledger;
        assert_eq!(ledger.resource(ResourceKind::Secret), 1);
        assert_eq!(ledger.resource(ResourceKind::FlippedSecret), 1);
        assert_eq!(ledger.total_resources(), 2);

        effect.revert(&mut game);
        let ledger = &game.entity(id).unwrap().ledger;
        assert_eq!(ledger.resource(ResourceKind::Secret), 2);
        assert_eq!(ledger.resource(ResourceKind::FlippedSecret), 0);
    }
}
