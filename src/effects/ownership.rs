//! Ownership effects: seizing battle targets and flipping entities.

use std::any::Any;

use crate::effect::{Effect, EffectKind, FailReason};
use crate::entity::EntityKind;
use crate::game_state::GameState;
use crate::ids::{EntityId, PlayerId};

/// Transfer rule of a battle target to the seizing player.
///
/// Sites and banners change ruler in place. Relics additionally move into
/// the seizing player's held relics (leaving their site, if placed).
#[derive(Debug, Clone, PartialEq)]
pub struct SeizeEffect {
    pub target: EntityId,
    pub new_ruler: PlayerId,
    prev_ruler: Option<PlayerId>,
    prev_holder: Option<PlayerId>,
    prev_site: Option<EntityId>,
    resolved: bool,
}

impl SeizeEffect {
    pub fn new(target: EntityId, new_ruler: PlayerId) -> Self {
        Self {
            target,
            new_ruler,
            prev_ruler: None,
            prev_holder: None,
            prev_site: None,
            resolved: false,
        }
    }
}

impl Effect for SeizeEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::Seize
    }

    fn player(&self) -> Option<PlayerId> {
        Some(self.new_ruler)
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        let kind = game.entity(self.target)?.kind;
        // The seizing player must exist before any ownership is rewritten.
        game.player(self.new_ruler)?;
        self.prev_holder = game.relic_holder(self.target);

        let entity = game.entity_mut(self.target)?;
        self.prev_ruler = entity.ruler;
        self.prev_site = entity.site;
        entity.ruler = Some(self.new_ruler);

        if kind == EntityKind::Relic {
            game.entity_mut(self.target)?.site = None;
            if let Some(holder) = self.prev_holder {
                game.player_mut(holder)?.relics.retain(|r| *r != self.target);
            }
            game.player_mut(self.new_ruler)?.relics.push(self.target);
        }
        self.resolved = true;
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        if !self.resolved {
            return;
        }
        if let Ok(entity) = game.entity_mut(self.target) {
            entity.ruler = self.prev_ruler;
            entity.site = self.prev_site;
        }
        let is_relic = game
            .entity(self.target)
            .map(|e| e.kind == EntityKind::Relic)
            .unwrap_or(false);
        if is_relic {
            if let Ok(p) = game.player_mut(self.new_ruler) {
                p.relics.retain(|r| *r != self.target);
            }
            if let Some(holder) = self.prev_holder
                && let Ok(p) = game.player_mut(holder)
            {
                p.relics.push(self.target);
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

/// Turn an entity face up or face down, with exact restore on revert.
#[derive(Debug, Clone, PartialEq)]
pub struct SetFaceUpEffect {
    pub target: EntityId,
    pub face_up: bool,
    previous: Option<bool>,
}

impl SetFaceUpEffect {
    pub fn new(target: EntityId, face_up: bool) -> Self {
        Self {
            target,
            face_up,
            previous: None,
        }
    }
}

impl Effect for SetFaceUpEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::SetFaceUp
    }

    fn resolve(&mut self, game: &mut GameState) -> Result<(), FailReason> {
        let entity = game.entity_mut(self.target)?;
        self.previous = Some(entity.face_up);
        entity.face_up = self.face_up;
        Ok(())
    }

    fn revert(&self, game: &mut GameState) {
        if let Some(previous) = self.previous
            && let Ok(entity) = game.entity_mut(self.target)
        {
            entity.face_up = previous;
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
    use crate::entity::Entity;
    use crate::powers::PowerRegistry;

    #[test]
    fn test_seize_site_changes_ruler_and_reverts() {
        let mut game = GameState::new(3, PowerRegistry::empty());
        let p0 = game.add_player("Ada");
        let p1 = game.add_player("Brin");
        let site = game.alloc_id();
        game.insert(Entity::new(site, EntityKind::Site, "Harbor").with_ruler(p1))
            .unwrap();

        let mut effect = SeizeEffect::new(site, p0);
        effect.resolve(&mut game).unwrap();
        assert_eq!(game.entity(site).unwrap().ruler, Some(p0));
        effect.revert(&mut game);
        assert_eq!(game.entity(site).unwrap().ruler, Some(p1));
    }

    #[test]
    fn test_seize_relic_moves_between_holders() {
        let mut game = GameState::new(3, PowerRegistry::empty());
        let p0 = game.add_player("Ada");
        let p1 = game.add_player("Brin");
        let relic = game.alloc_id();
        game.insert(Entity::new(relic, EntityKind::Relic, "Grand Mask").with_ruler(p1))
            .unwrap();
        game.player_mut(p1).unwrap().relics.push(relic);

        let mut effect = SeizeEffect::new(relic, p0);
        effect.resolve(&mut game).unwrap();
        assert!(game.player(p0).unwrap().relics.contains(&relic));
        assert!(!game.player(p1).unwrap().relics.contains(&relic));

        effect.revert(&mut game);
        assert!(game.player(p1).unwrap().relics.contains(&relic));
        assert!(!game.player(p0).unwrap().relics.contains(&relic));
        assert_eq!(game.entity(relic).unwrap().ruler, Some(p1));
    }

    #[test]
    fn test_seize_by_unknown_player_changes_nothing() {
        let mut game = GameState::new(3, PowerRegistry::empty());
        let p1 = game.add_player("Brin");
        let relic = game.alloc_id();
        game.insert(Entity::new(relic, EntityKind::Relic, "Grand Mask").with_ruler(p1))
            .unwrap();
        game.player_mut(p1).unwrap().relics.push(relic);

        let ghost = PlayerId::from_index(7);
        let mut effect = SeizeEffect::new(relic, ghost);
        assert_eq!(
            effect.resolve(&mut game).unwrap_err(),
            FailReason::PlayerNotFound(ghost)
        );
        assert_eq!(game.entity(relic).unwrap().ruler, Some(p1));
        assert!(game.player(p1).unwrap().relics.contains(&relic));
    }

    #[test]
    fn test_set_face_up_round_trip() {
        let mut game = GameState::new(3, PowerRegistry::empty());
        let id = game.alloc_id();
        game.insert(Entity::new(id, EntityKind::Denizen, "Mill").face_down())
            .unwrap();

        let mut effect = SetFaceUpEffect::new(id, true);
        effect.resolve(&mut game).unwrap();
        assert!(game.entity(id).unwrap().face_up);
        effect.revert(&mut game);
        assert!(!game.entity(id).unwrap().face_up);
    }
}
