//! Hypothetical state: cheap copies for lookahead.
//!
//! A preview is a clone of the canonical state that can be freely mutated
//! through the same effect machinery, for AI lookahead and "what would
//! this cost" queries. It is deliberately a distinct type: nothing taking
//! `&mut GameState` accepts a `Preview`, so hypothetical results cannot be
//! committed by accident. Ids allocated inside a preview stay inside it —
//! the arena counter travels with the clone.

use std::ops::Deref;

use crate::effect::{Effect, FailReason};
use crate::game_state::GameState;

/// A mutable hypothetical copy of the game.
#[derive(Debug, Clone)]
pub struct Preview {
    state: GameState,
}

impl Preview {
    /// Resolve an effect against the copy, discarding its undo record.
    /// Returns the actual quantity moved, like the real resolution path.
    pub fn apply(&mut self, mut effect: Box<dyn Effect>) -> Result<u32, FailReason> {
        effect.resolve(&mut self.state)?;
        Ok(effect.actual())
    }
}

impl Deref for Preview {
    type Target = GameState;

    fn deref(&self) -> &GameState {
        &self.state
    }
}

impl GameState {
    /// Clone the canonical state into a hypothetical copy.
    pub fn preview(&self) -> Preview {
        Preview {
            state: self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::PutResourcesEffect;
    use crate::entity::{Entity, EntityKind};
    use crate::ledger::ResourceKind;
    use crate::powers::PowerRegistry;

    #[test]
    fn test_preview_mutations_never_reach_canonical_state() {
        let mut game = GameState::new(3, PowerRegistry::empty());
        let site = game.alloc_id();
        game.insert(Entity::new(site, EntityKind::Site, "Harbor"))
            .unwrap();

        let mut preview = game.preview();
        let moved = preview
            .apply(Box::new(PutResourcesEffect::new(site, ResourceKind::Favor, 4)))
            .unwrap();
        assert_eq!(moved, 4);
        assert_eq!(
            preview.entity(site).unwrap().ledger.resource(ResourceKind::Favor),
            4
        );
        assert_eq!(
            game.entity(site).unwrap().ledger.resource(ResourceKind::Favor),
            0
        );
    }

    #[test]
    fn test_preview_allocator_travels_with_the_clone() {
        let mut game = GameState::new(3, PowerRegistry::empty());
        game.alloc_id();
        let preview = game.preview();
        let mut copy = preview.state.clone();
        // Both allocators continue from the same point, independently.
        assert_eq!(copy.alloc_id(), game.alloc_id());
    }
}
