//! Identifier newtypes for players, entities and card definitions.
//!
//! `EntityId` is the canonical identifier: every mutating operation in the
//! engine takes an explicit `EntityId` resolved against the canonical arena,
//! so code holding a preview copy of the state can never mutate the copy by
//! accident (see the `preview` module).

/// Player identifier, index-based for efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Create a player ID from a specific index.
    pub fn from_index(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable entity identifier, allocated by the arena.
///
/// Ids are monotonically increasing per game (the arena owns the counter,
/// not a global atomic) so a preview clone never allocates an id that
/// collides with a canonical one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl EntityId {
    /// Create an entity ID from a specific value (for when you need explicit control).
    pub fn from_raw(id: u32) -> Self {
        Self(id)
    }
}

/// Card definition identifier, references static card data in the power registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct CardId(pub u32);

impl CardId {
    /// Create a card ID from a specific value.
    pub fn from_raw(id: u32) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_from_index() {
        let p1 = PlayerId::from_index(5);
        let p2 = PlayerId::from_index(10);
        assert_eq!(p1.index(), 5);
        assert_eq!(p2.index(), 10);
    }

    #[test]
    fn test_entity_id_from_raw() {
        let e1 = EntityId::from_raw(100);
        let e2 = EntityId::from_raw(200);
        assert_ne!(e1, e2);
        assert_eq!(e1.0, 100);
    }

    #[test]
    fn test_card_id_from_raw() {
        let c1 = CardId::from_raw(7);
        assert_eq!(c1.0, 7);
    }
}
