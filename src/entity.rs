//! Game entities: sites, denizens, advisers, relics, banners and player boards.
//!
//! Entities live in the `GameState` arena and are addressed exclusively by
//! `EntityId`. Each entity carries its own `Ledger`; capability discovery
//! scans face-up entities for powers attached to their card definition.

use crate::ids::{CardId, EntityId, PlayerId};
use crate::ledger::Ledger;

/// The kind of a game entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    /// A map location. Sites can be ruled and fought over.
    Site,
    /// A card in play at a site, hosting powers while face up.
    Denizen,
    /// A card in a player's adviser row.
    Adviser,
    /// A relic, held by a player or lying at a site.
    Relic,
    /// A banner, one of the contested claims.
    Banner,
    /// A player's own board; holds their reserve warbands and purse.
    PlayerBoard,
}

/// Which claim a banner represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum BannerKind {
    PeoplesFavor,
    DarkestSecret,
}

/// One entity in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Canonical identifier.
    pub id: EntityId,
    pub kind: EntityKind,
    /// Static card definition, if this entity is card-backed.
    pub card: Option<CardId>,
    pub name: String,
    /// Only face-up entities host discoverable powers.
    pub face_up: bool,
    /// The ruling / owning player. `None` means unruled (or bandit-held).
    pub ruler: Option<PlayerId>,
    /// The site this entity is at, if it is located on the map.
    /// `None` for sites themselves, banners (which travel with their ruler)
    /// and held relics.
    pub site: Option<EntityId>,
    /// Defense value contributed when this entity is a battle target.
    pub defense: u32,
    /// Which banner this is, if `kind` is `Banner`.
    pub banner: Option<BannerKind>,
    /// Resources and warbands on this entity.
    pub ledger: Ledger,
}

impl Entity {
    /// Builder-style constructor; callers set kind-specific fields after.
    pub fn new(id: EntityId, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            card: None,
            name: name.into(),
            face_up: true,
            ruler: None,
            site: None,
            defense: 0,
            banner: None,
            ledger: Ledger::new(),
        }
    }

    pub fn with_card(mut self, card: CardId) -> Self {
        self.card = Some(card);
        self
    }

    pub fn with_ruler(mut self, ruler: PlayerId) -> Self {
        self.ruler = Some(ruler);
        self
    }

    pub fn with_site(mut self, site: EntityId) -> Self {
        self.site = Some(site);
        self
    }

    pub fn with_defense(mut self, defense: u32) -> Self {
        self.defense = defense;
        self
    }

    pub fn with_banner(mut self, banner: BannerKind) -> Self {
        self.banner = Some(banner);
        self
    }

    pub fn face_down(mut self) -> Self {
        self.face_up = false;
        self
    }

    /// Whether this entity can be a battle target.
    pub fn is_targetable(&self) -> bool {
        matches!(
            self.kind,
            EntityKind::Site | EntityKind::Relic | EntityKind::Banner
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let e = Entity::new(EntityId::from_raw(1), EntityKind::Site, "Harbor").with_defense(2);
        assert!(e.face_up);
        assert_eq!(e.defense, 2);
        assert!(e.ruler.is_none());
        assert!(e.is_targetable());
    }

    #[test]
    fn test_targetable_kinds() {
        let denizen = Entity::new(EntityId::from_raw(2), EntityKind::Denizen, "Mill");
        assert!(!denizen.is_targetable());
        let banner = Entity::new(EntityId::from_raw(3), EntityKind::Banner, "People's Favor")
            .with_banner(BannerKind::PeoplesFavor);
        assert!(banner.is_targetable());
    }
}
