//! Canonical game state: the entity arena, players and battle slot.
//!
//! The entire game state is a single mutable graph owned by `GameState`.
//! The sanctioned mutation path is an effect's `resolve` (driven through
//! `engine::ActionContext`); setup code builds the arena directly, and
//! preview copies (see `preview`) are read-only.

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::battle::BattleResult;
use crate::effect::FailReason;
use crate::entity::{Entity, EntityKind};
use crate::ids::{EntityId, PlayerId};
use crate::ledger::{ResourceKind, WarbandOwner};
use crate::powers::{PowerRegistry, SetupError};

/// Per-player bookkeeping outside the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    /// The player's board entity (reserve warbands, purse).
    pub board: EntityId,
    /// Adviser cards in this player's row.
    pub advisers: Vec<EntityId>,
    /// Relics this player holds.
    pub relics: Vec<EntityId>,
    /// The site the player's pawn stands at.
    pub site: Option<EntityId>,
    /// Automated actors never answer prompts; the engine forces unmodified
    /// continuation for their decisions (must-use, free capabilities only).
    pub automated: bool,
}

/// The canonical game state.
#[derive(Debug, Clone)]
pub struct GameState {
    entities: HashMap<EntityId, Entity>,
    next_entity: u32,
    pub players: Vec<PlayerState>,
    /// Fixed slot set always scanned for capabilities, regardless of who
    /// rules what.
    pub reliquary: Vec<EntityId>,
    /// The battle currently being resolved, if any. Written only by the
    /// battle-resolution decision chain.
    pub battle: Option<BattleResult>,
    /// Resolved battles, most recent last. `CloseBattleEffect` moves the
    /// active battle here so the close is revertible.
    pub battle_log: Vec<BattleResult>,
    /// True while the contested claim is held against a usurper; doubles
    /// the defender's claim bonus in battle.
    pub usurper: bool,
    pub rng: StdRng,
    /// Seed `rng` was created from, kept for persistence.
    pub seed: u64,
    pub registry: PowerRegistry,
}

impl GameState {
    /// Create an empty game with a deterministic RNG seed.
    pub fn new(seed: u64, registry: PowerRegistry) -> Self {
        Self {
            entities: HashMap::new(),
            next_entity: 1,
            players: Vec::new(),
            reliquary: Vec::new(),
            battle: None,
            battle_log: Vec::new(),
            usurper: false,
            rng: StdRng::seed_from_u64(seed),
            seed,
            registry,
        }
    }

    // ========================================================================
    // Arena
    // ========================================================================

    /// Allocate a fresh canonical entity id.
    pub fn alloc_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    /// Insert an entity into the arena, returning its id.
    ///
    /// An entity referencing a card the registry has never declared is a
    /// setup error, not a silently powerless entity.
    pub fn insert(&mut self, entity: Entity) -> Result<EntityId, SetupError> {
        if let Some(card) = entity.card
            && !self.registry.knows(card)
        {
            return Err(SetupError::UnknownCard(card));
        }
        let id = entity.id;
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Bump the id allocator past `id`. Used when restoring a saved game,
    /// so freshly allocated ids never collide with restored ones.
    pub fn reserve_through(&mut self, id: EntityId) {
        self.next_entity = self.next_entity.max(id.0 + 1);
    }

    pub fn entity(&self, id: EntityId) -> Result<&Entity, FailReason> {
        self.entities.get(&id).ok_or(FailReason::EntityNotFound(id))
    }

    /// Mutable arena access. Outside of setup, only effect `resolve`/`revert`
    /// implementations should call this.
    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut Entity, FailReason> {
        self.entities
            .get_mut(&id)
            .ok_or(FailReason::EntityNotFound(id))
    }

    /// Iterate all entities in id order (deterministic).
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort();
        ids.into_iter().map(move |id| &self.entities[&id])
    }

    // ========================================================================
    // Players
    // ========================================================================

    /// Add a player with a fresh board entity.
    pub fn add_player(&mut self, name: impl Into<String>) -> PlayerId {
        let id = PlayerId::from_index(self.players.len() as u8);
        let name = name.into();
        let board_id = self.alloc_id();
        let board = Entity::new(board_id, EntityKind::PlayerBoard, format!("{} board", name))
            .with_ruler(id);
        self.insert(board).expect("player boards carry no card");
        self.players.push(PlayerState {
            id,
            name,
            board: board_id,
            advisers: Vec::new(),
            relics: Vec::new(),
            site: None,
            automated: false,
        });
        id
    }

    pub fn player(&self, id: PlayerId) -> Result<&PlayerState, FailReason> {
        self.players
            .get(id.index())
            .ok_or(FailReason::PlayerNotFound(id))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut PlayerState, FailReason> {
        self.players
            .get_mut(id.index())
            .ok_or(FailReason::PlayerNotFound(id))
    }

    // ========================================================================
    // Positions & Forces
    // ========================================================================

    /// The site an entity is located at, for co-location checks.
    ///
    /// Sites are their own location; denizens and placed relics use their
    /// `site` field; held relics, advisers, banners and player boards travel
    /// with the holding/ruling player's pawn.
    pub fn entity_site(&self, id: EntityId) -> Option<EntityId> {
        let entity = self.entity(id).ok()?;
        match entity.kind {
            EntityKind::Site => Some(id),
            EntityKind::Denizen => entity.site,
            EntityKind::Adviser => {
                self.players.iter().find(|p| p.advisers.contains(&id))?.site
            }
            EntityKind::Relic => entity.site.or_else(|| {
                let holder = self
                    .players
                    .iter()
                    .find(|p| p.relics.contains(&id))
                    .map(|p| p.id)?;
                self.player(holder).ok()?.site
            }),
            EntityKind::Banner => {
                let ruler = entity.ruler?;
                self.player(ruler).ok()?.site
            }
            EntityKind::PlayerBoard => {
                let ruler = entity.ruler?;
                self.player(ruler).ok()?.site
            }
        }
    }

    /// Warbands an owner has at a site.
    pub fn warbands_at(&self, site: EntityId, owner: WarbandOwner) -> u32 {
        self.entity(site)
            .map(|e| e.ledger.warbands(owner))
            .unwrap_or(0)
    }

    /// A player's total deployable force: reserve warbands on their board
    /// plus their warbands at their current site.
    pub fn deployable_force(&self, player: PlayerId) -> u32 {
        let Ok(p) = self.player(player) else { return 0 };
        let reserve = self
            .entity(p.board)
            .map(|e| e.ledger.warbands(Some(player)))
            .unwrap_or(0);
        let at_site = p
            .site
            .map(|s| self.warbands_at(s, Some(player)))
            .unwrap_or(0);
        reserve + at_site
    }

    /// A player's purse balance (resources on their board).
    pub fn purse(&self, player: PlayerId, kind: ResourceKind) -> u32 {
        self.player(player)
            .ok()
            .and_then(|p| self.entity(p.board).ok())
            .map(|e| e.ledger.resource(kind))
            .unwrap_or(0)
    }

    /// The player holding a relic, if anyone.
    pub fn relic_holder(&self, relic: EntityId) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|p| p.relics.contains(&relic))
            .map(|p| p.id)
    }
}
