//! Saving and loading games as JSON snapshots.
//!
//! The snapshot types are a separate wire surface rather than derives on
//! the core state: ledgers key their maps by enum and `Option<PlayerId>`,
//! which JSON maps cannot express, so the wire form flattens them into
//! entry lists. Saves are taken between decisions only; an open battle is
//! transient resolution state and refusing to save it keeps every save a
//! clean re-entry point. The RNG is re-seeded from the stored seed on load.

use serde::{Deserialize, Serialize};

use crate::entity::{BannerKind, Entity, EntityKind};
use crate::game_state::{GameState, PlayerState};
use crate::ids::{CardId, EntityId, PlayerId};
use crate::ledger::{Ledger, ResourceKind, WarbandOwner};
use crate::powers::{PowerRegistry, SetupError};

/// Errors from saving or loading.
#[derive(Debug)]
pub enum PersistError {
    /// The game has an open battle; finish or abandon it before saving.
    ActiveBattle,
    /// A snapshot entity references a card the supplied registry has never
    /// declared.
    Setup(SetupError),
    Serde(serde_json::Error),
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::ActiveBattle => {
                write!(f, "Cannot save while a battle is being resolved")
            }
            PersistError::Setup(err) => write!(f, "Snapshot rejected: {}", err),
            PersistError::Serde(err) => write!(f, "Snapshot serialization failed: {}", err),
        }
    }
}

impl std::error::Error for PersistError {}

impl From<SetupError> for PersistError {
    fn from(err: SetupError) -> Self {
        PersistError::Setup(err)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(err: serde_json::Error) -> Self {
        PersistError::Serde(err)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerSnapshot {
    resources: Vec<(ResourceKind, u32)>,
    warbands: Vec<(WarbandOwner, u32)>,
}

impl LedgerSnapshot {
    fn capture(ledger: &Ledger) -> Self {
        Self {
            resources: ledger.resource_entries(),
            warbands: ledger.warband_entries(),
        }
    }

    fn restore(&self) -> Ledger {
        let mut ledger = Ledger::new();
        for &(kind, amount) in &self.resources {
            ledger.put_resource(kind, amount);
        }
        for &(owner, amount) in &self.warbands {
            ledger.put_warbands(owner, amount);
        }
        ledger
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EntitySnapshot {
    id: EntityId,
    kind: EntityKind,
    card: Option<CardId>,
    name: String,
    face_up: bool,
    ruler: Option<PlayerId>,
    site: Option<EntityId>,
    defense: u32,
    banner: Option<BannerKind>,
    ledger: LedgerSnapshot,
}

impl EntitySnapshot {
    fn capture(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            kind: entity.kind,
            card: entity.card,
            name: entity.name.clone(),
            face_up: entity.face_up,
            ruler: entity.ruler,
            site: entity.site,
            defense: entity.defense,
            banner: entity.banner,
            ledger: LedgerSnapshot::capture(&entity.ledger),
        }
    }

    fn restore(&self) -> Entity {
        let mut entity = Entity::new(self.id, self.kind, self.name.clone());
        entity.card = self.card;
        entity.face_up = self.face_up;
        entity.ruler = self.ruler;
        entity.site = self.site;
        entity.defense = self.defense;
        entity.banner = self.banner;
        entity.ledger = self.ledger.restore();
        entity
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PlayerSnapshot {
    id: PlayerId,
    name: String,
    board: EntityId,
    advisers: Vec<EntityId>,
    relics: Vec<EntityId>,
    site: Option<EntityId>,
    automated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct GameSnapshot {
    seed: u64,
    usurper: bool,
    reliquary: Vec<EntityId>,
    players: Vec<PlayerSnapshot>,
    entities: Vec<EntitySnapshot>,
}

/// Serialize a game to JSON. Fails if a battle is open.
pub fn save_game(game: &GameState) -> Result<String, PersistError> {
    if game.battle.is_some() {
        return Err(PersistError::ActiveBattle);
    }
    let snapshot = GameSnapshot {
        seed: game.seed,
        usurper: game.usurper,
        reliquary: game.reliquary.clone(),
        players: game
            .players
            .iter()
            .map(|p| PlayerSnapshot {
                id: p.id,
                name: p.name.clone(),
                board: p.board,
                advisers: p.advisers.clone(),
                relics: p.relics.clone(),
                site: p.site,
                automated: p.automated,
            })
            .collect(),
        entities: game.entities().map(EntitySnapshot::capture).collect(),
    };
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

/// Restore a game from JSON. The power registry is static content, rebuilt
/// by the caller rather than persisted; every card the snapshot references
/// must be declared in it.
pub fn load_game(json: &str, registry: PowerRegistry) -> Result<GameState, PersistError> {
    let snapshot: GameSnapshot = serde_json::from_str(json)?;
    let mut game = GameState::new(snapshot.seed, registry);
    game.usurper = snapshot.usurper;
    game.reliquary = snapshot.reliquary;
    for entity in &snapshot.entities {
        let restored = entity.restore();
        game.reserve_through(restored.id);
        game.insert(restored)?;
    }
    game.players = snapshot
        .players
        .into_iter()
        .map(|p| PlayerState {
            id: p.id,
            name: p.name,
            board: p.board,
            advisers: p.advisers,
            relics: p.relics,
            site: p.site,
            automated: p.automated,
        })
        .collect();
    Ok(game)
}
