//! Concrete effect executors.
//!
//! One file per family, mirroring the ledger/ownership/battle surfaces the
//! engine mutates. Every executor records the actual quantities it moved so
//! its `revert` is an exact inverse even when a saturating ledger primitive
//! satisfied less than the requested amount.

pub mod battle;
pub mod dice;
pub mod ownership;
pub mod resources;
pub mod warbands;

pub use battle::{
    BattleBonusEffect, BattleFlagEffect, BattlePlanEffect, BattleSide, CloseBattleEffect,
    OpenBattleEffect,
};
pub use dice::{RollDiceEffect, RollPool};
pub use ownership::{SeizeEffect, SetFaceUpEffect};
pub use resources::{
    FlipSecretsEffect, MoveResourcesEffect, PutResourcesEffect, TakeResourcesEffect,
};
pub use warbands::{KillWarbandsEffect, MoveWarbandsEffect, PutWarbandsEffect};
