//! The mutation ("effect") abstraction.
//!
//! An effect is one atomic state change with an exact inverse:
//! - `resolve` performs the mutation and records the *actual* quantities it
//!   moved (ledger primitives saturate, so the actual amount may be less
//!   than requested),
//! - `revert` undoes exactly what the matching `resolve` did, using those
//!   recorded quantities.
//!
//! Effects are created, resolved and either kept (decision succeeded) or
//! reverted in LIFO order (decision failed) within the lifetime of the
//! decision that issued them. The only sanctioned path for mutating game
//! truth is an effect's `resolve`; see `engine::ActionContext::resolve`,
//! which also applies must-use effect modifiers and records the effect on
//! the enclosing decision's undo frame.

use std::any::Any;

use crate::ids::{EntityId, PlayerId};
use crate::ledger::ResourceKind;

// ============================================================================
// Domain Failure
// ============================================================================

/// A domain/resolution failure.
///
/// Raising one of these from a decision's `execute` (or from an effect's
/// `resolve`) is the only cancellation path: the engine reverts every
/// mutation recorded for the current decision, requeues the decision
/// unexecuted, and surfaces the message to the caller. Not fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    /// Referenced entity does not exist in the arena.
    EntityNotFound(EntityId),
    /// Referenced player does not exist.
    PlayerNotFound(PlayerId),
    /// A required payment could not be made in full.
    CannotAfford {
        entity: EntityId,
        kind: ResourceKind,
        needed: u32,
        available: u32,
    },
    /// A chosen target is not in a legal state for the operation.
    InvalidTarget(String),
    /// A battle step ran without an active battle.
    NoActiveBattle,
    /// Generic domain rejection with a player-facing message.
    Rejected(String),
    /// Internal error (should not happen).
    Internal(String),
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailReason::EntityNotFound(id) => write!(f, "Entity {:?} not found", id),
            FailReason::PlayerNotFound(id) => write!(f, "Player {:?} not found", id),
            FailReason::CannotAfford {
                entity,
                kind,
                needed,
                available,
            } => write!(
                f,
                "Cannot pay {} {:?} from entity {:?} (only {} available)",
                needed, kind, entity, available
            ),
            FailReason::InvalidTarget(msg) => write!(f, "Invalid target: {}", msg),
            FailReason::NoActiveBattle => write!(f, "No battle is being resolved"),
            FailReason::Rejected(msg) => write!(f, "{}", msg),
            FailReason::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for FailReason {}

// ============================================================================
// Effect Kinds
// ============================================================================

/// The kind of an effect, used by modifier discovery to match capabilities
/// against the mutation they intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    PutResources,
    TakeResources,
    MoveResources,
    FlipSecrets,
    PutWarbands,
    MoveWarbands,
    KillWarbands,
    Seize,
    SetFaceUp,
    RollDice,
    BattleBonus,
    BattleFlag,
    BattlePlan,
    OpenBattle,
    CloseBattle,
}

// ============================================================================
// Effect Trait
// ============================================================================

/// An atomic, revertible state change.
///
/// `resolve` must be a pure function of current state plus the effect's own
/// fields. The single exception is explicitly-modeled randomness: dice
/// effects are non-revertible "read" effects whose `revert` is a no-op (a
/// retried decision simply rolls again).
pub trait Effect: std::fmt::Debug + Any {
    /// The kind of mutation, for modifier targeting.
    fn kind(&self) -> EffectKind;

    /// The acting player, if any.
    fn player(&self) -> Option<PlayerId> {
        None
    }

    /// Perform the mutation, recording actual quantities for exact reversal.
    fn resolve(&mut self, game: &mut crate::game_state::GameState) -> Result<(), FailReason>;

    /// Undo exactly what `resolve` did. Must be safe even when `resolve`
    /// only partially satisfied the requested amount.
    fn revert(&self, game: &mut crate::game_state::GameState);

    /// The actual quantity this effect moved, once resolved.
    fn actual(&self) -> u32 {
        0
    }

    fn boxed_clone(&self) -> Box<dyn Effect>;

    /// Downcast hook for effect modifiers that adjust an effect's fields
    /// before it resolves.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn Effect> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Downcast a boxed effect to a concrete type, for modifier hooks.
pub fn downcast_effect_mut<T: Effect>(effect: &mut dyn Effect) -> Option<&mut T> {
    effect.as_any_mut().downcast_mut::<T>()
}
