//! The decision ("action") abstraction.
//!
//! An action represents one point requiring external input. Its lifecycle:
//! `start` builds a choice schema from current state, external input
//! supplies parameters, and `execute` runs the core logic, issuing effects
//! through the `ActionContext` and possibly chaining further decisions.
//! The engine drives that lifecycle and owns rollback/retry; see `engine`.

use std::any::Any;

use crate::choice::{ChoiceResponse, ChoiceSchema};
use crate::effect::FailReason;
use crate::engine::ActionContext;
use crate::game_state::GameState;
use crate::ids::PlayerId;

/// The kind of a decision, used by modifier discovery to match capabilities
/// against the decision they intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    DeclareDefender,
    DeclareTargets,
    RollBattleDice,
    Sacrifice,
    EndBattle,
    Muster,
    Trade,
    /// Escape hatch for content- and test-defined decisions.
    Custom(&'static str),
}

/// One decision awaiting external input.
///
/// Implementations keep their chosen parameter values in their own fields;
/// the engine guarantees `apply_parameters` is called exactly once per
/// attempt (a rolled-back decision is requeued unexecuted and goes through
/// `start`/`apply_parameters` afresh).
pub trait Action: std::fmt::Debug {
    /// The deciding player.
    fn player(&self) -> PlayerId;

    fn kind(&self) -> ActionKind;

    /// Human-readable prompt for the caller.
    fn message(&self) -> String;

    /// Whether the engine may skip asking for input when the schema admits
    /// exactly one legal combination. (An empty schema is always
    /// auto-completed — there is nothing to ask.)
    fn autocomplete_allowed(&self) -> bool {
        true
    }

    /// Build the choice schema from current game state.
    fn start(&mut self, game: &GameState) -> Result<ChoiceSchema, FailReason>;

    /// Populate parameter fields from a validated response.
    fn apply_parameters(
        &mut self,
        schema: &ChoiceSchema,
        response: &ChoiceResponse,
    ) -> Result<(), FailReason>;

    /// Run the core logic: issue effects and chain further decisions via
    /// the context. Returning a `FailReason` triggers full rollback of this
    /// decision's effects and a requeue.
    fn execute(
        &mut self,
        game: &mut GameState,
        ctx: &mut ActionContext,
    ) -> Result<(), FailReason>;

    fn as_any(&self) -> &dyn Any;
}
