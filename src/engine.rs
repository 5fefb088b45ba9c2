//! The decision-resolution engine.
//!
//! The engine owns the LIFO stack of pending decisions and drives a
//! trampoline over it: long chains (battle, setup) never deepen the native
//! call stack. Suspension happens only at decision boundaries — `run`
//! stops after building a decision's choice schema and returns an
//! `AwaitingChoice` status; `submit` is the distinct re-entry point that
//! supplies parameters and resumes synchronous execution.
//!
//! A decision pushed during another decision's `execute` runs to full
//! completion before control returns to the pusher. Raising a `FailReason`
//! inside execution is the only cancellation path: every mutation recorded
//! for the current decision is reverted in reverse order, the decision is
//! requeued unexecuted, and the error is surfaced *after* the rollback has
//! run. No partial state is ever observable externally.

use crate::action::Action;
use crate::choice::{ChoiceResponse, ChoiceSchema, ChoiceValue, ResponseError, SelectField};
use crate::effect::{Effect, FailReason};
use crate::game_state::GameState;
use crate::ids::PlayerId;
use crate::ledger::ResourceKind;
use crate::modifier::{Modifier, discover_for_action, discover_for_effect};

/// Name of the synthetic schema field offering optional modifiers.
pub const MODIFIERS_FIELD: &str = "modifiers";

// ============================================================================
// Errors & Status
// ============================================================================

/// Errors surfaced by the engine's request/response API.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// `submit` was called with no decision awaiting input.
    NoPendingDecision,
    /// The response violated the choice schema contract.
    Response(ResponseError),
    /// A domain failure; rollback has already run and the decision has been
    /// requeued. The caller should display the message and re-offer the
    /// choice.
    Domain(FailReason),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NoPendingDecision => write!(f, "No decision is awaiting input"),
            EngineError::Response(err) => write!(f, "Invalid response: {}", err),
            EngineError::Domain(reason) => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ResponseError> for EngineError {
    fn from(err: ResponseError) -> Self {
        EngineError::Response(err)
    }
}

impl From<FailReason> for EngineError {
    fn from(reason: FailReason) -> Self {
        EngineError::Domain(reason)
    }
}

/// What the engine is doing after a `run`/`submit` call returns.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineStatus {
    /// The stack is empty; all decisions resolved.
    Idle,
    /// A decision is waiting for external input.
    AwaitingChoice(ChoiceRequest),
}

/// A decision surfaced to the caller for input.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceRequest {
    pub player: PlayerId,
    pub message: String,
    pub schema: ChoiceSchema,
}

// ============================================================================
// Undo Frame
// ============================================================================

/// The per-decision stack of resolved effects, reverted LIFO on failure.
#[derive(Debug, Default)]
pub struct UndoFrame {
    effects: Vec<Box<dyn Effect>>,
}

impl UndoFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, effect: Box<dyn Effect>) {
        self.effects.push(effect);
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Revert every recorded effect in reverse resolution order and clear
    /// the frame.
    pub fn revert_all(&mut self, game: &mut GameState) {
        while let Some(effect) = self.effects.pop() {
            effect.revert(game);
        }
    }
}

// ============================================================================
// Action Context
// ============================================================================

/// Handed to a decision's `execute` (and to modifier hooks): the only
/// sanctioned way to mutate game truth and to chain further decisions.
#[derive(Debug)]
pub struct ActionContext<'a> {
    /// The deciding player.
    pub player: PlayerId,
    /// Names of the negotiated modifiers, in application order.
    pub modifier_names: Vec<&'static str>,
    frame: &'a mut UndoFrame,
    next: Vec<(Box<dyn Action>, bool)>,
}

impl<'a> ActionContext<'a> {
    fn new(player: PlayerId, frame: &'a mut UndoFrame) -> Self {
        Self {
            player,
            modifier_names: Vec::new(),
            frame,
            next: Vec::new(),
        }
    }

    /// Resolve an effect: apply must-use effect modifiers around its
    /// resolution and record it on the enclosing decision's undo frame.
    /// Returns the actual quantity the effect moved.
    pub fn resolve(
        &mut self,
        game: &mut GameState,
        mut effect: Box<dyn Effect>,
    ) -> Result<u32, FailReason> {
        // Discovery is recomputed fresh for every mutation.
        let modifiers = discover_for_effect(game, effect.kind());
        for modifier in &modifiers {
            if let Some(pre) = modifier.effect_hooks().pre {
                pre(game, modifier, effect.as_mut())?;
            }
        }
        effect.resolve(game)?;
        for modifier in &modifiers {
            if let Some(post) = modifier.effect_hooks().post
                && let Err(reason) = post(game, modifier, effect.as_mut())
            {
                // The effect already mutated state but is not yet on the
                // frame; undo it here so the engine's rollback stays exact.
                effect.revert(game);
                return Err(reason);
            }
        }
        let actual = effect.actual();
        self.frame.push(effect);
        Ok(actual)
    }

    /// Chain a next decision; it re-enters full modifier negotiation.
    pub fn push_next(&mut self, action: Box<dyn Action>) {
        self.next.push((action, true));
    }

    /// Chain a tightly coupled sub-step, bypassing modifier negotiation.
    pub fn push_next_unnegotiated(&mut self, action: Box<dyn Action>) {
        self.next.push((action, false));
    }
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug)]
struct Prepared {
    schema: ChoiceSchema,
    must_use: Vec<Modifier>,
    offered: Vec<Modifier>,
}

#[derive(Debug)]
struct PendingAction {
    action: Box<dyn Action>,
    negotiate: bool,
    prepared: Option<Prepared>,
}

enum Outcome {
    Completed(Vec<(Box<dyn Action>, bool)>),
    Abandoned,
}

/// The decision stack and its driver.
#[derive(Debug, Default)]
pub struct Engine {
    stack: Vec<PendingAction>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a decision with full modifier negotiation.
    pub fn push(&mut self, action: Box<dyn Action>) {
        self.stack.push(PendingAction {
            action,
            negotiate: true,
            prepared: None,
        });
    }

    /// Push a decision that bypasses negotiation.
    pub fn push_unnegotiated(&mut self, action: Box<dyn Action>) {
        self.stack.push(PendingAction {
            action,
            negotiate: false,
            prepared: None,
        });
    }

    pub fn is_idle(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Drive the trampoline until the stack is empty or a decision needs
    /// input. Auto-completes decisions whose schema admits exactly one
    /// legal combination (when the decision allows it).
    pub fn run(&mut self, game: &mut GameState) -> Result<EngineStatus, EngineError> {
        loop {
            if self.stack.is_empty() {
                return Ok(EngineStatus::Idle);
            }
            {
                let pending = self.stack.last_mut().expect("stack checked non-empty");
                if pending.prepared.is_none() {
                    let prepared = Self::prepare(game, pending)?;
                    pending.prepared = Some(prepared);
                }
            }
            let forced = {
                let pending = self.stack.last().expect("stack checked non-empty");
                let prepared = pending.prepared.as_ref().expect("prepared above");
                let auto = prepared.schema.is_empty() || pending.action.autocomplete_allowed();
                match prepared.schema.single_combination() {
                    Some(forced) if auto => forced,
                    _ => {
                        return Ok(EngineStatus::AwaitingChoice(ChoiceRequest {
                            player: pending.action.player(),
                            message: pending.action.message(),
                            schema: prepared.schema.clone(),
                        }));
                    }
                }
            };
            self.execute_top(game, forced)?;
        }
    }

    /// Supply parameters for the waiting decision and resume execution.
    ///
    /// On a domain failure the rollback has already run and the same
    /// decision is requeued unexecuted; its schema is rebuilt fresh from
    /// the reverted state on the next `run`.
    pub fn submit(
        &mut self,
        game: &mut GameState,
        response: ChoiceResponse,
    ) -> Result<EngineStatus, EngineError> {
        let Some(pending) = self.stack.last() else {
            return Err(EngineError::NoPendingDecision);
        };
        let Some(prepared) = pending.prepared.as_ref() else {
            return Err(EngineError::NoPendingDecision);
        };
        prepared.schema.validate(&response)?;
        self.execute_top(game, response)?;
        self.run(game)
    }

    /// Build the schema for the top decision: action's own fields, then
    /// must-use at-start hooks, then the optional-modifier multi-select.
    fn prepare(game: &GameState, pending: &mut PendingAction) -> Result<Prepared, EngineError> {
        let mut schema = pending.action.start(game).map_err(EngineError::Domain)?;
        let mut must_use = Vec::new();
        let mut offered = Vec::new();
        if pending.negotiate {
            let discovered = discover_for_action(game, pending.action.kind());
            must_use = discovered.must_use;
            let automated = game
                .player(pending.action.player())
                .map(|p| p.automated)
                .unwrap_or(false);
            if automated {
                // Forced unmodified continuation: must-use, free
                // capabilities only; nothing is offered.
                must_use.retain(|m| m.cost.is_free());
            } else {
                offered = discovered.optional;
            }
            for modifier in &must_use {
                if let Some(at_start) = modifier.action_hooks().at_start {
                    at_start(game, modifier, &mut schema);
                }
            }
            if !offered.is_empty() {
                let options = offered
                    .iter()
                    .enumerate()
                    .map(|(i, m)| (m.name.to_string(), ChoiceValue::Modifier(i)))
                    .collect();
                schema.add_field(MODIFIERS_FIELD, SelectField::any_of(options));
            }
        }
        Ok(Prepared {
            schema,
            must_use,
            offered,
        })
    }

    /// Pop and execute the top decision with a validated (or forced)
    /// response. Handles negotiation, rollback and chaining.
    fn execute_top(
        &mut self,
        game: &mut GameState,
        response: ChoiceResponse,
    ) -> Result<(), EngineError> {
        let mut pending = self.stack.pop().expect("execute_top requires a pending decision");
        let prepared = pending
            .prepared
            .take()
            .expect("execute_top requires a prepared decision");

        let automated = game
            .player(pending.action.player())
            .map(|p| p.automated)
            .unwrap_or(false);

        // Negotiated list: must-use in discovery order, then chosen
        // optional in offer order.
        let mut modifiers = prepared.must_use.clone();
        for value in prepared.schema.selected(&response, MODIFIERS_FIELD) {
            if let ChoiceValue::Modifier(index) = value
                && let Some(modifier) = prepared.offered.get(index)
            {
                modifiers.push(modifier.clone());
            }
        }

        let mut frame = UndoFrame::new();
        let result = Self::run_negotiated(
            game,
            pending.action.as_mut(),
            &prepared.schema,
            &response,
            &modifiers,
            &mut frame,
            automated,
        );
        match result {
            Ok(Outcome::Completed(next)) => {
                // Commit: recorded effects are kept. Chained decisions go on
                // the stack so the first-chained runs first (LIFO).
                for (action, negotiate) in next.into_iter().rev() {
                    self.stack.push(PendingAction {
                        action,
                        negotiate,
                        prepared: None,
                    });
                }
                Ok(())
            }
            Ok(Outcome::Abandoned) => {
                // A veto abandons the decision: refund paid costs, do not
                // requeue.
                frame.revert_all(game);
                Ok(())
            }
            Err(reason) => {
                frame.revert_all(game);
                self.stack.push(pending);
                Err(EngineError::Domain(reason))
            }
        }
    }

    fn run_negotiated(
        game: &mut GameState,
        action: &mut dyn Action,
        schema: &ChoiceSchema,
        response: &ChoiceResponse,
        modifiers: &[Modifier],
        frame: &mut UndoFrame,
        automated: bool,
    ) -> Result<Outcome, FailReason> {
        action.apply_parameters(schema, response)?;

        let mut ctx = ActionContext::new(action.player(), frame);
        ctx.modifier_names = modifiers.iter().map(|m| m.name).collect();

        // Each selected capability pays its cost before any hook runs.
        for modifier in modifiers {
            if modifier.cost.is_free() {
                continue;
            }
            let Some(owner) = modifier.owner else {
                return Err(FailReason::Rejected(format!(
                    "{} has no owner to pay its cost",
                    modifier.name
                )));
            };
            let board = game.player(owner)?.board;
            if modifier.cost.favor > 0 {
                ctx.resolve(
                    game,
                    Box::new(crate::effects::TakeResourcesEffect::required(
                        board,
                        ResourceKind::Favor,
                        modifier.cost.favor,
                        owner,
                    )),
                )?;
            }
            if modifier.cost.secrets > 0 {
                ctx.resolve(
                    game,
                    Box::new(crate::effects::TakeResourcesEffect::required(
                        board,
                        ResourceKind::Secret,
                        modifier.cost.secrets,
                        owner,
                    )),
                )?;
            }
        }

        // Before hooks may veto. Automated actors are forced through.
        for modifier in modifiers {
            if let Some(before) = modifier.action_hooks().before {
                let proceed = before(game, modifier, &mut ctx)?;
                if !proceed && !automated {
                    return Ok(Outcome::Abandoned);
                }
            }
        }

        for modifier in modifiers {
            if let Some(during) = modifier.action_hooks().during {
                during(game, modifier, &mut ctx)?;
            }
        }
        action.execute(game, &mut ctx)?;
        for modifier in modifiers {
            if let Some(after) = modifier.action_hooks().after {
                after(game, modifier, &mut ctx)?;
            }
        }
        Ok(Outcome::Completed(ctx.next))
    }
}
