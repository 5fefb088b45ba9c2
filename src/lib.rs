//! A decision-resolution engine for a turn-based strategy game.
//!
//! The engine drives a LIFO stack of decisions. Each decision builds a
//! choice schema from current state, suspends for input, then executes by
//! issuing revertible effects. Static card capabilities ("powers") are
//! discovered per decision and negotiated in: must-use powers apply
//! automatically, optional ones are offered as a choice, and a failure at
//! any point rolls the whole decision back and re-offers it. Battles are a
//! chained sequence of such decisions; nothing about them is special-cased
//! in the engine itself.

pub mod action;
pub mod battle;
pub mod choice;
pub mod dice;
pub mod effect;
pub mod effects;
pub mod engine;
pub mod entity;
pub mod game_state;
pub mod ids;
pub mod ledger;
pub mod modifier;
#[cfg(feature = "serialization")]
pub mod persist;
pub mod powers;
pub mod preview;
pub mod special_actions;

pub use action::{Action, ActionKind};
pub use battle::{
    BattleFlag, BattleResult, DeclareDefenderAction, DeclareTargetsAction, EndBattleAction,
    RollBattleDiceAction, SacrificeAction,
};
pub use choice::{ChoiceResponse, ChoiceSchema, ChoiceValue, ResponseError, SelectField};
pub use dice::{AttackFace, DefenseFace, attack_value, defense_value, skull_count};
pub use effect::{Effect, EffectKind, FailReason, downcast_effect_mut};
pub use engine::{
    ActionContext, ChoiceRequest, Engine, EngineError, EngineStatus, MODIFIERS_FIELD, UndoFrame,
};
pub use entity::{BannerKind, Entity, EntityKind};
pub use game_state::{GameState, PlayerState};
pub use ids::{CardId, EntityId, PlayerId};
pub use ledger::{Ledger, ResourceKind, WarbandOwner};
pub use modifier::{
    DiscoveredModifiers, Modifier, ModifierCost, ModifierHooks, ModifierTarget,
    discover_for_action, discover_for_effect,
};
#[cfg(feature = "serialization")]
pub use persist::{PersistError, load_game, save_game};
pub use powers::{PowerRegistry, PowerSpec, SetupError, standard_registry};
pub use preview::Preview;
pub use special_actions::{MusterAction, TradeAction};
