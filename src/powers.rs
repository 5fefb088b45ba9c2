//! The static power registry: card definitions and their capabilities.
//!
//! Powers are declared once, at setup, as `PowerSpec` records keyed by
//! card. Discovery (see `modifier`) instantiates them transiently against
//! the current decision. Registration validates the declaration shape:
//! hooks must match the target, and effect-targeting powers must be free
//! must-use capabilities because mutations are never negotiated. Shape
//! violations are fatal at setup, never at play time.

use std::collections::HashMap;

use crate::action::ActionKind;
use crate::battle::BattleFlag;
use crate::choice::{ChoiceSchema, ChoiceValue};
use crate::effect::{Effect, EffectKind, FailReason, downcast_effect_mut};
use crate::effects::{BattleBonusEffect, BattleFlagEffect, BattleSide, TakeResourcesEffect};
use crate::engine::ActionContext;
use crate::game_state::GameState;
use crate::ids::{CardId, EntityId, PlayerId};
use crate::modifier::{
    ActionHooks, EffectHooks, Modifier, ModifierCost, ModifierHooks, ModifierTarget,
};

// ============================================================================
// Specs & Registry
// ============================================================================

/// A capability as declared on a card, before instantiation.
#[derive(Debug, Clone)]
pub struct PowerSpec {
    pub name: &'static str,
    pub target: ModifierTarget,
    pub must_use: bool,
    pub cost: ModifierCost,
    pub applies: Option<crate::modifier::AppliesFn>,
    pub ignores: Option<crate::modifier::IgnoresFn>,
    pub hooks: ModifierHooks,
    card: CardId,
}

impl PowerSpec {
    /// Instantiate against a live host.
    pub fn instantiate(&self, source: EntityId, owner: Option<PlayerId>) -> Modifier {
        Modifier {
            source,
            owner,
            card: self.card,
            name: self.name,
            target: self.target,
            must_use: self.must_use,
            cost: self.cost,
            applies: self.applies,
            ignores: self.ignores,
            hooks: self.hooks,
        }
    }
}

/// Declaration-shape violations, surfaced when the registry is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// Action-targeting power with effect hooks, or the reverse.
    HookShapeMismatch(&'static str),
    /// Effect-targeting powers must be must-use: mutations are never
    /// negotiated, so an optional effect power could never be chosen.
    OptionalEffectPower(&'static str),
    /// Effect-targeting powers must be free: there is no negotiation step
    /// to collect a cost at.
    CostlyEffectPower(&'static str),
    /// An entity references a card the registry has never declared.
    UnknownCard(CardId),
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::HookShapeMismatch(name) => {
                write!(f, "Power '{}' declares hooks that do not match its target", name)
            }
            SetupError::OptionalEffectPower(name) => {
                write!(f, "Effect power '{}' must be must-use", name)
            }
            SetupError::CostlyEffectPower(name) => {
                write!(f, "Effect power '{}' must be free", name)
            }
            SetupError::UnknownCard(card) => {
                write!(f, "No card with id {} is declared", card.0)
            }
        }
    }
}

impl std::error::Error for SetupError {}

/// The card-to-capabilities table. Built once at setup, then read-only.
#[derive(Debug, Clone, Default)]
pub struct PowerRegistry {
    powers: HashMap<CardId, Vec<PowerSpec>>,
}

impl PowerRegistry {
    /// A registry with no powers, for games (and tests) without content.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> PowerRegistryBuilder {
        PowerRegistryBuilder::default()
    }

    /// The capabilities a card carries.
    pub fn powers(&self, card: CardId) -> &[PowerSpec] {
        self.powers.get(&card).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether a card is declared at all, with or without powers. Entities
    /// referencing undeclared cards are refused at insertion.
    pub fn knows(&self, card: CardId) -> bool {
        self.powers.contains_key(&card)
    }
}

/// Collects declarations, then validates them all when built.
#[derive(Debug, Default)]
pub struct PowerRegistryBuilder {
    declared: Vec<PowerSpec>,
    vanilla: Vec<CardId>,
}

impl PowerRegistryBuilder {
    /// Declare a card with no powers, so entities may reference it.
    pub fn card(mut self, card: CardId) -> Self {
        self.vanilla.push(card);
        self
    }

    /// Declare a power on a card.
    #[allow(clippy::too_many_arguments)]
    pub fn power(
        mut self,
        card: CardId,
        name: &'static str,
        target: ModifierTarget,
        must_use: bool,
        cost: ModifierCost,
        applies: Option<crate::modifier::AppliesFn>,
        ignores: Option<crate::modifier::IgnoresFn>,
        hooks: ModifierHooks,
    ) -> Self {
        self.declared.push(PowerSpec {
            name,
            target,
            must_use,
            cost,
            applies,
            ignores,
            hooks,
            card,
        });
        self
    }

    /// Validate every declaration and build the registry.
    pub fn build(self) -> Result<PowerRegistry, SetupError> {
        let mut powers: HashMap<CardId, Vec<PowerSpec>> = HashMap::new();
        for card in self.vanilla {
            powers.entry(card).or_default();
        }
        for spec in self.declared {
            match (spec.target, &spec.hooks) {
                (ModifierTarget::Action(_), ModifierHooks::Action(_)) => {}
                (ModifierTarget::Effect(_), ModifierHooks::Effect(_)) => {
                    if !spec.must_use {
                        return Err(SetupError::OptionalEffectPower(spec.name));
                    }
                    if !spec.cost.is_free() {
                        return Err(SetupError::CostlyEffectPower(spec.name));
                    }
                }
                _ => return Err(SetupError::HookShapeMismatch(spec.name)),
            }
            powers.entry(spec.card).or_default().push(spec);
        }
        Ok(PowerRegistry { powers })
    }
}

// ============================================================================
// Standard Cards
// ============================================================================

/// Card ids for the standard content set.
pub mod cards {
    use crate::ids::CardId;

    pub const LONGBOWS: CardId = CardId(101);
    pub const SHIELD_WALL: CardId = CardId(102);
    pub const MARTYRS: CardId = CardId(103);
    pub const PEACE_ENVOY: CardId = CardId(104);
    pub const HAUNTED_KEEP: CardId = CardId(105);
    pub const FEUDING_CAPTAIN_RED: CardId = CardId(106);
    pub const FEUDING_CAPTAIN_BLUE: CardId = CardId(107);
    pub const DEEP_CELLARS: CardId = CardId(108);
}

fn owner_is_attacker(game: &GameState, modifier: &Modifier) -> bool {
    game.battle
        .as_ref()
        .is_some_and(|b| modifier.owner == Some(b.attacker))
}

fn owner_is_defender(game: &GameState, modifier: &Modifier) -> bool {
    modifier.owner.is_some()
        && game
            .battle
            .as_ref()
            .is_some_and(|b| b.defender == modifier.owner)
}

fn longbows_during(
    game: &mut GameState,
    _modifier: &Modifier,
    ctx: &mut ActionContext,
) -> Result<(), FailReason> {
    ctx.resolve(game, Box::new(BattleBonusEffect::new(BattleSide::Attack, 2)))?;
    Ok(())
}

fn shield_wall_during(
    game: &mut GameState,
    _modifier: &Modifier,
    ctx: &mut ActionContext,
) -> Result<(), FailReason> {
    ctx.resolve(game, Box::new(BattleBonusEffect::new(BattleSide::Defense, 1)))?;
    Ok(())
}

fn martyrs_during(
    game: &mut GameState,
    _modifier: &Modifier,
    ctx: &mut ActionContext,
) -> Result<(), FailReason> {
    ctx.resolve(
        game,
        Box::new(BattleFlagEffect::new(BattleFlag::DefenderLosesNothing)),
    )?;
    Ok(())
}

fn peace_envoy_before(
    _game: &mut GameState,
    _modifier: &Modifier,
    _ctx: &mut ActionContext,
) -> Result<bool, FailReason> {
    // Call off the campaign entirely.
    Ok(false)
}

/// Withdraw the haunted site from the target options: no one fights over it.
fn haunted_keep_at_start(game: &GameState, modifier: &Modifier, schema: &mut ChoiceSchema) {
    let Some(site) = game.entity_site(modifier.source) else {
        return;
    };
    if let Some(field) = schema.field_mut("targets") {
        field
            .options
            .retain(|(_, value)| *value != ChoiceValue::Entity(site));
        field.min = field.min.min(field.options.len());
        field.max = field.max.min(field.options.len()).max(field.min);
    }
}

fn captain_bonus_during(
    game: &mut GameState,
    _modifier: &Modifier,
    ctx: &mut ActionContext,
) -> Result<(), FailReason> {
    ctx.resolve(game, Box::new(BattleBonusEffect::new(BattleSide::Attack, 1)))?;
    Ok(())
}

fn feud_ignores(_game: &GameState, me: &Modifier, all: &[Modifier]) -> Vec<usize> {
    let rival = if me.name == "Feuding Captain (Red)" {
        "Feuding Captain (Blue)"
    } else {
        "Feuding Captain (Red)"
    };
    all.iter()
        .enumerate()
        .filter(|(_, m)| m.name == rival)
        .map(|(i, _)| i)
        .collect()
}

/// Takes against the cellared host come up one short.
fn deep_cellars_pre(
    _game: &mut GameState,
    modifier: &Modifier,
    effect: &mut dyn Effect,
) -> Result<(), FailReason> {
    if let Some(take) = downcast_effect_mut::<TakeResourcesEffect>(effect)
        && take.target == modifier.source
        && !take.required
    {
        take.amount = take.amount.saturating_sub(1);
    }
    Ok(())
}

/// The standard content set.
pub fn standard_registry() -> Result<PowerRegistry, SetupError> {
    PowerRegistry::builder()
        .power(
            cards::LONGBOWS,
            "Longbows",
            ModifierTarget::Action(ActionKind::RollBattleDice),
            false,
            ModifierCost::free(),
            Some(owner_is_attacker),
            None,
            ModifierHooks::Action(ActionHooks {
                during: Some(longbows_during),
                ..ActionHooks::default()
            }),
        )
        .power(
            cards::SHIELD_WALL,
            "Shield Wall",
            ModifierTarget::Action(ActionKind::RollBattleDice),
            false,
            ModifierCost::favor(1),
            Some(owner_is_defender),
            None,
            ModifierHooks::Action(ActionHooks {
                during: Some(shield_wall_during),
                ..ActionHooks::default()
            }),
        )
        .power(
            cards::MARTYRS,
            "Martyrs",
            ModifierTarget::Action(ActionKind::EndBattle),
            true,
            ModifierCost::free(),
            Some(owner_is_defender),
            None,
            ModifierHooks::Action(ActionHooks {
                during: Some(martyrs_during),
                ..ActionHooks::default()
            }),
        )
        .power(
            cards::PEACE_ENVOY,
            "Peace Envoy",
            ModifierTarget::Action(ActionKind::DeclareDefender),
            false,
            ModifierCost::favor(1),
            None,
            None,
            ModifierHooks::Action(ActionHooks {
                before: Some(peace_envoy_before),
                ..ActionHooks::default()
            }),
        )
        .power(
            cards::HAUNTED_KEEP,
            "Haunted Keep",
            ModifierTarget::Action(ActionKind::DeclareTargets),
            true,
            ModifierCost::free(),
            None,
            None,
            ModifierHooks::Action(ActionHooks {
                at_start: Some(haunted_keep_at_start),
                ..ActionHooks::default()
            }),
        )
        .power(
            cards::FEUDING_CAPTAIN_RED,
            "Feuding Captain (Red)",
            ModifierTarget::Action(ActionKind::RollBattleDice),
            false,
            ModifierCost::free(),
            Some(owner_is_attacker),
            Some(feud_ignores),
            ModifierHooks::Action(ActionHooks {
                during: Some(captain_bonus_during),
                ..ActionHooks::default()
            }),
        )
        .power(
            cards::FEUDING_CAPTAIN_BLUE,
            "Feuding Captain (Blue)",
            ModifierTarget::Action(ActionKind::RollBattleDice),
            false,
            ModifierCost::free(),
            Some(owner_is_attacker),
            Some(feud_ignores),
            ModifierHooks::Action(ActionHooks {
                during: Some(captain_bonus_during),
                ..ActionHooks::default()
            }),
        )
        .power(
            cards::DEEP_CELLARS,
            "Deep Cellars",
            ModifierTarget::Effect(EffectKind::TakeResources),
            true,
            ModifierCost::free(),
            None,
            None,
            ModifierHooks::Effect(EffectHooks {
                pre: Some(deep_cellars_pre),
                ..EffectHooks::default()
            }),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_builds() {
        let registry = standard_registry().unwrap();
        assert_eq!(registry.powers(cards::LONGBOWS).len(), 1);
        assert_eq!(registry.powers(CardId(999)).len(), 0);
        assert!(registry.knows(cards::DEEP_CELLARS));
        assert!(!registry.knows(CardId(999)));
    }

    #[test]
    fn test_vanilla_card_is_known_without_powers() {
        let registry = PowerRegistry::builder().card(CardId(12)).build().unwrap();
        assert!(registry.knows(CardId(12)));
        assert!(registry.powers(CardId(12)).is_empty());
    }

    #[test]
    fn test_mismatched_hooks_are_fatal() {
        let result = PowerRegistry::builder()
            .power(
                CardId(1),
                "Broken",
                ModifierTarget::Action(ActionKind::Muster),
                false,
                ModifierCost::free(),
                None,
                None,
                ModifierHooks::Effect(EffectHooks::default()),
            )
            .build();
        assert_eq!(result.unwrap_err(), SetupError::HookShapeMismatch("Broken"));
    }

    #[test]
    fn test_optional_effect_power_is_fatal() {
        let result = PowerRegistry::builder()
            .power(
                CardId(1),
                "Broken",
                ModifierTarget::Effect(EffectKind::TakeResources),
                false,
                ModifierCost::free(),
                None,
                None,
                ModifierHooks::Effect(EffectHooks::default()),
            )
            .build();
        assert_eq!(result.unwrap_err(), SetupError::OptionalEffectPower("Broken"));
    }

    #[test]
    fn test_costly_effect_power_is_fatal() {
        let result = PowerRegistry::builder()
            .power(
                CardId(1),
                "Broken",
                ModifierTarget::Effect(EffectKind::TakeResources),
                true,
                ModifierCost::secrets(1),
                None,
                None,
                ModifierHooks::Effect(EffectHooks::default()),
            )
            .build();
        assert_eq!(result.unwrap_err(), SetupError::CostlyEffectPower("Broken"));
    }

    #[test]
    fn test_instantiation_carries_the_card() {
        let registry = standard_registry().unwrap();
        let spec = &registry.powers(cards::MARTYRS)[0];
        let modifier = spec.instantiate(EntityId::from_raw(5), Some(PlayerId::from_index(1)));
        assert_eq!(modifier.card, cards::MARTYRS);
        assert_eq!(modifier.source, EntityId::from_raw(5));
        assert!(modifier.must_use);
    }
}
