//! The economy decisions: mustering warbands and trading for favor.
//!
//! Small, single-step decisions that exercise the full lifecycle (schema,
//! negotiation, effects, rollback) outside of battle. Both go through
//! modifier negotiation, so site powers can intercept them.

use crate::action::{Action, ActionKind};
use crate::choice::{ChoiceResponse, ChoiceSchema, ChoiceValue, SelectField};
use crate::effect::FailReason;
use crate::effects::{
    FlipSecretsEffect, PutResourcesEffect, PutWarbandsEffect, TakeResourcesEffect,
};
use crate::engine::ActionContext;
use crate::entity::EntityKind;
use crate::game_state::GameState;
use crate::ids::{EntityId, PlayerId};
use crate::ledger::ResourceKind;

fn denizens_at_site(game: &GameState, player: PlayerId) -> Result<Vec<(String, ChoiceValue)>, FailReason> {
    let site = game.player(player)?.site.ok_or_else(|| {
        FailReason::Rejected("You are not at a site".to_string())
    })?;
    Ok(game
        .entities()
        .filter(|e| e.kind == EntityKind::Denizen && e.face_up && e.site == Some(site))
        .map(|e| (e.name.clone(), ChoiceValue::Entity(e.id)))
        .collect())
}

fn chosen_denizen(
    schema: &ChoiceSchema,
    response: &ChoiceResponse,
) -> Result<EntityId, FailReason> {
    match schema.selected(response, "denizen").first() {
        Some(ChoiceValue::Entity(id)) => Ok(*id),
        _ => Err(FailReason::Internal(
            "validated response is missing the denizen".to_string(),
        )),
    }
}

/// Pay a denizen one favor to muster two warbands into reserve.
#[derive(Debug)]
pub struct MusterAction {
    player: PlayerId,
    denizen: Option<EntityId>,
}

impl MusterAction {
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            denizen: None,
        }
    }
}

impl Action for MusterAction {
    fn player(&self) -> PlayerId {
        self.player
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Muster
    }

    fn message(&self) -> String {
        "Choose a denizen to muster with".to_string()
    }

    fn start(&mut self, game: &GameState) -> Result<ChoiceSchema, FailReason> {
        let options = denizens_at_site(game, self.player)?;
        if options.is_empty() {
            return Err(FailReason::Rejected(
                "No revealed denizen here to muster with".to_string(),
            ));
        }
        let mut schema = ChoiceSchema::new();
        schema.add_field("denizen", SelectField::one_of(options));
        Ok(schema)
    }

    fn apply_parameters(
        &mut self,
        schema: &ChoiceSchema,
        response: &ChoiceResponse,
    ) -> Result<(), FailReason> {
        self.denizen = Some(chosen_denizen(schema, response)?);
        Ok(())
    }

    fn execute(
        &mut self,
        game: &mut GameState,
        ctx: &mut ActionContext,
    ) -> Result<(), FailReason> {
        let denizen = self.denizen.ok_or_else(|| {
            FailReason::Internal("muster executed without parameters".to_string())
        })?;
        let board = game.player(self.player)?.board;
        // A short purse fails the required take, rolling the whole muster
        // back; the decision is then re-offered.
        ctx.resolve(
            game,
            Box::new(TakeResourcesEffect::required(
                board,
                ResourceKind::Favor,
                1,
                self.player,
            )),
        )?;
        ctx.resolve(
            game,
            Box::new(PutResourcesEffect::new(denizen, ResourceKind::Favor, 1)),
        )?;
        ctx.resolve(
            game,
            Box::new(PutWarbandsEffect::new(board, Some(self.player), 2)),
        )?;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Trade with a denizen: flip a secret face-down for two favor.
#[derive(Debug)]
pub struct TradeAction {
    player: PlayerId,
    denizen: Option<EntityId>,
}

impl TradeAction {
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            denizen: None,
        }
    }
}

impl Action for TradeAction {
    fn player(&self) -> PlayerId {
        self.player
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Trade
    }

    fn message(&self) -> String {
        "Choose a denizen to trade with".to_string()
    }

    fn start(&mut self, game: &GameState) -> Result<ChoiceSchema, FailReason> {
        let options = denizens_at_site(game, self.player)?;
        if options.is_empty() {
            return Err(FailReason::Rejected(
                "No revealed denizen here to trade with".to_string(),
            ));
        }
        let mut schema = ChoiceSchema::new();
        schema.add_field("denizen", SelectField::one_of(options));
        Ok(schema)
    }

    fn apply_parameters(
        &mut self,
        schema: &ChoiceSchema,
        response: &ChoiceResponse,
    ) -> Result<(), FailReason> {
        self.denizen = Some(chosen_denizen(schema, response)?);
        Ok(())
    }

    fn execute(
        &mut self,
        game: &mut GameState,
        ctx: &mut ActionContext,
    ) -> Result<(), FailReason> {
        let board = game.player(self.player)?.board;
        let available = game.purse(self.player, ResourceKind::Secret);
        if available < 1 {
            return Err(FailReason::CannotAfford {
                entity: board,
                kind: ResourceKind::Secret,
                needed: 1,
                available,
            });
        }
        ctx.resolve(game, Box::new(FlipSecretsEffect::flip_down(board, 1)))?;
        ctx.resolve(
            game,
            Box::new(PutResourcesEffect::new(board, ResourceKind::Favor, 2)),
        )?;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
