//! Battle resolution: the campaign record and its decision chain.
//!
//! A battle is resolved as a fixed chain of decisions, each a separate
//! suspension point: declare the defender, declare targets and commit
//! forces, roll the dice, optionally sacrifice, then settle losses and
//! seizures. Every step mutates game truth only through effects, so a
//! failure in any step rolls that step back completely and re-offers it.
//!
//! The `BattleResult` record is installed by `OpenBattleEffect`, filled in
//! step by step, and finally moved to the battle log by `CloseBattleEffect`.
//! Valuation (`attack_value`, `defense_value`, `required_sacrifice`) is
//! pure over the recorded fields, so it can be recomputed at any point and
//! by any modifier hook.

use crate::action::{Action, ActionKind};
use crate::choice::{ChoiceResponse, ChoiceSchema, ChoiceValue, SelectField};
use crate::dice::{self, AttackFace, DefenseFace};
use crate::effect::{Effect, FailReason};
use crate::effects::{
    BattleFlagEffect, BattlePlanEffect, CloseBattleEffect, KillWarbandsEffect, OpenBattleEffect,
    RollDiceEffect, SeizeEffect,
};
use crate::engine::ActionContext;
use crate::game_state::GameState;
use crate::ids::{EntityId, PlayerId};
use crate::ledger::WarbandOwner;

// ============================================================================
// Battle Record
// ============================================================================

/// Flags modifier hooks may raise on a battle to alter its settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleFlag {
    /// The attacker paid the sacrifice, winning a battle the dice lost.
    SacrificePaid,
    AttackerLosesNothing,
    AttackerLosesAll,
    DefenderLosesNothing,
    DefenderLosesAll,
}

/// The record of one campaign, active from declaration to settlement.
#[derive(Debug, Clone)]
pub struct BattleResult {
    pub attacker: PlayerId,
    /// The defending player, or `None` for the bandit side.
    pub defender: Option<PlayerId>,
    /// Targeted sites, relics and banners, seized together on success.
    pub targets: Vec<EntityId>,
    /// Attack dice committed (chosen by the attacker, up to their force).
    pub attack_pool: u32,
    /// Defense dice: target defense values plus any claim bonus.
    pub defense_pool: u32,
    /// The attacker's deployable force when the battle opened.
    pub attacker_force: u32,
    /// Defending warbands across the targeted sites.
    pub defender_force: u32,
    pub attack_faces: Option<Vec<AttackFace>>,
    pub defense_faces: Option<Vec<DefenseFace>>,
    pub attack_bonus: i32,
    pub defense_bonus: i32,
    flags: Vec<BattleFlag>,
    /// Final losses, written when the battle closes.
    pub attacker_losses: u32,
    pub defender_losses: u32,
    /// Effects queued by modifier hooks to resolve during settlement, in
    /// queue order.
    pub aftermath: Vec<Box<dyn Effect>>,
}

impl BattleResult {
    pub fn new(attacker: PlayerId) -> Self {
        Self {
            attacker,
            defender: None,
            targets: Vec::new(),
            attack_pool: 0,
            defense_pool: 0,
            attacker_force: 0,
            defender_force: 0,
            attack_faces: None,
            defense_faces: None,
            attack_bonus: 0,
            defense_bonus: 0,
            flags: Vec::new(),
            attacker_losses: 0,
            defender_losses: 0,
            aftermath: Vec::new(),
        }
    }

    pub fn flag(&self, flag: BattleFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn set_flag(&mut self, flag: BattleFlag, value: bool) {
        if value {
            if !self.flags.contains(&flag) {
                self.flags.push(flag);
            }
        } else {
            self.flags.retain(|f| *f != flag);
        }
    }

    /// Total attack value: rolled swords plus bonuses, never below zero.
    pub fn attack_value(&self) -> u32 {
        let rolled = self.attack_faces.as_deref().map(dice::attack_value).unwrap_or(0);
        (rolled as i32 + self.attack_bonus).max(0) as u32
    }

    /// Skulls rolled; each costs the attacker a warband at settlement.
    pub fn skulls(&self) -> u32 {
        self.attack_faces.as_deref().map(dice::skull_count).unwrap_or(0)
    }

    /// Total defense value: rolled shields plus the defending force plus
    /// bonuses, never below zero.
    pub fn defense_value(&self) -> u32 {
        let rolled = self.defense_faces.as_deref().map(dice::defense_value).unwrap_or(0);
        (rolled as i32 + self.defender_force as i32 + self.defense_bonus).max(0) as u32
    }

    /// Warbands the attacker must sacrifice to turn defeat into victory.
    /// Zero once the attack value strictly exceeds the defense value.
    pub fn required_sacrifice(&self) -> u32 {
        let attack = self.attack_value();
        let defense = self.defense_value();
        if attack > defense { 0 } else { defense - attack + 1 }
    }

    /// Whether the attacker wins. Meaningful only after both pools rolled.
    pub fn successful(&self) -> bool {
        if self.attack_faces.is_none() || self.defense_faces.is_none() {
            return false;
        }
        self.flag(BattleFlag::SacrificePaid) || self.attack_value() > self.defense_value()
    }

    /// Queue an effect to resolve during settlement.
    pub fn queue_aftermath(&mut self, effect: Box<dyn Effect>) {
        self.aftermath.push(effect);
    }
}

fn active_battle(game: &GameState) -> Result<&BattleResult, FailReason> {
    game.battle.as_ref().ok_or(FailReason::NoActiveBattle)
}

// ============================================================================
// Step 1: Declare Defender
// ============================================================================

/// The opening decision of a campaign: pick who to fight.
#[derive(Debug)]
pub struct DeclareDefenderAction {
    player: PlayerId,
    /// `None` until parameters are applied; the inner `None` is the bandit
    /// side.
    defender: Option<Option<PlayerId>>,
}

impl DeclareDefenderAction {
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            defender: None,
        }
    }
}

impl Action for DeclareDefenderAction {
    fn player(&self) -> PlayerId {
        self.player
    }

    fn kind(&self) -> ActionKind {
        ActionKind::DeclareDefender
    }

    fn message(&self) -> String {
        "Choose a defender to campaign against".to_string()
    }

    fn start(&mut self, game: &GameState) -> Result<ChoiceSchema, FailReason> {
        if game.player(self.player)?.site.is_none() {
            return Err(FailReason::Rejected(
                "A campaign needs the attacker at a site".to_string(),
            ));
        }
        let mut options: Vec<(String, ChoiceValue)> = game
            .players
            .iter()
            .filter(|p| p.id != self.player)
            .map(|p| (p.name.clone(), ChoiceValue::Player(Some(p.id))))
            .collect();
        options.push(("Bandits".to_string(), ChoiceValue::Player(None)));
        let mut schema = ChoiceSchema::new();
        schema.add_field("defender", SelectField::one_of(options));
        Ok(schema)
    }

    fn apply_parameters(
        &mut self,
        schema: &ChoiceSchema,
        response: &ChoiceResponse,
    ) -> Result<(), FailReason> {
        match schema.selected(response, "defender").first() {
            Some(ChoiceValue::Player(defender)) => {
                self.defender = Some(*defender);
                Ok(())
            }
            _ => Err(FailReason::Internal(
                "validated response is missing the defender".to_string(),
            )),
        }
    }

    fn execute(
        &mut self,
        game: &mut GameState,
        ctx: &mut ActionContext,
    ) -> Result<(), FailReason> {
        let defender = self.defender.ok_or_else(|| {
            FailReason::Internal("defender declared without parameters".to_string())
        })?;
        let mut battle = BattleResult::new(self.player);
        battle.defender = defender;
        battle.attacker_force = game.deployable_force(self.player);
        ctx.resolve(game, Box::new(OpenBattleEffect::new(battle)))?;
        ctx.push_next(Box::new(DeclareTargetsAction::new(self.player)));
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ============================================================================
// Step 2: Declare Targets
// ============================================================================

/// Pick what to fight over and how many dice to commit.
///
/// Eligible targets are targetable entities ruled by the declared defender
/// and co-located with the attacker's pawn. The defense pool is derived
/// from the chosen targets, so it is computed here rather than chosen.
#[derive(Debug)]
pub struct DeclareTargetsAction {
    player: PlayerId,
    targets: Vec<EntityId>,
    pool: u32,
}

impl DeclareTargetsAction {
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            targets: Vec::new(),
            pool: 0,
        }
    }
}

impl Action for DeclareTargetsAction {
    fn player(&self) -> PlayerId {
        self.player
    }

    fn kind(&self) -> ActionKind {
        ActionKind::DeclareTargets
    }

    fn message(&self) -> String {
        "Choose campaign targets and the dice to commit".to_string()
    }

    fn start(&mut self, game: &GameState) -> Result<ChoiceSchema, FailReason> {
        let battle = active_battle(game)?;
        let defender = battle.defender;
        let site = game.player(self.player)?.site.ok_or_else(|| {
            FailReason::Rejected("A campaign needs the attacker at a site".to_string())
        })?;

        let targets: Vec<(String, ChoiceValue)> = game
            .entities()
            .filter(|e| e.is_targetable())
            .filter(|e| e.ruler == defender)
            .filter(|e| game.entity_site(e.id) == Some(site))
            .map(|e| (e.name.clone(), ChoiceValue::Entity(e.id)))
            .collect();
        if targets.is_empty() {
            return Err(FailReason::InvalidTarget(
                "nothing here is ruled by the defender".to_string(),
            ));
        }

        let force = game.deployable_force(self.player);
        let pools: Vec<(String, ChoiceValue)> = (0..=force)
            .map(|n| (n.to_string(), ChoiceValue::Number(n)))
            .collect();

        let mut schema = ChoiceSchema::new();
        let max = targets.len();
        schema.add_field("targets", SelectField::between(targets, 1, max));
        schema.add_field("pool", SelectField::one_of(pools));
        Ok(schema)
    }

    fn apply_parameters(
        &mut self,
        schema: &ChoiceSchema,
        response: &ChoiceResponse,
    ) -> Result<(), FailReason> {
        self.targets = schema
            .selected(response, "targets")
            .into_iter()
            .filter_map(|v| match v {
                ChoiceValue::Entity(id) => Some(id),
                _ => None,
            })
            .collect();
        self.pool = match schema.selected(response, "pool").first() {
            Some(ChoiceValue::Number(n)) => *n,
            _ => {
                return Err(FailReason::Internal(
                    "validated response is missing the pool size".to_string(),
                ));
            }
        };
        Ok(())
    }

    fn execute(
        &mut self,
        game: &mut GameState,
        ctx: &mut ActionContext,
    ) -> Result<(), FailReason> {
        let battle = active_battle(game)?;
        let defender = battle.defender;

        // Defense dice: each target contributes its defense; a targeted
        // banner still ruled by the defender adds the claim bonus, doubled
        // while a usurper holds the contested claim.
        let mut defense_pool = 0;
        let mut claimed = false;
        for target in &self.targets {
            let entity = game.entity(*target)?;
            defense_pool += entity.defense;
            if entity.banner.is_some() && entity.ruler == defender {
                claimed = true;
            }
        }
        if claimed {
            defense_pool += if game.usurper { 2 } else { 1 };
        }

        // Defending force: the defender's warbands across the distinct
        // target sites. If their own position is under attack, their whole
        // deployable force joins in.
        let defender_site = defender
            .and_then(|d| game.player(d).ok())
            .and_then(|p| p.site);
        let mut sites: Vec<EntityId> = self
            .targets
            .iter()
            .filter_map(|t| game.entity_site(*t))
            .collect();
        sites.sort();
        sites.dedup();
        let mut defender_force = 0;
        let mut position_attacked = false;
        for site in sites {
            if Some(site) == defender_site {
                position_attacked = true;
            } else {
                defender_force += game.warbands_at(site, defender);
            }
        }
        if position_attacked {
            // Bandits have no pawn, so this only triggers for players.
            defender_force += match defender {
                Some(d) => game.deployable_force(d),
                None => 0,
            };
        }

        ctx.resolve(
            game,
            Box::new(BattlePlanEffect::new(
                self.targets.clone(),
                self.pool,
                defense_pool,
                defender_force,
            )),
        )?;
        ctx.push_next(Box::new(RollBattleDiceAction::new(self.player)));
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ============================================================================
// Step 3: Roll
// ============================================================================

/// Roll both pools. No choices of its own; it exists as a separate decision
/// so dice-modifying capabilities have a step to intercept.
#[derive(Debug)]
pub struct RollBattleDiceAction {
    player: PlayerId,
}

impl RollBattleDiceAction {
    pub fn new(player: PlayerId) -> Self {
        Self { player }
    }
}

impl Action for RollBattleDiceAction {
    fn player(&self) -> PlayerId {
        self.player
    }

    fn kind(&self) -> ActionKind {
        ActionKind::RollBattleDice
    }

    fn message(&self) -> String {
        "Roll the battle dice".to_string()
    }

    fn start(&mut self, game: &GameState) -> Result<ChoiceSchema, FailReason> {
        active_battle(game)?;
        Ok(ChoiceSchema::new())
    }

    fn apply_parameters(
        &mut self,
        _schema: &ChoiceSchema,
        _response: &ChoiceResponse,
    ) -> Result<(), FailReason> {
        Ok(())
    }

    fn execute(
        &mut self,
        game: &mut GameState,
        ctx: &mut ActionContext,
    ) -> Result<(), FailReason> {
        let battle = active_battle(game)?;
        let attack_pool = battle.attack_pool;
        let defense_pool = battle.defense_pool;
        ctx.resolve(game, Box::new(RollDiceEffect::attack(attack_pool)))?;
        ctx.resolve(game, Box::new(RollDiceEffect::defense(defense_pool)))?;

        let battle = active_battle(game)?;
        let required = battle.required_sacrifice();
        let survivors = battle.attacker_force.saturating_sub(battle.skulls());
        // The sacrifice is offered only when it would flip the result and
        // leave the attacker at least one warband standing.
        if required > 0 && required < survivors {
            ctx.push_next(Box::new(SacrificeAction::new(self.player)));
        } else {
            ctx.push_next(Box::new(EndBattleAction::new(self.player)));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ============================================================================
// Step 4: Sacrifice (offered only when it can flip the result)
// ============================================================================

/// Offer the attacker the sacrifice: kill the required warbands to win a
/// battle the dice lost.
#[derive(Debug)]
pub struct SacrificeAction {
    player: PlayerId,
    accepted: bool,
}

impl SacrificeAction {
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            accepted: false,
        }
    }
}

impl Action for SacrificeAction {
    fn player(&self) -> PlayerId {
        self.player
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Sacrifice
    }

    fn message(&self) -> String {
        "Sacrifice warbands to win the battle?".to_string()
    }

    fn start(&mut self, game: &GameState) -> Result<ChoiceSchema, FailReason> {
        let battle = active_battle(game)?;
        let required = battle.required_sacrifice();
        let mut schema = ChoiceSchema::new();
        schema.add_field(
            "sacrifice",
            SelectField::one_of(vec![
                (
                    format!("Sacrifice {} warbands", required),
                    ChoiceValue::Bool(true),
                ),
                ("Relent".to_string(), ChoiceValue::Bool(false)),
            ]),
        );
        Ok(schema)
    }

    fn apply_parameters(
        &mut self,
        schema: &ChoiceSchema,
        response: &ChoiceResponse,
    ) -> Result<(), FailReason> {
        match schema.selected(response, "sacrifice").first() {
            Some(ChoiceValue::Bool(accepted)) => {
                self.accepted = *accepted;
                Ok(())
            }
            _ => Err(FailReason::Internal(
                "validated response is missing the sacrifice choice".to_string(),
            )),
        }
    }

    fn execute(
        &mut self,
        game: &mut GameState,
        ctx: &mut ActionContext,
    ) -> Result<(), FailReason> {
        if self.accepted {
            ctx.resolve(
                game,
                Box::new(BattleFlagEffect::new(BattleFlag::SacrificePaid)),
            )?;
        }
        ctx.push_next(Box::new(EndBattleAction::new(self.player)));
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ============================================================================
// Step 5: Settle
// ============================================================================

/// Settle the battle: kill losses, seize targets on success, resolve any
/// queued aftermath, and close the record.
#[derive(Debug)]
pub struct EndBattleAction {
    player: PlayerId,
}

impl EndBattleAction {
    pub fn new(player: PlayerId) -> Self {
        Self { player }
    }
}

impl EndBattleAction {
    fn kill_sources(game: &GameState, owner: WarbandOwner, sites: &[EntityId]) -> Vec<EntityId> {
        let mut sources: Vec<EntityId> = sites.to_vec();
        if let Some(player) = owner
            && let Ok(p) = game.player(player)
        {
            sources.push(p.board);
        }
        sources
    }
}

impl Action for EndBattleAction {
    fn player(&self) -> PlayerId {
        self.player
    }

    fn kind(&self) -> ActionKind {
        ActionKind::EndBattle
    }

    fn message(&self) -> String {
        "Settle the battle".to_string()
    }

    fn start(&mut self, game: &GameState) -> Result<ChoiceSchema, FailReason> {
        active_battle(game)?;
        Ok(ChoiceSchema::new())
    }

    fn apply_parameters(
        &mut self,
        _schema: &ChoiceSchema,
        _response: &ChoiceResponse,
    ) -> Result<(), FailReason> {
        Ok(())
    }

    fn execute(
        &mut self,
        game: &mut GameState,
        ctx: &mut ActionContext,
    ) -> Result<(), FailReason> {
        let battle = active_battle(game)?.clone();
        if battle.attack_faces.is_none() || battle.defense_faces.is_none() {
            return Err(FailReason::Rejected(
                "The battle dice have not been rolled".to_string(),
            ));
        }
        let success = battle.successful();
        let paid = battle.flag(BattleFlag::SacrificePaid);

        let mut attacker_losses = 0;
        if !battle.flag(BattleFlag::AttackerLosesNothing) {
            attacker_losses += battle.skulls();
            if paid {
                attacker_losses += battle.required_sacrifice();
            }
            if !success {
                attacker_losses += if battle.flag(BattleFlag::AttackerLosesAll) {
                    battle.attacker_force
                } else {
                    battle.attacker_force / 2
                };
            }
        }
        let attacker_losses = attacker_losses.min(battle.attacker_force);

        let mut defender_losses = 0;
        if success && !battle.flag(BattleFlag::DefenderLosesNothing) {
            defender_losses = if battle.flag(BattleFlag::DefenderLosesAll) {
                battle.defender_force
            } else {
                battle.defender_force / 2
            };
        }

        let mut target_sites: Vec<EntityId> = battle
            .targets
            .iter()
            .filter_map(|t| game.entity_site(*t))
            .collect();
        target_sites.sort();
        target_sites.dedup();

        if attacker_losses > 0 {
            let attacker = game.player(self.player)?;
            let mut sources: Vec<EntityId> = attacker.site.into_iter().collect();
            sources.push(attacker.board);
            ctx.resolve(
                game,
                Box::new(KillWarbandsEffect::new(
                    Some(self.player),
                    sources,
                    attacker_losses,
                )),
            )?;
        }
        if defender_losses > 0 {
            let sources = Self::kill_sources(game, battle.defender, &target_sites);
            ctx.resolve(
                game,
                Box::new(KillWarbandsEffect::new(
                    battle.defender,
                    sources,
                    defender_losses,
                )),
            )?;
        }
        if success {
            for target in &battle.targets {
                ctx.resolve(game, Box::new(SeizeEffect::new(*target, self.player)))?;
            }
        }
        for effect in &battle.aftermath {
            ctx.resolve(game, effect.clone())?;
        }
        ctx.resolve(
            game,
            Box::new(CloseBattleEffect::new(attacker_losses, defender_losses)),
        )?;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
