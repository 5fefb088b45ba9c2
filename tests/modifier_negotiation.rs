//! Modifier discovery and negotiation: offers, must-use application,
//! cost payment, schema rewriting and mutual-cancellation exclusion.

use covenant::action::ActionKind;
use covenant::battle::BattleResult;
use covenant::entity::Entity;
use covenant::modifier::{
    ActionHooks, ModifierCost, ModifierHooks, ModifierTarget, discover_for_action,
};
use covenant::powers::cards;
use covenant::{
    CardId, ChoiceResponse, DeclareDefenderAction, Engine, EngineError, EngineStatus, EntityId,
    EntityKind, FailReason, GameState, PlayerId, PowerRegistry, ResourceKind, standard_registry,
};

fn respond(entries: &[(&str, &[&str])]) -> ChoiceResponse {
    entries
        .iter()
        .map(|(field, labels)| {
            (
                field.to_string(),
                labels.iter().map(|l| l.to_string()).collect(),
            )
        })
        .collect()
}

fn two_player_game() -> (GameState, PlayerId, PlayerId, EntityId) {
    let mut game = GameState::new(19, standard_registry().unwrap());
    let ada = game.add_player("Ada");
    let bram = game.add_player("Bram");
    let harbor = game.alloc_id();
    game.insert(Entity::new(harbor, EntityKind::Site, "Harbor").with_ruler(bram))
        .unwrap();
    let keep = game.alloc_id();
    game.insert(Entity::new(keep, EntityKind::Site, "Keep").with_ruler(bram))
        .unwrap();
    game.player_mut(ada).unwrap().site = Some(harbor);
    game.player_mut(bram).unwrap().site = Some(keep);
    (game, ada, bram, harbor)
}

fn give_adviser(game: &mut GameState, player: PlayerId, card: CardId, name: &str) -> EntityId {
    let id = game.alloc_id();
    game.insert(Entity::new(id, EntityKind::Adviser, name).with_card(card))
        .unwrap();
    game.player_mut(player).unwrap().advisers.push(id);
    id
}

#[test]
fn test_feuding_captains_cancel_each_other_out() {
    let (mut game, ada, _bram, _harbor) = two_player_game();
    give_adviser(&mut game, ada, cards::FEUDING_CAPTAIN_RED, "Feuding Captain (Red)");
    give_adviser(&mut game, ada, cards::FEUDING_CAPTAIN_BLUE, "Feuding Captain (Blue)");
    game.battle = Some(BattleResult::new(ada));

    let discovered = discover_for_action(&game, ActionKind::RollBattleDice);
    assert!(discovered.must_use.is_empty());
    // Mutual cancellation is a cycle: both captains are excluded.
    assert!(discovered.optional.is_empty());
}

#[test]
fn test_lone_captain_survives_discovery() {
    let (mut game, ada, _bram, _harbor) = two_player_game();
    give_adviser(&mut game, ada, cards::FEUDING_CAPTAIN_RED, "Feuding Captain (Red)");
    game.battle = Some(BattleResult::new(ada));

    let discovered = discover_for_action(&game, ActionKind::RollBattleDice);
    assert_eq!(discovered.optional.len(), 1);
    assert_eq!(discovered.optional[0].name, "Feuding Captain (Red)");
}

#[test]
fn test_must_use_power_applies_without_being_offered() {
    let (mut game, ada, bram, harbor) = two_player_game();
    let board = game.player(ada).unwrap().board;
    game.entity_mut(board)
        .unwrap()
        .ledger
        .put_warbands(Some(ada), 2);
    game.entity_mut(harbor)
        .unwrap()
        .ledger
        .put_warbands(Some(bram), 2);
    give_adviser(&mut game, ada, cards::LONGBOWS, "Longbows");
    give_adviser(&mut game, ada, cards::FEUDING_CAPTAIN_RED, "Feuding Captain (Red)");
    give_adviser(&mut game, bram, cards::MARTYRS, "Martyrs");

    let mut engine = Engine::new();
    engine.push(Box::new(DeclareDefenderAction::new(ada)));
    engine.run(&mut game).unwrap();
    engine
        .submit(&mut game, respond(&[("defender", &["Bram"])]))
        .unwrap();
    engine
        .submit(
            &mut game,
            respond(&[("targets", &["Harbor"]), ("pool", &["0"])]),
        )
        .unwrap();
    // Attack 3 (Longbows + captain) against defense 2: the campaign wins.
    // Martyrs is must-use on the settlement, so it was never offered and
    // the settlement ran without a prompt.
    let status = engine
        .submit(
            &mut game,
            respond(&[("modifiers", &["Longbows", "Feuding Captain (Red)"])]),
        )
        .unwrap();
    assert_eq!(status, EngineStatus::Idle);

    assert_eq!(game.entity(harbor).unwrap().ruler, Some(ada));
    assert!(game.battle_log[0].successful());
    // Martyrs: the defeated defenders lose nothing.
    assert_eq!(game.warbands_at(harbor, Some(bram)), 2);
}

#[test]
fn test_chosen_power_pays_its_owner_cost() {
    let (mut game, ada, bram, harbor) = two_player_game();
    let board = game.player(ada).unwrap().board;
    game.entity_mut(board)
        .unwrap()
        .ledger
        .put_warbands(Some(ada), 1);
    let bram_board = game.player(bram).unwrap().board;
    game.entity_mut(bram_board)
        .unwrap()
        .ledger
        .put_resource(ResourceKind::Favor, 2);
    give_adviser(&mut game, bram, cards::SHIELD_WALL, "Shield Wall");

    let mut engine = Engine::new();
    engine.push(Box::new(DeclareDefenderAction::new(ada)));
    engine.run(&mut game).unwrap();
    engine
        .submit(&mut game, respond(&[("defender", &["Bram"])]))
        .unwrap();
    engine
        .submit(
            &mut game,
            respond(&[("targets", &["Harbor"]), ("pool", &["0"])]),
        )
        .unwrap();
    let status = engine
        .submit(&mut game, respond(&[("modifiers", &["Shield Wall"])]))
        .unwrap();
    assert_eq!(status, EngineStatus::Idle);

    // Shield Wall cost one favor from its owner's purse, and its bonus
    // held the undefended site: attack 0 against defense 1.
    assert_eq!(game.purse(bram, ResourceKind::Favor), 1);
    assert_eq!(game.entity(harbor).unwrap().ruler, Some(bram));
    assert!(!game.battle_log[0].successful());
}

#[test]
fn test_unpayable_power_cost_rolls_the_decision_back() {
    let (mut game, ada, bram, harbor) = two_player_game();
    let board = game.player(ada).unwrap().board;
    game.entity_mut(board)
        .unwrap()
        .ledger
        .put_warbands(Some(ada), 1);
    give_adviser(&mut game, bram, cards::SHIELD_WALL, "Shield Wall");

    let mut engine = Engine::new();
    engine.push(Box::new(DeclareDefenderAction::new(ada)));
    engine.run(&mut game).unwrap();
    engine
        .submit(&mut game, respond(&[("defender", &["Bram"])]))
        .unwrap();
    engine
        .submit(
            &mut game,
            respond(&[("targets", &["Harbor"]), ("pool", &["0"])]),
        )
        .unwrap();
    // Bram cannot pay for Shield Wall: the roll step fails, rolls back and
    // is re-offered with no dice consumed.
    let err = engine
        .submit(&mut game, respond(&[("modifiers", &["Shield Wall"])]))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Domain(FailReason::CannotAfford { .. })
    ));
    assert!(game.battle.as_ref().unwrap().attack_faces.is_none());
    assert_eq!(game.entity(harbor).unwrap().ruler, Some(bram));

    // Declining the power instead lets the battle settle.
    let status = engine.run(&mut game).unwrap();
    assert!(matches!(status, EngineStatus::AwaitingChoice(_)));
    let status = engine.submit(&mut game, respond(&[])).unwrap();
    assert_eq!(status, EngineStatus::Idle);
    assert!(!game.battle_log[0].successful());
}

#[test]
fn test_powers_can_intercept_the_sacrifice_step() {
    let registry = PowerRegistry::builder()
        .power(
            CardId(9),
            "War Drums",
            ModifierTarget::Action(ActionKind::Sacrifice),
            false,
            ModifierCost::free(),
            None,
            None,
            ModifierHooks::Action(ActionHooks::default()),
        )
        .build()
        .unwrap();
    let mut game = GameState::new(19, registry);
    let ada = game.add_player("Ada");
    let bram = game.add_player("Bram");
    let harbor = game.alloc_id();
    game.insert(Entity::new(harbor, EntityKind::Site, "Harbor").with_ruler(bram))
        .unwrap();
    game.player_mut(ada).unwrap().site = Some(harbor);
    let board = game.player(ada).unwrap().board;
    game.entity_mut(board)
        .unwrap()
        .ledger
        .put_warbands(Some(ada), 5);
    game.entity_mut(harbor)
        .unwrap()
        .ledger
        .put_warbands(Some(bram), 2);
    give_adviser(&mut game, ada, CardId(9), "War Drums");

    let mut engine = Engine::new();
    engine.push(Box::new(DeclareDefenderAction::new(ada)));
    engine.run(&mut game).unwrap();
    engine
        .submit(&mut game, respond(&[("defender", &["Bram"])]))
        .unwrap();
    let status = engine
        .submit(
            &mut game,
            respond(&[("targets", &["Harbor"]), ("pool", &["0"])]),
        )
        .unwrap();

    // The sacrifice offer negotiates like any other decision, so the drums
    // are discovered and offered alongside the choice itself.
    let EngineStatus::AwaitingChoice(request) = &status else {
        panic!("expected the sacrifice offer to be pending");
    };
    assert!(request.schema.field("sacrifice").is_some());
    let labels: Vec<&str> = request
        .schema
        .field("modifiers")
        .unwrap()
        .options
        .iter()
        .map(|(label, _)| label.as_str())
        .collect();
    assert_eq!(labels, vec!["War Drums"]);

    // Declining the drums leaves the sacrifice itself intact.
    let status = engine
        .submit(
            &mut game,
            respond(&[("sacrifice", &["Sacrifice 3 warbands"])]),
        )
        .unwrap();
    assert_eq!(status, EngineStatus::Idle);
    assert_eq!(game.entity(harbor).unwrap().ruler, Some(ada));
}

#[test]
fn test_at_start_hook_rewrites_the_target_options() {
    let (mut game, ada, bram, harbor) = two_player_game();
    let board = game.player(ada).unwrap().board;
    game.entity_mut(board)
        .unwrap()
        .ledger
        .put_warbands(Some(ada), 1);
    let keep_id = game.alloc_id();
    game.insert(
        Entity::new(keep_id, EntityKind::Denizen, "Haunted Keep")
            .with_card(cards::HAUNTED_KEEP)
            .with_site(harbor),
    )
    .unwrap();
    let crown = game.alloc_id();
    game.insert(
        Entity::new(crown, EntityKind::Relic, "Crown")
            .with_ruler(bram)
            .with_site(harbor),
    )
    .unwrap();

    let mut engine = Engine::new();
    engine.push(Box::new(DeclareDefenderAction::new(ada)));
    engine.run(&mut game).unwrap();
    let status = engine
        .submit(&mut game, respond(&[("defender", &["Bram"])]))
        .unwrap();
    let EngineStatus::AwaitingChoice(request) = &status else {
        panic!("expected the target declaration to be pending");
    };
    // The haunted site is withdrawn from the options; only the relic
    // remains contestable.
    let labels: Vec<&str> = request
        .schema
        .field("targets")
        .unwrap()
        .options
        .iter()
        .map(|(label, _)| label.as_str())
        .collect();
    assert_eq!(labels, vec!["Crown"]);
}
