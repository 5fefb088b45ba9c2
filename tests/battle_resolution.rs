//! End-to-end battle resolution through the engine: declaration, targeting,
//! rolling, sacrifice and settlement.
//!
//! Dice are seeded but the tests stay outcome-independent by committing
//! zero attack dice and driving the attack value through power bonuses,
//! so every assertion is deterministic.

use covenant::entity::Entity;
use covenant::powers::cards;
use covenant::{
    BannerKind, ChoiceRequest, ChoiceResponse, DeclareDefenderAction, Engine, EngineStatus,
    EntityId, EntityKind, GameState, PlayerId, PowerRegistry, standard_registry,
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

fn awaiting(status: &EngineStatus) -> &ChoiceRequest {
    match status {
        EngineStatus::AwaitingChoice(request) => request,
        EngineStatus::Idle => panic!("engine is idle, expected a pending choice"),
    }
}

/// Two players: Ada's pawn at Harbor (ruled by Bram), Bram's pawn at Keep.
fn two_player_game(registry: PowerRegistry) -> (GameState, PlayerId, PlayerId, EntityId) {
    let mut game = GameState::new(7, registry);
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

fn give_warbands(game: &mut GameState, holder: EntityId, owner: PlayerId, amount: u32) {
    game.entity_mut(holder)
        .unwrap()
        .ledger
        .put_warbands(Some(owner), amount);
}

fn give_adviser(game: &mut GameState, player: PlayerId, card: covenant::CardId, name: &str) {
    let id = game.alloc_id();
    game.insert(Entity::new(id, EntityKind::Adviser, name).with_card(card))
        .unwrap();
    game.player_mut(player).unwrap().advisers.push(id);
}

#[test]
fn test_successful_campaign_seizes_the_site() {
    let (mut game, ada, bram, harbor) = two_player_game(standard_registry().unwrap());
    let board = game.player(ada).unwrap().board;
    give_warbands(&mut game, board, ada, 2);
    give_warbands(&mut game, harbor, bram, 1);
    give_adviser(&mut game, ada, cards::LONGBOWS, "Longbows");

    let mut engine = Engine::new();
    engine.push(Box::new(DeclareDefenderAction::new(ada)));

    let status = engine.run(&mut game).unwrap();
    let request = awaiting(&status);
    assert_eq!(request.player, ada);
    assert!(request.schema.field("defender").is_some());

    let status = engine
        .submit(&mut game, respond(&[("defender", &["Bram"])]))
        .unwrap();
    let request = awaiting(&status);
    assert!(request.schema.field("targets").is_some());
    assert!(request.schema.field("pool").is_some());

    // Commit no dice; Longbows supplies the attack value.
    let status = engine
        .submit(
            &mut game,
            respond(&[("targets", &["Harbor"]), ("pool", &["0"])]),
        )
        .unwrap();
    let request = awaiting(&status);
    assert!(request.schema.field("modifiers").is_some());

    let status = engine
        .submit(&mut game, respond(&[("modifiers", &["Longbows"])]))
        .unwrap();
    assert_eq!(status, EngineStatus::Idle);

    // Attack 2 (Longbows) against defense 1 (one defending warband).
    assert!(game.battle.is_none());
    assert_eq!(game.battle_log.len(), 1);
    let battle = &game.battle_log[0];
    assert!(battle.successful());
    assert_eq!(battle.attack_value(), 2);
    assert_eq!(battle.defense_value(), 1);

    assert_eq!(game.entity(harbor).unwrap().ruler, Some(ada));
    // One defender halves to zero losses; the attacker rolled no skulls.
    assert_eq!(game.warbands_at(harbor, Some(bram)), 1);
    assert_eq!(game.entity(board).unwrap().ledger.warbands(Some(ada)), 2);
}

#[test]
fn test_sacrifice_turns_defeat_into_victory() {
    let (mut game, ada, bram, harbor) = two_player_game(standard_registry().unwrap());
    let board = game.player(ada).unwrap().board;
    give_warbands(&mut game, board, ada, 5);
    give_warbands(&mut game, harbor, bram, 2);

    let mut engine = Engine::new();
    engine.push(Box::new(DeclareDefenderAction::new(ada)));
    engine.run(&mut game).unwrap();
    engine
        .submit(&mut game, respond(&[("defender", &["Bram"])]))
        .unwrap();
    // Attack 0 against defense 2: three warbands bridge the gap, and five
    // survivors can afford it, so the sacrifice is offered.
    let status = engine
        .submit(
            &mut game,
            respond(&[("targets", &["Harbor"]), ("pool", &["0"])]),
        )
        .unwrap();
    let request = awaiting(&status);
    assert!(request.schema.field("sacrifice").is_some());
    assert_eq!(game.battle.as_ref().unwrap().required_sacrifice(), 3);

    let status = engine
        .submit(&mut game, respond(&[("sacrifice", &["Sacrifice 3 warbands"])]))
        .unwrap();
    assert_eq!(status, EngineStatus::Idle);

    assert_eq!(game.entity(harbor).unwrap().ruler, Some(ada));
    assert_eq!(game.entity(board).unwrap().ledger.warbands(Some(ada)), 2);
    // Two defenders halve to one loss.
    assert_eq!(game.warbands_at(harbor, Some(bram)), 1);
    assert!(game.battle_log[0].successful());
}

#[test]
fn test_relenting_loses_the_battle() {
    let (mut game, ada, bram, harbor) = two_player_game(standard_registry().unwrap());
    let board = game.player(ada).unwrap().board;
    give_warbands(&mut game, board, ada, 5);
    give_warbands(&mut game, harbor, bram, 2);

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
        .submit(&mut game, respond(&[("sacrifice", &["Relent"])]))
        .unwrap();
    assert_eq!(status, EngineStatus::Idle);

    // The defender keeps the site; the attacker loses half their force.
    assert_eq!(game.entity(harbor).unwrap().ruler, Some(bram));
    assert_eq!(game.entity(board).unwrap().ledger.warbands(Some(ada)), 3);
    assert_eq!(game.warbands_at(harbor, Some(bram)), 2);
    assert!(!game.battle_log[0].successful());
}

#[test]
fn test_unaffordable_sacrifice_is_not_offered() {
    let (mut game, ada, bram, harbor) = two_player_game(standard_registry().unwrap());
    let board = game.player(ada).unwrap().board;
    give_warbands(&mut game, board, ada, 3);
    give_warbands(&mut game, harbor, bram, 2);

    let mut engine = Engine::new();
    engine.push(Box::new(DeclareDefenderAction::new(ada)));
    engine.run(&mut game).unwrap();
    engine
        .submit(&mut game, respond(&[("defender", &["Bram"])]))
        .unwrap();
    // Required sacrifice is 3 against 3 survivors: not offered, the battle
    // settles as a loss immediately.
    let status = engine
        .submit(
            &mut game,
            respond(&[("targets", &["Harbor"]), ("pool", &["0"])]),
        )
        .unwrap();
    assert_eq!(status, EngineStatus::Idle);

    assert_eq!(game.entity(harbor).unwrap().ruler, Some(bram));
    assert_eq!(game.entity(board).unwrap().ledger.warbands(Some(ada)), 2);
    assert!(!game.battle_log[0].successful());
}

#[test]
fn test_campaign_against_bandits() {
    let (mut game, ada, _bram, _harbor) = two_player_game(standard_registry().unwrap());
    let camp = game.alloc_id();
    let mut entity = Entity::new(camp, EntityKind::Site, "Camp");
    entity.ledger.put_warbands(None, 1);
    game.insert(entity).unwrap();
    game.player_mut(ada).unwrap().site = Some(camp);
    let board = game.player(ada).unwrap().board;
    give_warbands(&mut game, board, ada, 1);
    give_adviser(&mut game, ada, cards::LONGBOWS, "Longbows");

    let mut engine = Engine::new();
    engine.push(Box::new(DeclareDefenderAction::new(ada)));
    engine.run(&mut game).unwrap();
    engine
        .submit(&mut game, respond(&[("defender", &["Bandits"])]))
        .unwrap();
    engine
        .submit(
            &mut game,
            respond(&[("targets", &["Camp"]), ("pool", &["0"])]),
        )
        .unwrap();
    let status = engine
        .submit(&mut game, respond(&[("modifiers", &["Longbows"])]))
        .unwrap();
    assert_eq!(status, EngineStatus::Idle);

    assert_eq!(game.entity(camp).unwrap().ruler, Some(ada));
    assert!(game.battle_log[0].successful());
}

#[test]
fn test_claim_bonus_and_position_defense() {
    let (mut game, ada, bram, harbor) = two_player_game(standard_registry().unwrap());
    // Bram stands at Harbor with the banner; attacking it brings his whole
    // force to the defense, and the usurped claim rolls two extra dice.
    game.player_mut(bram).unwrap().site = Some(harbor);
    game.usurper = true;
    let banner = game.alloc_id();
    game.insert(
        Entity::new(banner, EntityKind::Banner, "People's Favor")
            .with_ruler(bram)
            .with_banner(BannerKind::PeoplesFavor),
    )
    .unwrap();
    let bram_board = game.player(bram).unwrap().board;
    give_warbands(&mut game, bram_board, bram, 2);
    give_warbands(&mut game, harbor, bram, 1);
    let board = game.player(ada).unwrap().board;
    give_warbands(&mut game, board, ada, 1);
    // Longbows keeps the roll step suspended on the modifier offer, so the
    // declared plan can be inspected before any dice move.
    give_adviser(&mut game, ada, cards::LONGBOWS, "Longbows");

    let mut engine = Engine::new();
    engine.push(Box::new(DeclareDefenderAction::new(ada)));
    engine.run(&mut game).unwrap();
    engine
        .submit(&mut game, respond(&[("defender", &["Bram"])]))
        .unwrap();
    let status = engine
        .submit(
            &mut game,
            respond(&[
                ("targets", &["Harbor", "People's Favor"]),
                ("pool", &["0"]),
            ]),
        )
        .unwrap();
    awaiting(&status);

    let battle = game.battle.as_ref().unwrap();
    assert_eq!(battle.targets.len(), 2);
    assert_eq!(battle.defense_pool, 2);
    assert_eq!(battle.defender_force, 3);
}
