//! End-to-end game flow through the public API.

use cluedo::game::cards::SUSPECTS;
use cluedo::game::events::GameEventData;
use cluedo::game::player::standard_roster;
use cluedo::network::protocol::{message_for_viewer, ServerMessage};
use cluedo::{ActionError, ErrorKind, GameConfig, GameSession, TurnState};

const NAMES: [&str; 3] = ["alice", "bob", "carol"];

fn started(seed: u64) -> GameSession {
    let mut game = GameSession::new(GameConfig::default());
    game.set_player_count(NAMES.len());
    let roster = standard_roster(&NAMES[..], game.board());
    game.start("alice", "alice", roster, seed).unwrap();
    game
}

/// Roll and stay put; outside a room this hands the turn on.
fn pass_turn(game: &mut GameSession, name: &str) {
    game.roll_dice(name).unwrap();
    game.move_player::<&str>(name, &[]).unwrap();
}

#[test]
fn test_full_game_to_correct_accusation() {
    let mut game = started(42);
    let solution = game.solution().cloned().unwrap();

    assert_eq!(game.state(), TurnState::PlayersTurnRollDice);
    assert_eq!(game.current_player().unwrap().name, "alice");
    for name in NAMES {
        assert_eq!(game.hand_of(name).unwrap().len(), 6);
    }

    pass_turn(&mut game, "alice");
    assert_eq!(game.current_player().unwrap().name, "bob");

    // Bob names the wrong suspect and is out.
    let wrong_suspect = SUSPECTS
        .iter()
        .find(|s| !s.eq_ignore_ascii_case(&solution.suspect.name))
        .unwrap();
    let outcome = game
        .accuse("bob", wrong_suspect, &solution.weapon.name, &solution.room.name)
        .unwrap();
    assert!(!outcome.correct);
    assert!(!outcome.game_over);
    assert!(!game.player("bob").unwrap().active);
    assert_eq!(game.current_player().unwrap().name, "carol");

    // Eliminated players are skipped.
    pass_turn(&mut game, "carol");
    assert_eq!(game.current_player().unwrap().name, "alice");

    let err = game.roll_dice("bob").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalState);

    let outcome = game
        .accuse("alice", &solution.suspect.name, &solution.weapon.name, &solution.room.name)
        .unwrap();
    assert!(outcome.correct);
    assert!(outcome.game_over);
    assert_eq!(outcome.winner.as_deref(), Some("alice"));
    assert_eq!(game.state(), TurnState::PlayerHasWon);
    assert_eq!(game.winner().unwrap().name, "alice");

    let events = game.take_events();
    for pair in events.windows(2) {
        assert_eq!(pair[1].sequence, pair[0].sequence + 1);
    }
    match &events.last().unwrap().data {
        GameEventData::GameEnded { winner, solution: revealed } => {
            assert_eq!(winner.as_deref(), Some("alice"));
            assert_eq!(revealed.as_ref(), Some(&solution));
        }
        other => panic!("unexpected final event {:?}", other),
    }

    match message_for_viewer(events.last().unwrap(), Some("carol")) {
        ServerMessage::GameEnd(info) => {
            let revealed = info.solution.unwrap();
            assert_eq!(revealed.room, solution.room.name);
        }
        other => panic!("Wrong message type: {:?}", other),
    }

    // Nothing is accepted after the end.
    assert!(matches!(
        game.roll_dice("carol"),
        Err(ActionError::WrongState { .. })
    ));
}

#[test]
fn test_last_player_standing_ends_without_winner() {
    let mut game = started(7);
    let solution = game.solution().cloned().unwrap();
    let wrong_suspect = SUSPECTS
        .iter()
        .find(|s| !s.eq_ignore_ascii_case(&solution.suspect.name))
        .unwrap();

    game.accuse("alice", wrong_suspect, &solution.weapon.name, &solution.room.name)
        .unwrap();
    let outcome = game
        .accuse("bob", wrong_suspect, &solution.weapon.name, &solution.room.name)
        .unwrap();

    assert!(outcome.game_over);
    assert_eq!(game.state(), TurnState::PlayerHasWon);
    assert!(game.winner().is_none());
}

#[test]
fn test_same_seed_same_game() {
    let mut a = started(1234);
    let mut b = started(1234);
    assert_eq!(a.solution(), b.solution());
    assert_eq!(a.compute_hash(), b.compute_hash());

    for game in [&mut a, &mut b] {
        pass_turn(game, "alice");
        pass_turn(game, "bob");
    }
    assert_eq!(a.snapshot(), b.snapshot());
    assert_eq!(a.take_events(), b.take_events());
}

#[test]
fn test_rejected_action_changes_nothing() {
    let mut game = started(99);
    game.take_events();
    let before = game.snapshot();

    let err = game.move_player("alice", &["up"][..]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalState);
    let err = game.accuse("alice", "Nobody", "Rope", "Study").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let err = game.suggest("alice", "Mrs. White", "Rope").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalState);

    assert_eq!(game.snapshot(), before);
    assert!(game.take_events().is_empty());
}
