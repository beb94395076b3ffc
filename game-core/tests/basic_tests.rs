mod common;

use common::*;
use game_core::Outcome;
use game_types::{GameResult, GameStatus, RealtimeEvent, RoomStatus, Symbol, WinCondition};

#[test]
fn test_room_match_to_horizontal_win() {
    let (mut room, owner, guest) = create_full_room();
    let mut game = room.start_game().unwrap();

    let applied = play_alternating(&mut game, &[1, 2, 3, 4], &[6, 7, 11]);
    assert!(matches!(
        applied.outcome,
        Outcome::Win {
            symbol: Symbol::X,
            condition: WinCondition::Horizontal,
            ..
        }
    ));
    assert_eq!(game.state.winner_id, Some(owner));

    let loser = applied.results.iter().find(|r| r.user_id == guest).unwrap();
    assert_eq!(loser.result, GameResult::Loss);

    room.game_ended(game.id());
    assert_eq!(room.room.status, RoomStatus::Playing);
    assert!(room.room.active_game_id.is_none());
}

#[test]
fn test_diagonal_scenario() {
    let (mut room, _, _) = create_full_room();
    let mut game = room.start_game().unwrap();
    let applied = play_alternating(&mut game, &[1, 7, 13], &[2, 3]);
    match applied.outcome {
        Outcome::Win { condition, line, .. } => {
            assert_eq!(condition, WinCondition::Diagonal);
            assert_eq!(line, vec![1, 7, 13]);
        }
        other => panic!("expected a diagonal win, got {:?}", other),
    }
}

#[test]
fn test_fifth_column_filled_by_o_keeps_game_running() {
    let (mut room, _, _) = create_full_room();
    let mut game = room.start_game().unwrap();
    let applied = play_alternating(&mut game, &[1, 12, 3], &[5, 10, 15]);
    assert_eq!(applied.outcome, Outcome::Continue);
    assert_eq!(game.state.status, GameStatus::Active);
    assert_eq!(game.state.winner_id, None);
}

#[test]
fn test_fifth_column_shape_keeps_game_running() {
    let (mut room, _, _) = create_full_room();
    let mut game = room.start_game().unwrap();
    // 5, 9, 13 slants out of column 5 and is not a winning diagonal.
    let applied = play_alternating(&mut game, &[5, 9, 13], &[1, 11]);
    assert_eq!(applied.outcome, Outcome::Continue);
    assert_eq!(game.state.status, GameStatus::Active);
}

#[test]
fn test_receiver_drops_stale_and_duplicate_events() {
    let (mut room, _, _) = create_full_room();
    let mut game = room.start_game().unwrap();
    let mut collector = EventCollector::default();

    collector.receive(game.started_event());
    let first = play_alternating(&mut game, &[1], &[]);
    let second = play_alternating(&mut game, &[], &[6]);

    // Deliver out of order and twice.
    for envelope in second.events.iter().chain(first.events.iter()).chain(second.events.iter()) {
        collector.receive(envelope.clone());
    }

    assert_eq!(collector.applied.len(), 2);
    assert!(matches!(collector.applied[0].event, RealtimeEvent::GameStarted { .. }));
    match &collector.applied[1].event {
        RealtimeEvent::Move { move_record, .. } => assert_eq!(move_record.move_number, 2),
        other => panic!("unexpected event {:?}", other),
    }
}
