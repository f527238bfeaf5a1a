//! Integration tests for the publish, replay and fan-out paths.

use driftboard::{
    Board, BoardConfig, ManualClock, MemorySnapshotStore, Message, ServerEvent, SessionHandle,
    Timestamp,
};
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_millis(200);

fn memory_board() -> (Board, Arc<MemorySnapshotStore>, Arc<ManualClock>) {
    let store = Arc::new(MemorySnapshotStore::new());
    let clock = Arc::new(ManualClock::new(Timestamp(1_700_000_000_000)));
    let board = Board::with_store(BoardConfig::default(), store.clone(), clock.clone()).unwrap();
    (board, store, clock)
}

fn expect_replay(handle: &SessionHandle) -> Vec<Message> {
    match handle.recv_timeout(WAIT).unwrap() {
        ServerEvent::LoadMessages(messages) => messages,
        other => panic!("Expected LoadMessages, got {:?}", other),
    }
}

fn expect_chat(handle: &SessionHandle) -> Message {
    match handle.recv_timeout(WAIT).unwrap() {
        ServerEvent::ChatMessage(message) => message,
        other => panic!("Expected ChatMessage, got {:?}", other),
    }
}

fn assert_quiet(handle: &SessionHandle) {
    assert!(handle.recv_timeout(Duration::from_millis(20)).is_err());
}

// --- Fan-out ---

#[test]
fn test_every_session_gets_exactly_one_copy() {
    let (board, _, _) = memory_board();
    let hub = board.hub();

    let sessions: Vec<SessionHandle> = (0..5).map(|_| hub.subscribe().unwrap()).collect();
    for session in &sessions {
        assert!(expect_replay(session).is_empty());
    }

    let stored = hub.publish(sessions[2].id, json!({"text": "hello all"}));

    for session in &sessions {
        assert_eq!(expect_chat(session), stored);
        assert_quiet(session);
    }
}

#[test]
fn test_disconnect_isolates_only_that_session() {
    let (board, _, _) = memory_board();
    let hub = board.hub();

    let staying = hub.subscribe().unwrap();
    let leaving = hub.subscribe().unwrap();
    expect_replay(&staying);
    expect_replay(&leaving);

    assert!(hub.disconnect(leaving.id));
    let stored = hub.publish(staying.id, json!("after leave"));

    assert_eq!(expect_chat(&staying), stored);
    assert_quiet(&leaving);
    assert_eq!(hub.session_count(), 1);
}

#[test]
fn test_dropped_receiver_does_not_block_others() {
    let (board, _, _) = memory_board();
    let hub = board.hub();

    let gone = hub.subscribe().unwrap();
    let alive = hub.subscribe().unwrap();
    expect_replay(&alive);
    let gone_id = gone.id;
    drop(gone);

    let stored = hub.publish(alive.id, json!(1));
    assert_eq!(expect_chat(&alive), stored);
    assert!(!hub.is_connected(gone_id));
}

// --- Replay ---

#[test]
fn test_new_session_replays_backlog_before_broadcasts() {
    let (board, _, clock) = memory_board();
    let hub = board.hub();
    let publisher = hub.subscribe().unwrap();

    let mut backlog = Vec::new();
    for text in ["m1", "m2", "m3"] {
        backlog.push(hub.publish(publisher.id, json!(text)));
        clock.advance(Duration::from_millis(5));
    }

    let late = hub.subscribe().unwrap();
    let next = hub.publish(publisher.id, json!("m4"));

    assert_eq!(expect_replay(&late), backlog);
    assert_eq!(expect_chat(&late), next);
    assert_quiet(&late);
}

#[test]
fn test_replay_may_include_unswept_expired_messages() {
    let (board, _, clock) = memory_board();
    let hub = board.hub();
    let publisher = hub.subscribe().unwrap();
    hub.publish(publisher.id, json!("old"));

    clock.advance(Duration::from_secs(600));
    let before_sweep = hub.subscribe().unwrap();
    assert_eq!(expect_replay(&before_sweep).len(), 1);

    assert_eq!(board.sweep(), 1);
    let after_sweep = hub.subscribe().unwrap();
    assert!(expect_replay(&after_sweep).is_empty());
}

// --- Ordering under concurrency ---

#[test]
fn test_concurrent_publishers_seen_in_append_order() {
    let (board, _, _) = memory_board();
    let board = Arc::new(board);
    let observer = board.hub().subscribe().unwrap();
    expect_replay(&observer);

    let handles: Vec<_> = (0..4)
        .map(|p| {
            let board = Arc::clone(&board);
            thread::spawn(move || {
                let session = board.hub().subscribe().unwrap();
                for i in 0..25 {
                    board.hub().publish(session.id, json!({"p": p, "i": i}));
                    while session.try_recv().is_ok() {}
                }
                board.hub().disconnect(session.id);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let received: Vec<Message> = (0..100).map(|_| expect_chat(&observer)).collect();
    assert_eq!(received, board.ledger().list());
}

// --- Persistence ---

#[test]
fn test_snapshot_matches_ledger_after_publish_and_sweep() {
    let (board, store, clock) = memory_board();
    let hub = board.hub();
    let session = hub.subscribe().unwrap();

    hub.publish(session.id, json!("first"));
    clock.advance(Duration::from_secs(120));
    hub.publish(session.id, json!("second"));
    board.flush().unwrap();

    let persisted: Vec<Message> = serde_json::from_slice(&store.contents().unwrap()).unwrap();
    assert_eq!(persisted.len(), 2);

    clock.advance(Duration::from_secs(61));
    assert_eq!(board.sweep(), 1);
    board.flush().unwrap();

    let persisted: Vec<Message> = serde_json::from_slice(&store.contents().unwrap()).unwrap();
    assert_eq!(persisted, board.ledger().list());
    assert_eq!(persisted[0].content, json!("second"));
}

#[test]
fn test_restart_restores_messages_from_file() {
    let dir = TempDir::new().unwrap();
    let config = BoardConfig {
        snapshot_path: dir.path().join("messages.json"),
        ..Default::default()
    };

    let before = {
        let board = Board::open(config.clone()).unwrap();
        let session = board.hub().subscribe().unwrap();
        for i in 0..3 {
            board.hub().publish(session.id, json!({"n": i}));
        }
        board.ledger().list()
    };

    let raw = std::fs::read(dir.path().join("messages.json")).unwrap();
    let on_disk: Vec<serde_json::Value> = serde_json::from_slice(&raw).unwrap();
    assert_eq!(on_disk.len(), 3);
    assert!(on_disk[0]["timestamp"].is_i64());

    let board = Board::open(config).unwrap();
    let session = board.hub().subscribe().unwrap();
    assert_eq!(expect_replay(&session), before);
}
