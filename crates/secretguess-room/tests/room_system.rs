//! Integration tests for rooms driven through the registry and actors.

use std::time::Duration;

use secretguess_protocol::{ErrorKind, PlayerSlot, RoomCode, ServerMessage};
use secretguess_room::{
    MatchResult, Phase, PlayerIdentity, RoomConfig, RoomError, RoomOutbound, RoomRegistry, Seat,
};
use tokio::sync::mpsc;

use PlayerSlot::{First, Second};

type Inbox = mpsc::UnboundedReceiver<RoomOutbound>;

fn code(raw: &str) -> RoomCode {
    RoomCode::parse(raw).unwrap()
}

fn channel() -> (mpsc::UnboundedSender<RoomOutbound>, Inbox) {
    mpsc::unbounded_channel()
}

/// Everything queued on an inbox right now, messages only.
fn drain(inbox: &mut Inbox) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(item) = inbox.try_recv() {
        if let RoomOutbound::Message(msg) = item {
            out.push(msg);
        }
    }
    out
}

async fn seat(registry: &RoomRegistry, room: &str, slot: PlayerSlot, name: &str) -> (Seat, Inbox) {
    let (tx, rx) = channel();
    let seat = registry
        .occupy(&code(room), slot, name.into(), None, tx)
        .await
        .unwrap();
    (seat, rx)
}

async fn lock(seat: &Seat, secret: &str) -> Result<(), RoomError> {
    seat.room
        .lock_secret(seat.slot, seat.identity.clone(), secret.into())
        .await
}

async fn guess(seat: &Seat, code: &str) -> Result<(), RoomError> {
    seat.room
        .guess(seat.slot, seat.identity.clone(), code.into())
        .await
}

// =========================================================================
// Full matches
// =========================================================================

#[tokio::test]
async fn test_full_match_first_player_cracks_code() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (a, mut a_inbox) = seat(&registry, "AB123", First, "Ada").await;
    let (b, mut b_inbox) = seat(&registry, "ab123", Second, "Bo").await;

    lock(&a, "1234").await.unwrap();
    lock(&b, "5678").await.unwrap();

    let info = a.room.info().await.unwrap();
    assert_eq!(info.phase, Phase::InProgress);
    assert_eq!(info.turn, Some(First));

    drain(&mut a_inbox);
    drain(&mut b_inbox);
    guess(&a, "5678").await.unwrap();

    let seen = drain(&mut b_inbox);
    assert!(seen.contains(&ServerMessage::Feedback {
        by: First,
        guess: "5678".into(),
        attempt: 1,
        exact: 4,
        misplaced: 0,
    }));
    assert!(seen.contains(&ServerMessage::RevealSecret {
        a: "1234".into(),
        b: "5678".into(),
    }));
    assert!(seen.contains(&ServerMessage::GameOver {
        winner: Some(First),
        reason: "cracked".into(),
    }));
    assert_eq!(drain(&mut a_inbox), seen);
    assert_eq!(a.room.phase(), Phase::GameOver);
}

#[tokio::test]
async fn test_join_sends_identity_and_presence() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (a, mut a_inbox) = seat(&registry, "AB123", First, "Ada").await;

    let seen = drain(&mut a_inbox);
    assert_eq!(
        seen[0],
        ServerMessage::Joined {
            room: code("AB123"),
            slot: First,
            identity: a.identity.to_string(),
        }
    );
    assert!(
        seen.iter()
            .any(|m| matches!(m, ServerMessage::PlayerStatus { a: Some(_), b: None }))
    );
}

#[tokio::test]
async fn test_operations_are_gated_by_turn_and_seat() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (a, _ai) = seat(&registry, "GT100", First, "Ada").await;
    let (b, _bi) = seat(&registry, "GT100", Second, "Bo").await;
    lock(&a, "1234").await.unwrap();

    assert_eq!(lock(&a, "4321").await, Err(RoomError::AlreadyLocked));
    assert_eq!(
        lock(&b, "1123").await.map_err(|e| e.kind()),
        Err(ErrorKind::InvalidCode)
    );
    lock(&b, "5678").await.unwrap();

    assert_eq!(guess(&b, "1234").await, Err(RoomError::NotYourTurn(First)));

    let imposter = Seat {
        identity: PlayerIdentity::from_token("not-ada"),
        ..a.clone()
    };
    assert_eq!(guess(&imposter, "5678").await, Err(RoomError::NotSeated(First)));

    let info = a.room.info().await.unwrap();
    assert_eq!(info.attempts, [0, 0]);
    assert_eq!(info.secrets_locked, [true, true]);
}

#[tokio::test]
async fn test_occupied_slot_is_taken() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (_a, _ai) = seat(&registry, "ST200", First, "Ada").await;

    let (tx, _rx) = channel();
    let err = registry
        .occupy(&code("ST200"), First, "Eve".into(), None, tx)
        .await
        .unwrap_err();
    assert_eq!(err, RoomError::SlotTaken(First));
}

#[tokio::test]
async fn test_concurrent_claims_on_one_slot_seat_exactly_one() {
    let registry = RoomRegistry::new(RoomConfig::default());

    let mut tasks = Vec::new();
    for i in 0..8 {
        let registry = registry.clone();
        tasks.push(tokio::spawn(async move {
            let (tx, rx) = mpsc::unbounded_channel();
            let result = registry
                .occupy(&code("CC300"), First, format!("p{i}"), None, tx)
                .await;
            (result, rx)
        }));
    }

    let mut seated = 0;
    for task in tasks {
        match task.await.unwrap().0 {
            Ok(_) => seated += 1,
            Err(e) => assert_eq!(e, RoomError::SlotTaken(First)),
        }
    }
    assert_eq!(seated, 1);
    assert_eq!(registry.room_count().await, 1);
}

// =========================================================================
// Presence, reconnection and teardown
// =========================================================================

#[tokio::test]
async fn test_stale_disconnect_is_ignored_after_reclaim() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (old_tx, _old_rx) = channel();
    let a = registry
        .occupy(&code("SD500"), First, "Ada".into(), None, old_tx.clone())
        .await
        .unwrap();
    let (_b, mut b_inbox) = seat(&registry, "SD500", Second, "Bo").await;

    a.room.disconnect(First, old_tx.clone()).await;
    // Disconnects are fire-and-forget; a round trip orders us after it.
    a.room.info().await.unwrap();
    let seen = drain(&mut b_inbox);
    assert!(seen.contains(&ServerMessage::Msg {
        text: "⚠️ A player went offline".into()
    }));

    let (new_tx, mut new_rx) = channel();
    let back = registry
        .occupy(&code("SD500"), First, "Ada".into(), Some(a.identity.clone()), new_tx)
        .await
        .unwrap();
    assert_eq!(back.identity, a.identity);
    assert!(matches!(
        drain(&mut new_rx).first(),
        Some(ServerMessage::Joined { slot: First, .. })
    ));

    // The old connection's late disconnect must not knock the new one off.
    a.room.disconnect(First, old_tx).await;
    let info = a.room.info().await.unwrap();
    assert!(info.players[0].as_ref().unwrap().online);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_room_is_destroyed_after_grace() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (a_tx, _a_rx) = channel();
    let (b_tx, _b_rx) = channel();
    let a = registry
        .occupy(&code("AG600"), First, "Ada".into(), None, a_tx.clone())
        .await
        .unwrap();
    registry
        .occupy(&code("AG600"), Second, "Bo".into(), None, b_tx.clone())
        .await
        .unwrap();

    a.room.disconnect(First, a_tx).await;
    a.room.disconnect(Second, b_tx).await;

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(registry.room_count().await, 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(registry.room_count().await, 0);
    assert!(a.room.is_closed());
}

#[tokio::test]
async fn test_join_with_closed_connection_seats_player_offline() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (tx, rx) = channel();
    drop(rx);
    let a = registry
        .occupy(&code("CL610"), First, "Ada".into(), None, tx)
        .await
        .unwrap();

    let info = a.room.info().await.unwrap();
    let presence = info.players[0].as_ref().unwrap();
    assert!(!presence.online);
}

#[tokio::test(start_paused = true)]
async fn test_matched_player_who_vanished_before_binding_goes_offline() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (w_tx, w_rx) = channel();
    let (c_tx, _c_rx) = channel();

    registry.request_match("Ada".into(), w_tx).await.unwrap();
    let MatchResult::Matched(c) = registry.request_match("Bo".into(), c_tx.clone()).await.unwrap()
    else {
        panic!("second player should be matched");
    };

    // The waiting connection closes with its seat still queued, unbound.
    drop(w_rx);
    c.room.disconnect(Second, c_tx).await;

    let info = c.room.info().await.unwrap();
    assert!(info.players.iter().flatten().all(|p| !p.online));

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(c.room.is_closed());
    assert_eq!(registry.room_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejoin_cancels_abandon_timer() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (a_tx, _a_rx) = channel();
    let a = registry
        .occupy(&code("RJ700"), First, "Ada".into(), None, a_tx.clone())
        .await
        .unwrap();
    a.room.disconnect(First, a_tx).await;

    tokio::time::sleep(Duration::from_secs(20)).await;
    let (again_tx, _again_rx) = channel();
    registry
        .occupy(&code("RJ700"), First, "Ada".into(), Some(a.identity.clone()), again_tx)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(!a.room.is_closed());
    assert_eq!(a.room.info().await.unwrap().phase, Phase::WaitingForPlayers);
}

#[tokio::test(start_paused = true)]
async fn test_finished_room_lingers_then_closes() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (a, _ai) = seat(&registry, "GO800", First, "Ada").await;
    let (b, _bi) = seat(&registry, "GO800", Second, "Bo").await;
    lock(&a, "1234").await.unwrap();
    lock(&b, "5678").await.unwrap();
    guess(&a, "5678").await.unwrap();

    // Finished rooms are no longer offered to new joins.
    assert!(registry.get(&code("GO800")).await.is_none());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!a.room.is_closed());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(a.room.is_closed());
    assert_eq!(registry.room_count().await, 0);
}

#[tokio::test]
async fn test_finished_room_is_replaced_on_join() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (a, _ai) = seat(&registry, "RP900", First, "Ada").await;
    let (b, _bi) = seat(&registry, "RP900", Second, "Bo").await;
    lock(&a, "1234").await.unwrap();
    lock(&b, "5678").await.unwrap();
    guess(&a, "5678").await.unwrap();

    let (fresh, _fi) = seat(&registry, "RP900", First, "Cy").await;
    assert_eq!(fresh.room.phase(), Phase::WaitingForPlayers);
    assert_ne!(fresh.identity, a.identity);
}

#[tokio::test]
async fn test_leave_before_play_closes_room() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (a, _ai) = seat(&registry, "LV110", First, "Ada").await;
    let (b, mut b_inbox) = seat(&registry, "LV110", Second, "Bo").await;
    drain(&mut b_inbox);

    a.room.leave(First, a.identity.clone()).await.unwrap();

    assert!(matches!(
        drain(&mut b_inbox).as_slice(),
        [ServerMessage::Msg { text }] if text.contains("left")
    ));
    assert_eq!(
        lock(&b, "1234").await,
        Err(RoomError::RoomGone(code("LV110")))
    );
}

#[tokio::test]
async fn test_leave_mid_match_forfeits_to_opponent() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (a, _ai) = seat(&registry, "FF120", First, "Ada").await;
    let (b, mut b_inbox) = seat(&registry, "FF120", Second, "Bo").await;
    lock(&a, "1234").await.unwrap();
    lock(&b, "5678").await.unwrap();
    drain(&mut b_inbox);

    a.room.leave(First, a.identity.clone()).await.unwrap();

    assert!(drain(&mut b_inbox).contains(&ServerMessage::GameOver {
        winner: Some(Second),
        reason: "forfeit".into(),
    }));
}

#[tokio::test]
async fn test_destroy_is_idempotent() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (a, _ai) = seat(&registry, "DS130", First, "Ada").await;

    assert!(registry.destroy(&code("DS130")).await);
    assert!(!registry.destroy(&code("DS130")).await);
    assert!(matches!(
        a.room.info().await,
        Err(RoomError::RoomGone(_))
    ));
}

// =========================================================================
// Matchmaking
// =========================================================================

#[tokio::test]
async fn test_request_match_pairs_two_players() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (a_tx, mut a_rx) = channel();
    let (b_tx, mut b_rx) = channel();

    let first = registry.request_match("Ada".into(), a_tx).await.unwrap();
    assert!(matches!(first, MatchResult::Pending));
    assert!(registry.has_waiting().await);

    let MatchResult::Matched(b) = registry.request_match("Bo".into(), b_tx).await.unwrap() else {
        panic!("second player should be matched");
    };
    assert_eq!(b.slot, Second);
    assert!(b.room.code().as_str().starts_with("SG"));
    assert!(!registry.has_waiting().await);

    let Some(RoomOutbound::Seated(a)) = a_rx.try_recv().ok() else {
        panic!("waiting player should be seated first");
    };
    assert_eq!(a.slot, First);
    assert_eq!(a.room.code(), b.room.code());

    let found = ServerMessage::Msg {
        text: "🎮 Match found!".into(),
    };
    assert!(drain(&mut a_rx).contains(&found));
    assert!(drain(&mut b_rx).contains(&found));

    assert_eq!(a.room.info().await.unwrap().phase, Phase::WaitingForSecrets);
    lock(&a, "1234").await.unwrap();
}

#[tokio::test]
async fn test_request_match_twice_from_same_connection_stays_pending() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (tx, _rx) = channel();

    for _ in 0..2 {
        let result = registry.request_match("Ada".into(), tx.clone()).await.unwrap();
        assert!(matches!(result, MatchResult::Pending));
    }
    assert_eq!(registry.room_count().await, 0);
}

#[tokio::test]
async fn test_cancel_match_clears_waiting_player() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (a_tx, _a_rx) = channel();
    let (b_tx, _b_rx) = channel();
    registry.request_match("Ada".into(), a_tx.clone()).await.unwrap();

    assert!(registry.cancel_match(&a_tx).await);
    assert!(!registry.cancel_match(&a_tx).await);

    let result = registry.request_match("Bo".into(), b_tx).await.unwrap();
    assert!(matches!(result, MatchResult::Pending));
}

#[tokio::test]
async fn test_request_match_skips_dead_waiting_player() {
    let registry = RoomRegistry::new(RoomConfig::default());
    let (a_tx, a_rx) = channel();
    registry.request_match("Ada".into(), a_tx).await.unwrap();
    drop(a_rx);

    let (b_tx, _b_rx) = channel();
    let result = registry.request_match("Bo".into(), b_tx).await.unwrap();
    assert!(matches!(result, MatchResult::Pending));
}
