use std::time::Duration;

use serde_json::{Value, json};

use super::log::{Cursor, MessageLog};
use super::session::is_new_session;
use super::waiters::WaiterRegistry;
use super::{Message, Relay, RelayOptions};

fn append(log: &mut MessageLog, at: i64, token: Value) -> Message {
    log.append_at(at, format!("msg@{at}"), "log".to_string(), token)
}

/// Lets spawned fetches run until `n` of them are parked on the relay.
async fn parked(relay: &Relay, n: usize) {
    while relay.waiting() < n {
        tokio::task::yield_now().await;
    }
}

#[test]
fn test_is_new_session_without_previous() {
    assert!(is_new_session(None, &json!("a")));
    assert!(is_new_session(None, &Value::Null));
}

#[test]
fn test_is_new_session_compares_previous_token() {
    let mut log = MessageLog::new();
    let first = append(&mut log, 1, json!(1725));
    assert!(!is_new_session(Some(&first), &json!(1725)));
    assert!(is_new_session(Some(&first), &json!(1726)));
    assert!(is_new_session(Some(&first), &json!("1725")));
}

#[test]
fn test_log_ids_are_contiguous_from_zero() {
    let mut log = MessageLog::new();
    let ids: Vec<u64> = (0..5)
        .map(|i| append(&mut log, 100 + i, Value::Null).id)
        .collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    assert_eq!(log.next_id(), 5);
}

#[test]
fn test_log_session_flags() {
    let mut log = MessageLog::new();
    let flags: Vec<bool> = ["A", "A", "B", "B", "A"]
        .iter()
        .enumerate()
        .map(|(i, token)| append(&mut log, i as i64, json!(token)).is_new_session)
        .collect();
    assert_eq!(flags, vec![true, false, true, false, true]);
}

#[test]
fn test_log_since_is_strictly_after_cursor() {
    let mut log = MessageLog::new();
    append(&mut log, 10, Value::Null);
    append(&mut log, 20, Value::Null);
    append(&mut log, 30, Value::Null);

    let after = log.since(Some(20));
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].received_at, 30);
    assert_eq!(after[0].id, 2);

    let json = serde_json::to_value(&after).unwrap();
    assert!(json.is_array());

    assert_eq!(log.since(None).len(), 3);
    assert_eq!(log.since(Some(5)).len(), 3);
    assert!(log.since(Some(30)).is_empty());
}

#[test]
fn test_log_since_keeps_append_order_on_ties() {
    let mut log = MessageLog::new();
    append(&mut log, 10, Value::Null);
    append(&mut log, 20, Value::Null);
    append(&mut log, 20, Value::Null);

    let ids: Vec<u64> = log.since(Some(10)).iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_log_timestamps_never_run_backwards() {
    let mut log = MessageLog::new();
    append(&mut log, 500, Value::Null);
    let stepped_back = append(&mut log, 400, Value::Null);
    assert_eq!(stepped_back.received_at, 500);
}

#[test]
fn test_log_clear_keeps_id_counter() {
    let mut log = MessageLog::new();
    append(&mut log, 1, json!("a"));
    append(&mut log, 2, json!("a"));
    log.clear();

    assert!(log.since(None).is_empty());
    assert!(log.is_empty());

    let next = append(&mut log, 3, json!("a"));
    assert_eq!(next.id, 2);
    assert!(next.is_new_session);
}

#[test]
fn test_message_wire_names() {
    let mut log = MessageLog::new();
    let msg = log.append_at(42, "hi".into(), "command".into(), json!(7));
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        json,
        json!({
            "guid": 0,
            "time": 42,
            "message": "hi",
            "type": "command",
            "sessionStart": 7,
            "isNewSession": true
        })
    );
}

#[test]
fn test_registry_notify_resolves_each_waiter_against_its_cursor() {
    let mut log = MessageLog::new();
    append(&mut log, 10, Value::Null);

    let mut registry = WaiterRegistry::new();
    let mut from_start = registry.register(Some(0));
    let mut from_ten = registry.register(Some(10));

    append(&mut log, 20, Value::Null);
    assert_eq!(registry.notify_all(&log), 2);
    assert!(registry.is_empty());

    assert_eq!(from_start.rx.try_recv().unwrap().len(), 2);
    assert_eq!(from_ten.rx.try_recv().unwrap().len(), 1);
}

#[test]
fn test_registry_answers_waiter_with_nothing_new_empty() {
    let mut log = MessageLog::new();
    append(&mut log, 10, Value::Null);

    let mut registry = WaiterRegistry::new();
    let mut reg = registry.register(Some(50));

    assert_eq!(registry.notify_all(&log), 1);
    assert!(!registry.contains(&reg.id));
    assert!(reg.rx.try_recv().unwrap().is_empty());
}

#[test]
fn test_log_after_id_ignores_timestamps() {
    let mut log = MessageLog::new();
    append(&mut log, 10, Value::Null);
    let cursor = Cursor::AfterId(log.next_id());
    let fresh = append(&mut log, 10, Value::Null);

    assert!(log.since(Some(10)).is_empty());
    assert_eq!(log.after(cursor), vec![fresh]);
    assert_eq!(log.after(Cursor::All).len(), 2);
    assert_eq!(Cursor::from(None), Cursor::All);
    assert_eq!(Cursor::from(Some(7)), Cursor::Time(7));
}

#[test]
fn test_registry_live_waiter_sees_same_millisecond_append() {
    let mut log = MessageLog::new();
    append(&mut log, 10, Value::Null);

    let mut registry = WaiterRegistry::new();
    let mut reg = registry.register(Cursor::AfterId(log.next_id()));
    let fresh = append(&mut log, 10, Value::Null);

    assert_eq!(registry.notify_all(&log), 1);
    assert_eq!(reg.rx.try_recv().unwrap(), vec![fresh]);
}

#[test]
fn test_registry_resolves_once() {
    let mut log = MessageLog::new();
    let mut registry = WaiterRegistry::new();
    let mut reg = registry.register(None);

    append(&mut log, 10, Value::Null);
    assert_eq!(registry.notify_all(&log), 1);

    assert!(!registry.expire(&reg.id));
    assert!(!registry.cancel(&reg.id));
    assert_eq!(reg.rx.try_recv().unwrap().len(), 1);
}

#[test]
fn test_registry_expire_answers_empty() {
    let log = MessageLog::new();
    let mut registry = WaiterRegistry::new();
    let mut reg = registry.register(None);

    assert!(registry.expire(&reg.id));
    assert_eq!(registry.notify_all(&log), 0);
    assert!(reg.rx.try_recv().unwrap().is_empty());
}

#[test]
fn test_registry_cancel_all_answers_empty() {
    let mut registry = WaiterRegistry::new();
    let mut a = registry.register(None);
    let mut b = registry.register(Some(3));

    assert_eq!(registry.cancel_all(), 2);
    assert!(registry.is_empty());
    assert!(a.rx.try_recv().unwrap().is_empty());
    assert!(b.rx.try_recv().unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_returns_history_immediately() {
    let relay = Relay::new("messages", RelayOptions::default());
    relay.publish("one", "log", json!(1));
    relay.publish("two", "log", json!(1));

    let batch = relay.fetch(None).await;
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].payload, "one");
    assert_eq!(relay.waiting(), 0);
}

#[tokio::test]
async fn test_fetch_with_old_cursor_returns_immediately() {
    let relay = Relay::new("messages", RelayOptions::default());
    let first = relay.publish("one", "log", Value::Null);

    let batch = relay.fetch(Some(first.received_at - 1)).await;
    assert_eq!(batch, vec![first]);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_waits_for_publish() {
    let relay = Relay::new("messages", RelayOptions::default());

    let poller = relay.clone();
    let handle = tokio::spawn(async move { poller.fetch(None).await });
    parked(&relay, 1).await;

    let published = relay.publish("hello", "log", json!("s1"));
    let batch = handle.await.unwrap();

    assert_eq!(batch, vec![published]);
    assert_eq!(relay.waiting(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_times_out_with_empty_batch() {
    let relay = Relay::new("messages", RelayOptions::default());

    let poller = relay.clone();
    let handle = tokio::spawn(async move { poller.fetch(Some(i64::MAX)).await });
    parked(&relay, 1).await;

    tokio::time::advance(Duration::from_millis(100_000)).await;
    let batch = handle.await.unwrap();

    assert!(batch.is_empty());
    assert_eq!(relay.waiting(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_publish_just_before_deadline_resolves_once() {
    let relay = Relay::new("messages", RelayOptions::default());

    let poller = relay.clone();
    let handle = tokio::spawn(async move { poller.fetch(None).await });
    parked(&relay, 1).await;

    tokio::time::advance(Duration::from_millis(99_999)).await;
    let published = relay.publish("late", "log", Value::Null);

    // Let the old deadline pass; the timeout path must not answer again.
    tokio::time::advance(Duration::from_millis(10)).await;
    let batch = handle.await.unwrap();

    assert_eq!(batch, vec![published]);
    assert_eq!(relay.waiting(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_waiters_with_different_cursors_get_their_own_batches() {
    let relay = Relay::new("messages", RelayOptions::default());
    let first = relay.publish("one", "log", Value::Null);

    let a = relay.clone();
    let from_first = tokio::spawn(async move { a.fetch(Some(first.received_at)).await });
    let b = relay.clone();
    let far_future = i64::MAX - 1;
    let from_future = tokio::spawn(async move { b.fetch(Some(far_future)).await });
    parked(&relay, 2).await;

    // Force a strictly later timestamp than `first`.
    std::thread::sleep(Duration::from_millis(2));
    let second = relay.publish("two", "log", Value::Null);

    // Every parked poll is answered by the publish, each against its own cursor.
    assert_eq!(relay.waiting(), 0);
    assert_eq!(from_first.await.unwrap(), vec![second]);
    assert!(from_future.await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_non_persistent_relay_skips_backlog() {
    let options = RelayOptions {
        persist: false,
        ..RelayOptions::default()
    };
    let relay = Relay::new("commands", options);
    relay.publish("old", "command", Value::Null);

    let poller = relay.clone();
    let handle = tokio::spawn(async move { poller.fetch(None).await });
    parked(&relay, 1).await;

    let fresh = relay.publish("new", "command", Value::Null);

    assert_eq!(handle.await.unwrap(), vec![fresh]);
}

#[tokio::test(start_paused = true)]
async fn test_non_persistent_relay_delivers_publish_in_same_millisecond() {
    let options = RelayOptions {
        persist: false,
        ..RelayOptions::default()
    };
    let relay = Relay::new("commands", options);

    for round in 0..20 {
        let poller = relay.clone();
        let handle = tokio::spawn(async move { poller.fetch(None).await });
        parked(&relay, 1).await;

        let fresh = relay.publish(format!("cmd {round}"), "command", Value::Null);
        assert_eq!(relay.waiting(), 0, "round {round}");
        assert_eq!(handle.await.unwrap(), vec![fresh], "round {round}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_non_persistent_relay_times_out_despite_backlog() {
    let options = RelayOptions {
        persist: false,
        wait_window: Duration::from_millis(500),
    };
    let relay = Relay::new("commands", options);
    relay.publish("old", "command", Value::Null);

    let batch = relay.fetch(None).await;
    assert!(batch.is_empty());
    assert_eq!(relay.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_clear_releases_waiters() {
    let relay = Relay::new("messages", RelayOptions::default());
    relay.publish("one", "log", Value::Null);

    let poller = relay.clone();
    let handle = tokio::spawn(async move { poller.fetch(Some(i64::MAX)).await });
    parked(&relay, 1).await;

    assert_eq!(relay.clear(), 1);
    assert!(handle.await.unwrap().is_empty());
    assert!(relay.is_empty());
    assert!(relay.since(None).is_empty());
}

#[tokio::test]
async fn test_ids_continue_after_clear() {
    let relay = Relay::new("messages", RelayOptions::default());
    relay.publish("one", "log", Value::Null);
    relay.publish("two", "log", Value::Null);
    relay.clear();

    let third = relay.publish("three", "log", Value::Null);
    assert_eq!(third.id, 2);
    assert!(third.is_new_session);
    assert_eq!(relay.fetch(None).await, vec![third]);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_fetch_unregisters_waiter() {
    let relay = Relay::new("messages", RelayOptions::default());

    let poller = relay.clone();
    let handle = tokio::spawn(async move { poller.fetch(None).await });
    parked(&relay, 1).await;

    handle.abort();
    let _ = handle.await;
    assert_eq!(relay.waiting(), 0);
}

#[tokio::test]
async fn test_channels_are_independent() {
    let messages = Relay::new("messages", RelayOptions::default());
    let commands = Relay::new("commands", RelayOptions::default());

    messages.publish("log line", "log", json!(1));
    commands.publish("reload", "command", Value::Null);
    commands.publish("reload", "command", Value::Null);
    messages.clear();

    assert!(messages.is_empty());
    assert_eq!(commands.len(), 2);
    assert_eq!(commands.since(None)[0].id, 0);
}
