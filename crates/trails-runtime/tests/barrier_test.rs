use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use trails_runtime::{EventBus, EventSet};

#[tokio::test]
async fn after_settles_in_input_order_regardless_of_emission_order() {
    let bus = EventBus::new();
    let barrier = bus.after(vec![EventSet::one("a"), EventSet::one("b")]);

    bus.emit("b", vec![json!("B")]);
    bus.emit("a", vec![json!("A")]);

    let captured = barrier.await.unwrap();
    assert_eq!(captured, vec![vec![json!("A")], vec![json!("B")]]);
}

#[tokio::test]
async fn nested_any_group_settles_with_either_member() {
    let bus = EventBus::new();
    let barrier = bus.after(vec![EventSet::any(["a", "b"]), EventSet::one("c")]);

    bus.emit("b", vec![json!(1)]);
    bus.emit("c", vec![json!(2)]);

    let captured = barrier.await.unwrap();
    assert_eq!(captured, vec![vec![json!(1)], vec![json!(2)]]);
}

#[tokio::test]
async fn nested_any_does_not_settle_on_the_outer_element_alone() {
    let bus = EventBus::new();
    let barrier = bus.after(vec![EventSet::any(["a", "b"]), EventSet::one("c")]);

    // only the plain element fires; the any-group never does
    bus.emit("c", vec![]);

    assert!(timeout(Duration::from_millis(50), barrier).await.is_err());
}

#[tokio::test]
async fn once_any_first_event_wins_and_losers_are_unregistered() {
    let bus = EventBus::new();
    let signal = bus.once_any(&["a", "b"]);

    bus.emit("a", vec![json!("first")]);
    let args = signal.await.unwrap();
    assert_eq!(args, vec![json!("first")]);

    // every listener the call registered is gone, winner and loser alike
    assert_eq!(bus.listener_count("a"), 0);
    assert_eq!(bus.listener_count("b"), 0);
    assert_eq!(bus.emit("b", vec![json!("late")]), 0);
}

#[tokio::test]
async fn once_any_callback_runs_exactly_once_with_the_settled_payload() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (calls2, seen2) = (calls.clone(), seen.clone());

    let signal = bus.once_any_with(&["a", "b"], move |args| {
        calls2.fetch_add(1, Ordering::SeqCst);
        seen2.lock().unwrap().extend(args.to_vec());
    });

    bus.emit("a", vec![json!(7)]);
    bus.emit("b", vec![json!(8)]);

    let args = signal.await.unwrap();
    assert_eq!(args, vec![json!(7)]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock().unwrap(), vec![json!(7)]);
}

#[tokio::test]
async fn after_callback_receives_the_same_ordered_payload_as_the_barrier() {
    let bus = EventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen2 = seen.clone();

    let barrier = bus.after_with(vec![EventSet::one("a"), EventSet::one("b")], move |captured| {
        *seen2.lock().unwrap() = captured.to_vec();
    });

    bus.emit("a", vec![json!(1)]);
    bus.emit("b", vec![json!(2)]);

    let captured = barrier.await.unwrap();
    assert_eq!(*seen.lock().unwrap(), captured);
    assert_eq!(captured, vec![vec![json!(1)], vec![json!(2)]]);
}

#[tokio::test]
async fn independent_calls_over_the_same_event_all_resolve() {
    let bus = EventBus::new();
    let s1 = bus.once_any(&["evt"]);
    let s2 = bus.once_any(&["evt"]);
    let barrier = bus.after(vec![EventSet::one("evt")]);

    bus.emit("evt", vec![json!("x")]);

    assert_eq!(s1.await.unwrap(), vec![json!("x")]);
    assert_eq!(s2.await.unwrap(), vec![json!("x")]);
    assert_eq!(barrier.await.unwrap(), vec![vec![json!("x")]]);
}

#[tokio::test]
async fn empty_after_settles_immediately() {
    let bus = EventBus::new();
    let captured = bus.after(vec![]).await.unwrap();
    assert!(captured.is_empty());
}

#[tokio::test]
async fn dropping_an_unsettled_barrier_unregisters_its_listeners() {
    let bus = EventBus::new();
    let barrier = bus.after(vec![EventSet::one("a"), EventSet::any(["b", "c"])]);
    assert_eq!(bus.listener_count("a"), 1);
    assert_eq!(bus.listener_count("b"), 1);

    drop(barrier);
    assert_eq!(bus.listener_count("a"), 0);
    assert_eq!(bus.listener_count("b"), 0);
    assert_eq!(bus.listener_count("c"), 0);
}

#[tokio::test]
async fn dropping_an_unsettled_signal_unregisters_its_listeners() {
    let bus = EventBus::new();
    let signal = bus.once_any(&["x", "y"]);
    drop(signal);
    assert_eq!(bus.listener_count("x"), 0);
    assert_eq!(bus.listener_count("y"), 0);
    assert_eq!(bus.emit("x", vec![json!("nobody home")]), 0);
}

#[tokio::test]
async fn repeated_calls_leave_no_listeners_behind() {
    let bus = EventBus::new();
    for _ in 0..100 {
        let signal = bus.once_any(&["tick", "tock"]);
        bus.emit("tick", vec![]);
        signal.await.unwrap();
    }
    assert_eq!(bus.listener_count("tick"), 0);
    assert_eq!(bus.listener_count("tock"), 0);
}
