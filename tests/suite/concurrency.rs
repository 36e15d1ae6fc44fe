//! Dispatch and delivery across threads and tasks.

use std::collections::HashSet;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use relay_core::{BridgeError, Deferred, Delivery};

use crate::common::{fail_on_thread, manual_bridge, succeed_on_thread};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delivery_from_another_thread_wakes_awaiting_task() {
    let (bridge, manual) = manual_bridge();
    let future: Deferred<String> = bridge.dispatch("getPlayerSigned", "");

    let waiter = tokio::spawn(future.clone().into_future());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!waiter.is_finished());

    let call = manual.next_call().unwrap();
    assert_eq!(
        succeed_on_thread(call, "signed").join().unwrap(),
        Delivery::Delivered
    );
    let outcome = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("awaiting task was never woken")
        .unwrap();
    assert_eq!(outcome, Ok("signed".to_string()));
}

#[tokio::test]
async fn timeouts_are_layered_by_the_caller() {
    let (bridge, manual) = manual_bridge();
    let future: Deferred<()> = bridge.dispatch("flush", "");

    let timed_out = tokio::time::timeout(Duration::from_millis(5), &future).await;
    assert!(timed_out.is_err());
    assert!(future.is_pending());
    assert_eq!(bridge.registry().pending_count(), 1);

    manual.next_call().unwrap().succeed_void();
    assert_eq!(future.await, Ok(()));
}

#[test]
fn blocking_wait_sees_error_from_another_thread() {
    let (bridge, manual) = manual_bridge();
    let future: Deferred<String> = bridge.dispatch("getIncompletePurchases", "");
    let handle = fail_on_thread(manual.next_call().unwrap(), "Login Required");

    assert_eq!(
        future.wait_blocking(),
        Err(BridgeError::operation_failed("Login Required"))
    );
    handle.join().unwrap();
}

#[test]
fn concurrent_dispatch_mints_unique_tokens() {
    let (bridge, manual) = manual_bridge();
    let threads: Vec<_> = (0..8)
        .map(|t| {
            let bridge = Arc::clone(&bridge);
            std::thread::spawn(move || {
                (0..32)
                    .map(|i| bridge.dispatch::<String>("callAsyncString", format!("{t}:{i}")))
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let futures: Vec<Deferred<String>> = threads
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    let calls = manual.take_calls();
    let tokens: HashSet<u64> = calls.iter().map(|c| c.token().value()).collect();
    assert_eq!(tokens.len(), 256);
    assert!(!tokens.contains(&0));
    assert_eq!(bridge.registry().pending_count(), 256);

    // Answer in reverse, each from its own thread, echoing the arguments.
    let answers: Vec<_> = calls
        .into_iter()
        .rev()
        .map(|call| {
            let args = call.args().to_string();
            succeed_on_thread(call, &args)
        })
        .collect();
    for answer in answers {
        assert_eq!(answer.join().unwrap(), Delivery::Delivered);
    }

    assert_eq!(bridge.registry().pending_count(), 0);
    let mut values: Vec<String> = futures.iter().map(|f| f.result().unwrap()).collect();
    values.sort();
    values.dedup();
    assert_eq!(values.len(), 256);
}

#[test]
fn racing_success_and_error_settle_exactly_once() {
    let (bridge, manual) = manual_bridge();
    let futures: Vec<Deferred<String>> = (0..32)
        .map(|_| bridge.dispatch("getPlayerSigned", ""))
        .collect();

    let racers: Vec<_> = manual
        .take_calls()
        .into_iter()
        .flat_map(|call| {
            let sink = call.sink().clone();
            let raw = call.token().value();
            [
                std::thread::spawn({
                    let sink = sink.clone();
                    move || sink.on_success(raw, "ok")
                }),
                std::thread::spawn(move || sink.on_error(raw, "failed")),
            ]
        })
        .collect();
    let delivered = racers
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|d| *d == Delivery::Delivered)
        .count();

    assert_eq!(delivered, 32);
    assert_eq!(bridge.registry().anomaly_count(), 32);
    for future in &futures {
        assert!(!future.is_pending());
        match future.result() {
            Ok(value) => assert_eq!(value, "ok"),
            Err(err) => assert_eq!(err.foreign_message(), Some("failed")),
        }
    }
}
