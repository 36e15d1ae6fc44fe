//! End-to-end behaviour of dispatch, delivery, and continuations.

use std::sync::{Arc, Mutex};

use relay_core::mock::{Reply, SyncSurface};
use relay_core::{AnomalyKind, BridgeError, Completer, Deferred, Delivery, DeliveryKind};
use relay_sdk::Sdk;

use crate::common::{manual_bridge, sync_bridge};

#[test]
fn foreign_error_message_is_preserved_exactly() {
    let (bridge, manual) = manual_bridge();
    let future: Deferred<String> = bridge.dispatch("beginPurchase", "gems_100");
    let call = manual.next_call().unwrap();

    assert_eq!(call.fail("login_required"), Delivery::Delivered);
    let err = future.result().unwrap_err();
    assert_eq!(err, BridgeError::operation_failed("login_required"));
    assert_eq!(err.to_string(), "login_required");
    assert!(future.is_faulted());
}

#[test]
fn duplicate_success_keeps_first_value() {
    let (bridge, manual) = manual_bridge();
    let future: Deferred<String> = bridge.dispatch("getPlayerSigned", "");
    let call = manual.next_call().unwrap();
    let sink = call.sink().clone();
    let raw = call.token().value();

    assert_eq!(sink.on_success(raw, "first"), Delivery::Delivered);
    assert_eq!(sink.on_success(raw, "second"), Delivery::Orphaned);

    assert_eq!(future.result(), Ok("first".to_string()));
    let anomalies = bridge.registry().anomalies();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].token(), raw);
    assert_eq!(anomalies[0].kind(), AnomalyKind::UnknownToken);
    assert_eq!(anomalies[0].delivery(), DeliveryKind::Success);
}

#[test]
fn continuations_run_in_registration_order() {
    let completer = Completer::<u32>::new();
    let future = completer.deferred();
    let order = Arc::new(Mutex::new(Vec::new()));

    for label in ["first", "second"] {
        let order = Arc::clone(&order);
        future.on_completion(move |settled| {
            order
                .lock()
                .unwrap()
                .push((label, settled.result().unwrap()));
        });
    }
    assert!(order.lock().unwrap().is_empty());

    completer.resolve(7).unwrap();
    assert_eq!(*order.lock().unwrap(), vec![("first", 7), ("second", 7)]);
}

#[test]
fn result_on_pending_future_is_invalid_state() {
    let (bridge, _manual) = manual_bridge();
    let future: Deferred<String> = bridge.dispatch("listReferrals", "");

    let err = future.result().unwrap_err();
    assert!(err.is_invalid_state());
    assert!(future.is_pending());
    assert!(!future.is_completed());
}

#[test]
fn second_settle_is_rejected_and_result_unchanged() {
    let completer = Completer::<String>::new();
    let future = completer.deferred();
    completer.resolve("kept".to_string()).unwrap();

    assert!(completer.reject(BridgeError::operation_failed("late")).unwrap_err().is_invalid_state());
    assert!(completer.resolve("other".to_string()).unwrap_err().is_invalid_state());
    assert_eq!(future.result(), Ok("kept".to_string()));
}

#[test]
fn continuation_on_settled_future_runs_before_registration_returns() {
    let future = Deferred::completed(5_u8);
    let seen = Arc::new(Mutex::new(None));
    {
        let seen = Arc::clone(&seen);
        future.on_completion(move |settled| *seen.lock().unwrap() = Some(settled.result()));
    }
    assert_eq!(*seen.lock().unwrap(), Some(Ok(5)));
}

#[test]
fn sync_surface_round_trip_through_sdk() {
    let (bridge, surface) = sync_bridge(
        SyncSurface::new()
            .reply("initSdk", Reply::Void)
            .reply("getFeatureFlag", Reply::text(""))
            .reply("callAsyncNumber", Reply::Number(42.0)),
    );
    let sdk = Sdk::new(Arc::clone(&bridge));

    assert_eq!(sdk.init().result(), Ok(()));
    let flag = sdk.get_feature_flag("new_shop");
    assert!(!flag.is_faulted());
    assert_eq!(flag.result(), Ok(None));
    assert_eq!(sdk.call_async_number("coins").result(), Ok(42.0));

    assert_eq!(bridge.registry().pending_count(), 0);
    assert_eq!(
        surface.operations(),
        vec!["initSdk", "getFeatureFlag", "callAsyncNumber"]
    );
}

#[test]
fn stray_callbacks_never_disturb_pending_calls() {
    let (bridge, manual) = manual_bridge();
    let future: Deferred<String> = bridge.dispatch("getPlayerSigned", "");
    let call = manual.next_call().unwrap();
    let sink = call.sink().clone();

    assert_eq!(sink.on_success(0, "null"), Delivery::Orphaned);
    assert_eq!(sink.on_error(9_999, "nobody"), Delivery::Orphaned);
    assert_eq!(sink.on_void_success(call.token().value() + 1), Delivery::Orphaned);
    assert!(future.is_pending());

    call.succeed("sig");
    assert_eq!(future.result(), Ok("sig".to_string()));
    assert_eq!(bridge.registry().anomaly_count(), 3);
    assert_eq!(bridge.registry().anomalies()[0].kind(), AnomalyKind::NullToken);
}

#[test]
fn dispatch_failure_leaves_no_entry() {
    let (bridge, surface) = sync_bridge(
        SyncSurface::new().reply("flush", Reply::Refuse("host offline".to_string())),
    );
    let future: Deferred<()> = bridge.dispatch("flush", "");

    assert!(matches!(
        future.result(),
        Err(BridgeError::DispatchFailed { ref operation, .. }) if operation == "flush"
    ));
    assert_eq!(bridge.registry().pending_count(), 0);
    let token = surface.calls()[0].token;
    assert!(!bridge.registry().contains(token));
}

#[test]
fn decode_failure_rejects_only_its_own_future() {
    let (bridge, manual) = manual_bridge();
    let number: Deferred<f64> = bridge.dispatch("callAsyncNumber", "coins");
    let text: Deferred<String> = bridge.dispatch("callAsyncString", "name");
    let mut calls = manual.take_calls();
    let text_call = calls.pop().unwrap();
    let number_call = calls.pop().unwrap();

    number_call.succeed("not a number");
    text_call.succeed("ada");

    assert!(matches!(
        number.result(),
        Err(BridgeError::DecodeFailed { ref operation, .. }) if operation == "callAsyncNumber"
    ));
    assert_eq!(text.result(), Ok("ada".to_string()));
}
