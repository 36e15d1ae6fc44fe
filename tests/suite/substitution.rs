//! Swapping the foreign surface and tearing the bridge down.

use std::sync::Arc;

use relay_core::mock::{ManualSurface, Reply, SyncSurface};
use relay_core::{AnomalyKind, Bridge, BridgeError, Deferred, Delivery};
use relay_sdk::Sdk;

use crate::common::manual_bridge;

#[test]
fn replacing_the_surface_rejects_calls_in_flight() {
    let (bridge, old) = manual_bridge();
    let pending: Vec<Deferred<String>> = ["listReferrals", "getPlayerSigned"]
        .into_iter()
        .map(|op| bridge.dispatch(op, ""))
        .collect();

    let replacement = Arc::new(SyncSurface::new().named("test").reply("flush", Reply::Void));
    assert_eq!(bridge.replace_surface(replacement.clone()), 2);
    assert_eq!(bridge.surface_name(), "test");

    for (future, op) in pending.iter().zip(["listReferrals", "getPlayerSigned"]) {
        assert_eq!(
            future.result(),
            Err(BridgeError::SurfaceReplaced {
                operation: op.to_string()
            })
        );
    }

    // Late answers from the old surface are orphans.
    for call in old.take_calls() {
        assert_eq!(call.succeed("late"), Delivery::Orphaned);
    }
    assert_eq!(bridge.registry().anomaly_count(), 2);

    // New calls go to the replacement.
    let flushed: Deferred<()> = bridge.dispatch("flush", "");
    assert_eq!(flushed.result(), Ok(()));
    assert_eq!(replacement.operations(), vec!["flush"]);
}

#[test]
fn sdk_follows_surface_replacement() {
    let first = Arc::new(SyncSurface::new().reply("getFeatureFlag", Reply::text("red")));
    let sdk = Sdk::with_surface(first);
    assert_eq!(
        sdk.get_feature_flag("theme").result(),
        Ok(Some("red".to_string()))
    );

    sdk.bridge()
        .replace_surface(Arc::new(SyncSurface::new().reply("getFeatureFlag", Reply::text(""))));
    assert_eq!(sdk.get_feature_flag("theme").result(), Ok(None));
}

#[test]
fn shutdown_rejects_pending_and_new_calls() {
    let (bridge, manual) = manual_bridge();
    let pending: Deferred<()> = bridge.dispatch("initSdk", "");
    let call = manual.next_call().unwrap();

    assert_eq!(bridge.shutdown(), 1);
    assert_eq!(
        pending.result(),
        Err(BridgeError::BridgeShutdown {
            operation: "initSdk".to_string()
        })
    );
    assert_eq!(call.succeed_void(), Delivery::Orphaned);

    let refused: Deferred<()> = bridge.dispatch("flush", "");
    assert!(matches!(
        refused.result(),
        Err(BridgeError::BridgeShutdown { .. })
    ));
    assert_eq!(manual.pending_calls(), 0);
}

#[test]
fn dropping_the_bridge_detaches_outstanding_sinks() {
    let manual = Arc::new(ManualSurface::new());
    let bridge = Bridge::new(manual.clone());
    let pending: Deferred<String> = bridge.dispatch("getPlayerSigned", "");
    let call = manual.next_call().unwrap();
    drop(bridge);

    assert!(matches!(
        pending.result(),
        Err(BridgeError::BridgeShutdown { .. })
    ));
    assert_eq!(call.succeed("too late"), Delivery::Orphaned);
}

#[test]
fn null_token_from_any_surface_is_an_anomaly() {
    let (bridge, manual) = manual_bridge();
    let _pending: Deferred<()> = bridge.dispatch("flush", "");
    let sink = manual.next_call().unwrap().sink().clone();

    assert_eq!(sink.on_error(0, "who?"), Delivery::Orphaned);
    let anomaly = &bridge.registry().anomalies()[0];
    assert_eq!(anomaly.kind(), AnomalyKind::NullToken);
    assert_eq!(bridge.registry().pending_count(), 1);
}
