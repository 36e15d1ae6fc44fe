//! Config file settings flowing into the bridge.

use std::io::Write;
use std::sync::Arc;

use relay_config::RelayConfig;
use relay_core::mock::ManualSurface;
use relay_core::{Bridge, OrphanLogLevel};

#[test]
fn bridge_settings_from_config_bound_the_anomaly_log() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"[bridge]\nanomaly_log_capacity = 3\norphan_log_level = \"debug\"\n")
        .unwrap();
    let config = RelayConfig::load_from(file.path()).unwrap();
    assert_eq!(config.bridge.orphan_log_level, OrphanLogLevel::Debug);

    let bridge = Bridge::with_settings(Arc::new(ManualSurface::new()), &config.bridge);
    let sink = bridge.registry().sink();
    for raw in 100..110 {
        sink.on_success(raw, "stray");
    }

    let tokens: Vec<u64> = bridge
        .registry()
        .anomalies()
        .iter()
        .map(|a| a.token())
        .collect();
    assert_eq!(tokens, vec![107, 108, 109]);
    assert_eq!(bridge.registry().anomaly_count(), 10);
}
