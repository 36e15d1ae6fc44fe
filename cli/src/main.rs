//! relay - runs a scripted player session against a simulated foreign host.
//!
//! ```text
//! main() -> RelayConfig -> SimulatedSurface -> Bridge -> Sdk -> session::run()
//!                                                 |
//!                                                 v
//!                                  shutdown(): reject anything still pending
//! ```
//!
//! The simulated host answers each call from a tokio task after
//! `[demo] latency_ms`, so every callback crosses threads just as it would
//! with a real foreign environment.

mod session;
mod simulated;

use std::sync::Arc;

use anyhow::Result;
use tokio::runtime::Handle;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use relay_config::RelayConfig;
use relay_core::Bridge;
use relay_sdk::Sdk;

use crate::simulated::SimulatedSurface;

fn init_tracing(default_filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

/// Load config before logging is up; problems are reported once it is.
fn load_config() -> (RelayConfig, Vec<String>) {
    let Some(path) = RelayConfig::path().filter(|path| path.exists()) else {
        return (RelayConfig::default(), Vec::new());
    };
    match RelayConfig::load_from(&path) {
        Ok(config) => (config, Vec::new()),
        Err(err) => (
            RelayConfig::default(),
            vec![format!("{err}; using defaults")],
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config, init_warnings) = load_config();
    init_tracing(config.log.filter.as_deref());
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }

    let surface = Arc::new(SimulatedSurface::new(Handle::current(), &config.demo));
    let bridge = Arc::new(Bridge::with_settings(surface, &config.bridge));
    let sdk = Sdk::new(Arc::clone(&bridge));

    let outcome = session::run(&sdk).await;

    let rejected = bridge.shutdown();
    let registry = bridge.registry();
    tracing::info!(
        rejected,
        anomalies = registry.anomaly_count(),
        "Session finished"
    );
    for anomaly in registry.anomalies() {
        tracing::debug!("{anomaly}");
    }

    match outcome {
        Ok(report) => {
            println!(
                "products: {}  purchases completed: {}  logged in: {}  incomplete: {}",
                report.products,
                report.purchases_completed,
                report.logged_in_during_session,
                report.incomplete_after
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("Error: {err:?}");
            Err(err)
        }
    }
}
