//! Shared test utilities and fixtures
//!
//! Bridges wired to in-process surfaces, plus helpers for answering calls
//! from other threads.

#![allow(dead_code)]

use std::sync::Arc;
use std::thread::JoinHandle;

use relay_core::mock::{ManualSurface, SyncSurface};
use relay_core::{Bridge, Delivery, ForeignCall};

/// Bridge over a scripted surface that answers on the dispatching stack.
pub fn sync_bridge(surface: SyncSurface) -> (Arc<Bridge>, Arc<SyncSurface>) {
    let surface = Arc::new(surface);
    (Arc::new(Bridge::new(surface.clone())), surface)
}

/// Bridge over a surface that parks calls until the test answers them.
pub fn manual_bridge() -> (Arc<Bridge>, Arc<ManualSurface>) {
    let surface = Arc::new(ManualSurface::new());
    (Arc::new(Bridge::new(surface.clone())), surface)
}

/// Answer `call` with a success payload from a fresh OS thread.
pub fn succeed_on_thread(call: ForeignCall, payload: &str) -> JoinHandle<Delivery> {
    let payload = payload.to_string();
    std::thread::spawn(move || call.succeed(&payload))
}

/// Answer `call` with an error from a fresh OS thread.
pub fn fail_on_thread(call: ForeignCall, message: &str) -> JoinHandle<Delivery> {
    let message = message.to_string();
    std::thread::spawn(move || call.fail(&message))
}
