//! Typed facade over the dispatch bridge.
//!
//! Every asynchronous operation returns a [`Deferred`] immediately; JSON
//! payloads are decoded into the response types in [`payment`],
//! [`referrals`] and [`login`]. Fire-and-forget calls into the host live in
//! [`notifications`] and [`navigation`]; player storage is synchronous.

use std::sync::Arc;

use relay_core::{Bridge, Deferred, ForeignSurface, Json, SurfaceError};
use serde::de::DeserializeOwned;

pub mod login;
pub mod navigation;
pub mod notifications;
pub mod payment;
mod player;
pub mod referrals;

pub use relay_core::BridgeError;

#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("{0} is required")]
    MissingArgument(&'static str),
    #[error("serializing {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {what} from foreign side: {reason}")]
    InvalidResponse { what: &'static str, reason: String },
}

pub struct Sdk {
    bridge: Arc<Bridge>,
}

impl Sdk {
    #[must_use]
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }

    /// Facade over a fresh bridge with default settings.
    #[must_use]
    pub fn with_surface(surface: Arc<dyn ForeignSurface>) -> Self {
        Self::new(Arc::new(Bridge::new(surface)))
    }

    #[must_use]
    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }

    /// Completes once the foreign side reports it is ready for calls.
    pub fn is_ready(&self) -> Deferred<()> {
        self.call_async_void("isReady")
    }

    pub fn init(&self) -> Deferred<()> {
        self.bridge.dispatch("initSdk", "")
    }

    pub fn flush(&self) -> Deferred<()> {
        self.bridge.dispatch("flush", "")
    }

    /// Run a named foreign call that completes without a value.
    pub fn call_async_void(&self, call: &str) -> Deferred<()> {
        self.bridge.dispatch("callAsyncVoid", call)
    }

    pub fn call_async_string(&self, call: &str) -> Deferred<String> {
        self.bridge.dispatch("callAsyncString", call)
    }

    pub fn call_async_number(&self, call: &str) -> Deferred<f64> {
        self.bridge.dispatch("callAsyncNumber", call)
    }

    /// Signed player identity, opaque to the client.
    pub fn get_player_signed(&self) -> Deferred<String> {
        self.bridge.dispatch("getPlayerSigned", "")
    }

    /// `None` when the flag is not defined for this player.
    pub fn get_feature_flag(&self, key: &str) -> Deferred<Option<String>> {
        self.bridge
            .dispatch::<String>("getFeatureFlag", key)
            .then(|result| result.map(|value| (!value.is_empty()).then_some(value)))
    }

    fn call_json<T>(&self, operation: &str, args: impl Into<String>) -> Deferred<T>
    where
        T: DeserializeOwned + Clone + Send + 'static,
    {
        self.bridge
            .dispatch::<Json<T>>(operation, args)
            .then(|result| result.map(Json::into_inner))
    }
}

impl std::fmt::Debug for Sdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sdk").field("bridge", &self.bridge).finish()
    }
}
