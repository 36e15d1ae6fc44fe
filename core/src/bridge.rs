//! Dispatch bridge: the single entry point facades use to reach the foreign side.
//!
//! The bridge is an explicitly constructed value. Tests build their own
//! instance around a test surface; nothing here is process-global.
//!
//! Surface replacement policy: every call still pending against the old
//! surface is rejected with [`BridgeError::SurfaceReplaced`]. A late callback
//! from the old surface is then an orphan like any other.

use std::sync::{Arc, PoisonError, RwLock};

use relay_types::{BridgeError, FromPayload};
use serde::Serialize;

use crate::deferred::{Completer, Deferred};
use crate::registry::HandleRegistry;
use crate::settings::BridgeSettings;
use crate::surface::{ForeignCall, ForeignSurface, SurfaceError};

struct SurfaceSlot {
    surface: Arc<dyn ForeignSurface>,
    generation: u64,
}

pub struct Bridge {
    registry: HandleRegistry,
    surface: RwLock<SurfaceSlot>,
}

impl Bridge {
    pub fn new(surface: Arc<dyn ForeignSurface>) -> Self {
        Self::with_settings(surface, &BridgeSettings::default())
    }

    pub fn with_settings(surface: Arc<dyn ForeignSurface>, settings: &BridgeSettings) -> Self {
        let registry = HandleRegistry::new(settings);
        let generation = registry.generation();
        Self {
            registry,
            surface: RwLock::new(SurfaceSlot {
                surface,
                generation,
            }),
        }
    }

    fn current_surface(&self) -> (Arc<dyn ForeignSurface>, u64) {
        let slot = self.surface.read().unwrap_or_else(PoisonError::into_inner);
        (Arc::clone(&slot.surface), slot.generation)
    }

    /// Start `operation` on the foreign side and return its future immediately.
    ///
    /// The token is in the registry before the surface sees the call, so a
    /// surface may call back synchronously from inside `invoke`. If the
    /// surface refuses the call the future is rejected with
    /// [`BridgeError::DispatchFailed`] and nothing is left in the table.
    pub fn dispatch<T>(&self, operation: &str, args: impl Into<String>) -> Deferred<T>
    where
        T: FromPayload + Send + 'static,
    {
        let completer = Completer::new();
        let future = completer.deferred();
        let (surface, generation) = self.current_surface();

        let Some(token) = self.registry.register(operation, generation, completer) else {
            return future;
        };

        tracing::debug!(
            token = %token,
            operation,
            surface = surface.name(),
            "Dispatching foreign call"
        );
        let call = ForeignCall::new(token, operation, args.into(), self.registry.sink());
        if let Err(e) = surface.invoke(call) {
            tracing::warn!(token = %token, operation, "Foreign surface refused call: {e}");
            // A synchronous surface may already have answered before failing;
            // that answer stands.
            self.registry.abort(
                token,
                BridgeError::DispatchFailed {
                    operation: operation.to_string(),
                    reason: e.to_string(),
                },
            );
        }
        future
    }

    /// [`dispatch`](Self::dispatch) with arguments serialized to JSON.
    pub fn dispatch_json<T, A>(&self, operation: &str, args: &A) -> Deferred<T>
    where
        T: FromPayload + Send + 'static,
        A: Serialize + ?Sized,
    {
        match serde_json::to_string(args) {
            Ok(json) => self.dispatch(operation, json),
            Err(e) => Deferred::faulted(BridgeError::DispatchFailed {
                operation: operation.to_string(),
                reason: format!("serializing arguments: {e}"),
            }),
        }
    }

    /// Call a synchronous foreign function. Bypasses the registry.
    pub fn invoke_sync(&self, operation: &str, args: &str) -> Result<String, SurfaceError> {
        let (surface, _) = self.current_surface();
        surface.invoke_sync(operation, args)
    }

    /// Swap in a new foreign surface (e.g. a test double).
    ///
    /// Returns how many pending calls were rejected with
    /// [`BridgeError::SurfaceReplaced`].
    pub fn replace_surface(&self, surface: Arc<dyn ForeignSurface>) -> usize {
        let generation = {
            let mut slot = self.surface.write().unwrap_or_else(PoisonError::into_inner);
            let generation = self.registry.bump_generation();
            tracing::info!(
                from = slot.surface.name(),
                to = surface.name(),
                generation,
                "Replacing foreign surface"
            );
            slot.surface = surface;
            slot.generation = generation;
            generation
        };
        self.registry.reject_stale(generation)
    }

    /// Reject every pending call with [`BridgeError::BridgeShutdown`] and
    /// refuse new ones.
    pub fn shutdown(&self) -> usize {
        let rejected = self.registry.close();
        tracing::info!(rejected, "Bridge shut down");
        rejected
    }

    #[must_use]
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    #[must_use]
    pub fn surface_name(&self) -> String {
        self.current_surface().0.name().to_string()
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("surface", &self.surface_name())
            .field("pending", &self.registry.pending_count())
            .finish()
    }
}
