//! Handle registry: correlates foreign callbacks with pending futures.
//!
//! Every dispatched call gets a freshly minted [`Token`] and an entry in the
//! table that owns the future's [`Completer`]. A callback removes the entry
//! and settles the future in one step, so a token can be delivered at most
//! once. Callbacks for tokens that are not in the table are recorded as
//! [`Anomaly`]s and logged; they never touch other entries.
//!
//! The table lock is held only for insert and lookup+remove. Settling the
//! future (and with it, running continuations) always happens after the
//! lock is released, which is what lets a synchronous surface call back on
//! the dispatching stack.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroU64;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use relay_types::{
    Anomaly, AnomalyKind, BridgeError, DeliveryKind, FromPayload, Payload, Token,
};

use crate::deferred::Completer;
use crate::settings::{BridgeSettings, OrphanLogLevel};

/// Outcome of handing a callback to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The token was pending; its future is now settled.
    Delivered,
    /// The token was unknown, consumed, or null. Recorded as an anomaly.
    Orphaned,
}

/// Type-erased pending future. One concrete result type per token.
trait PendingSlot: Send {
    fn operation(&self) -> &str;

    fn deliver(self: Box<Self>, outcome: Result<Payload, String>) -> Result<(), BridgeError>;

    fn abort(self: Box<Self>, error: BridgeError) -> Result<(), BridgeError>;
}

struct TypedSlot<T> {
    operation: String,
    completer: Completer<T>,
}

impl<T: FromPayload + Send> PendingSlot for TypedSlot<T> {
    fn operation(&self) -> &str {
        &self.operation
    }

    fn deliver(self: Box<Self>, outcome: Result<Payload, String>) -> Result<(), BridgeError> {
        let result = match outcome {
            Ok(payload) => T::from_payload(payload).map_err(|source| {
                tracing::warn!(
                    operation = %self.operation,
                    "Callback payload did not decode: {source}"
                );
                BridgeError::DecodeFailed {
                    operation: self.operation.clone(),
                    source,
                }
            }),
            Err(message) => Err(BridgeError::OperationFailed { message }),
        };
        self.completer.settle(result)
    }

    fn abort(self: Box<Self>, error: BridgeError) -> Result<(), BridgeError> {
        self.completer.reject(error)
    }
}

struct Entry {
    generation: u64,
    slot: Box<dyn PendingSlot>,
}

struct Table {
    entries: HashMap<Token, Entry>,
    /// `None` once every token has been handed out.
    next_id: Option<NonZeroU64>,
    /// Bumped every time the foreign surface is replaced.
    generation: u64,
    closed: bool,
}

struct AnomalyLog {
    recent: VecDeque<Anomaly>,
    capacity: usize,
    total: u64,
}

impl AnomalyLog {
    fn push(&mut self, anomaly: Anomaly) {
        self.total += 1;
        if self.capacity == 0 {
            return;
        }
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(anomaly);
    }
}

struct RegistryState {
    table: Mutex<Table>,
    anomalies: Mutex<AnomalyLog>,
    orphan_log_level: OrphanLogLevel,
}

impl RegistryState {
    fn lock_table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_anomalies(&self) -> MutexGuard<'_, AnomalyLog> {
        self.anomalies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, raw: u64, kind: DeliveryKind, outcome: Result<Payload, String>) -> Delivery {
        let Some(token) = Token::from_raw(raw) else {
            self.record(Anomaly::new(raw, AnomalyKind::NullToken, kind));
            return Delivery::Orphaned;
        };

        let entry = { self.lock_table().entries.remove(&token) };
        let Some(entry) = entry else {
            self.record(Anomaly::new(raw, AnomalyKind::UnknownToken, kind));
            return Delivery::Orphaned;
        };

        let operation = entry.slot.operation().to_string();
        tracing::debug!(
            token = %token,
            operation = %operation,
            outcome = kind.label(),
            "Delivering callback"
        );
        if let Err(e) = entry.slot.deliver(outcome) {
            // The registry is the only holder of the completer.
            tracing::error!(
                token = %token,
                operation = %operation,
                "Registry-owned future was already settled: {e}"
            );
        }
        Delivery::Delivered
    }

    fn record(&self, anomaly: Anomaly) {
        match self.orphan_log_level {
            OrphanLogLevel::Warn => tracing::warn!(token = anomaly.token(), "{anomaly}"),
            OrphanLogLevel::Debug => tracing::debug!(token = anomaly.token(), "{anomaly}"),
        }
        self.lock_anomalies().push(anomaly);
    }

    /// Remove every entry matching `filter` and reject it with `make_error`.
    fn drain<F, E>(&self, filter: F, make_error: E) -> usize
    where
        F: Fn(&Entry) -> bool,
        E: Fn(String) -> BridgeError,
    {
        let mut drained: Vec<(Token, Entry)> = {
            let mut table = self.lock_table();
            let tokens: Vec<Token> = table
                .entries
                .iter()
                .filter(|(_, entry)| filter(entry))
                .map(|(token, _)| *token)
                .collect();
            tokens
                .into_iter()
                .filter_map(|token| table.entries.remove(&token).map(|entry| (token, entry)))
                .collect()
        };

        let count = drained.len();
        drained.sort_by_key(|(token, _)| *token);
        for (token, entry) in drained {
            let error = make_error(entry.slot.operation().to_string());
            tracing::debug!(token = %token, "Rejecting pending call: {error}");
            let _ = entry.slot.abort(error);
        }
        count
    }
}

/// Owner of the token table.
///
/// Dropping the registry rejects everything still pending with
/// [`BridgeError::BridgeShutdown`]; callbacks arriving afterwards are logged
/// and discarded by their [`CallbackSink`].
pub struct HandleRegistry {
    state: Arc<RegistryState>,
}

impl HandleRegistry {
    #[must_use]
    pub fn new(settings: &BridgeSettings) -> Self {
        Self {
            state: Arc::new(RegistryState {
                table: Mutex::new(Table {
                    entries: HashMap::new(),
                    next_id: Some(NonZeroU64::MIN),
                    generation: 0,
                    closed: false,
                }),
                anomalies: Mutex::new(AnomalyLog {
                    recent: VecDeque::with_capacity(settings.anomaly_log_capacity.min(1024)),
                    capacity: settings.anomaly_log_capacity,
                    total: 0,
                }),
                orphan_log_level: settings.orphan_log_level,
            }),
        }
    }

    /// Mint a token and park `completer` under it.
    ///
    /// Returns `None` (after rejecting the completer) if the registry was
    /// closed, if `generation` is stale because the surface was replaced
    /// after the caller picked it, or if the token space is used up. Tokens
    /// are never reused.
    pub(crate) fn register<T>(
        &self,
        operation: &str,
        generation: u64,
        completer: Completer<T>,
    ) -> Option<Token>
    where
        T: FromPayload + Send + 'static,
    {
        let rejected = {
            let mut table = self.state.lock_table();
            if table.closed {
                Some(BridgeError::BridgeShutdown {
                    operation: operation.to_string(),
                })
            } else if table.generation != generation {
                Some(BridgeError::SurfaceReplaced {
                    operation: operation.to_string(),
                })
            } else if let Some(id) = table.next_id {
                let token = Token::new(id);
                table.next_id = id.checked_add(1);
                table.entries.insert(
                    token,
                    Entry {
                        generation,
                        slot: Box::new(TypedSlot {
                            operation: operation.to_string(),
                            completer,
                        }),
                    },
                );
                return Some(token);
            } else {
                tracing::warn!(operation, "Token space exhausted; refusing call");
                Some(BridgeError::DispatchFailed {
                    operation: operation.to_string(),
                    reason: "no tokens left to mint".to_string(),
                })
            }
        };

        if let Some(error) = rejected {
            tracing::debug!(operation, "Not registering call: {error}");
            let _ = completer.reject(error);
        }
        None
    }

    pub(crate) fn generation(&self) -> u64 {
        self.state.lock_table().generation
    }

    /// Start a new surface generation. Calls registered against older
    /// generations are left for [`reject_stale`](Self::reject_stale).
    pub(crate) fn bump_generation(&self) -> u64 {
        let mut table = self.state.lock_table();
        table.generation += 1;
        table.generation
    }

    /// Reject every call dispatched before `current` with
    /// [`BridgeError::SurfaceReplaced`].
    pub(crate) fn reject_stale(&self, current: u64) -> usize {
        self.state.drain(
            |entry| entry.generation < current,
            |operation| BridgeError::SurfaceReplaced { operation },
        )
    }

    /// Remove `token` and reject its future. Returns false if it was not pending.
    pub(crate) fn abort(&self, token: Token, error: BridgeError) -> bool {
        let entry = { self.state.lock_table().entries.remove(&token) };
        match entry {
            Some(entry) => {
                let _ = entry.slot.abort(error);
                true
            }
            None => false,
        }
    }

    /// Reject everything pending and refuse further registrations.
    pub fn close(&self) -> usize {
        self.state.lock_table().closed = true;
        self.state
            .drain(|_| true, |operation| BridgeError::BridgeShutdown { operation })
    }

    /// Reject everything pending with [`BridgeError::SurfaceReplaced`],
    /// regardless of generation. The registry stays open.
    pub fn invalidate_all(&self) -> usize {
        self.state
            .drain(|_| true, |operation| BridgeError::SurfaceReplaced { operation })
    }

    pub fn deliver_success(&self, token: u64, payload: Payload) -> Delivery {
        self.state.deliver(token, DeliveryKind::Success, Ok(payload))
    }

    pub fn deliver_error(&self, token: u64, message: &str) -> Delivery {
        self.state
            .deliver(token, DeliveryKind::Error, Err(message.to_string()))
    }

    /// Inbound entry points to hand to the foreign side.
    #[must_use]
    pub fn sink(&self) -> CallbackSink {
        CallbackSink {
            registry: Arc::downgrade(&self.state),
        }
    }

    #[must_use]
    pub fn contains(&self, token: Token) -> bool {
        self.state.lock_table().entries.contains_key(&token)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.lock_table().entries.len()
    }

    /// Pending tokens and their operation names, in minting order.
    #[must_use]
    pub fn pending_operations(&self) -> Vec<(Token, String)> {
        let mut pending: Vec<(Token, String)> = self
            .state
            .lock_table()
            .entries
            .iter()
            .map(|(token, entry)| (*token, entry.slot.operation().to_string()))
            .collect();
        pending.sort_by_key(|(token, _)| *token);
        pending
    }

    /// Most recent anomalies, oldest first.
    #[must_use]
    pub fn anomalies(&self) -> Vec<Anomaly> {
        self.state.lock_anomalies().recent.iter().cloned().collect()
    }

    /// Total anomalies seen, including ones evicted from the recent log.
    #[must_use]
    pub fn anomaly_count(&self) -> u64 {
        self.state.lock_anomalies().total
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new(&BridgeSettings::default())
    }
}

impl Drop for HandleRegistry {
    fn drop(&mut self) {
        let rejected = self.close();
        if rejected > 0 {
            tracing::debug!(rejected, "Handle registry dropped with calls in flight");
        }
    }
}

/// The callback entry points the foreign side is allowed to call.
///
/// Cheap to clone and safe to call from any thread, any number of times,
/// with any token. Holds only a weak reference: once the registry is gone
/// every callback is logged and dropped.
#[derive(Clone)]
pub struct CallbackSink {
    registry: Weak<RegistryState>,
}

impl CallbackSink {
    pub fn on_success(&self, token: u64, payload: &str) -> Delivery {
        self.deliver(token, DeliveryKind::Success, Ok(Payload::from(payload)))
    }

    pub fn on_number_success(&self, token: u64, value: f64) -> Delivery {
        self.deliver(token, DeliveryKind::Success, Ok(Payload::Number(value)))
    }

    pub fn on_void_success(&self, token: u64) -> Delivery {
        self.deliver(token, DeliveryKind::Success, Ok(Payload::Void))
    }

    pub fn on_error(&self, token: u64, message: &str) -> Delivery {
        self.deliver(token, DeliveryKind::Error, Err(message.to_string()))
    }

    fn deliver(&self, token: u64, kind: DeliveryKind, outcome: Result<Payload, String>) -> Delivery {
        match self.registry.upgrade() {
            Some(state) => state.deliver(token, kind, outcome),
            None => {
                tracing::warn!(
                    token,
                    outcome = kind.label(),
                    "Callback arrived after the registry was dropped"
                );
                Delivery::Orphaned
            }
        }
    }
}

impl std::fmt::Debug for CallbackSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSink")
            .field("attached", &(self.registry.strong_count() > 0))
            .finish()
    }
}
