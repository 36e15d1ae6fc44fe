//! The outbound boundary: whatever actually runs remote operations.

use relay_types::Token;

use crate::registry::{CallbackSink, Delivery};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("foreign surface unavailable: {0}")]
    Unavailable(String),
    #[error("invalid arguments for '{operation}': {reason}")]
    InvalidArguments { operation: String, reason: String },
    #[error("surface does not support synchronous calls")]
    SyncUnsupported,
}

/// One dispatched call as seen by the foreign side.
///
/// Carries the token the eventual callback must quote, and the sink to call
/// back into. The completion helpers consume the call, so a well-behaved
/// surface cannot answer twice through them; a buggy one can still call the
/// sink directly and will hit the registry's orphan handling.
#[derive(Debug, Clone)]
pub struct ForeignCall {
    token: Token,
    operation: String,
    args: String,
    sink: CallbackSink,
}

impl ForeignCall {
    pub(crate) fn new(token: Token, operation: &str, args: String, sink: CallbackSink) -> Self {
        Self {
            token,
            operation: operation.to_string(),
            args,
            sink,
        }
    }

    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Serialized arguments, JSON by convention. Empty for no-argument calls.
    #[must_use]
    pub fn args(&self) -> &str {
        &self.args
    }

    #[must_use]
    pub fn sink(&self) -> &CallbackSink {
        &self.sink
    }

    pub fn succeed(self, payload: &str) -> Delivery {
        self.sink.on_success(self.token.value(), payload)
    }

    pub fn succeed_number(self, value: f64) -> Delivery {
        self.sink.on_number_success(self.token.value(), value)
    }

    pub fn succeed_void(self) -> Delivery {
        self.sink.on_void_success(self.token.value())
    }

    pub fn fail(self, message: &str) -> Delivery {
        self.sink.on_error(self.token.value(), message)
    }
}

/// A foreign call mechanism.
///
/// `invoke` must return promptly; the outcome is delivered later (or
/// immediately, on the same stack) through the call's sink. Exactly one
/// callback per call is expected, but the registry tolerates zero, two, or
/// a callback with the wrong token.
pub trait ForeignSurface: Send + Sync {
    /// Label used in logs.
    fn name(&self) -> &str {
        "foreign"
    }

    /// Start `call`. An `Err` means the call never started and no callback
    /// will follow.
    fn invoke(&self, call: ForeignCall) -> Result<(), SurfaceError>;

    /// Plain request/response calls that return a value directly.
    fn invoke_sync(&self, operation: &str, args: &str) -> Result<String, SurfaceError> {
        let _ = (operation, args);
        Err(SurfaceError::SyncUnsupported)
    }
}
