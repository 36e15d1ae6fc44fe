use thiserror::Error;

use crate::payload::DecodeError;

/// Fault value of a dispatched operation, or a contract breach on a future.
///
/// Cloneable so every reader of a faulted future observes the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Resolving a terminal future, or reading a pending one.
    #[error("invalid state: {reason}")]
    InvalidState { reason: &'static str },

    /// The foreign side reported failure; the message is kept verbatim.
    #[error("{message}")]
    OperationFailed { message: String },

    #[error("could not decode result of '{operation}': {source}")]
    DecodeFailed {
        operation: String,
        #[source]
        source: DecodeError,
    },

    #[error("could not dispatch '{operation}': {reason}")]
    DispatchFailed { operation: String, reason: String },

    #[error("'{operation}' was pending when the foreign surface was replaced")]
    SurfaceReplaced { operation: String },

    #[error("'{operation}' was pending when the bridge shut down")]
    BridgeShutdown { operation: String },

    #[error("continuation panicked")]
    ContinuationPanicked,

    #[error("future was abandoned by its producer")]
    Abandoned,
}

impl BridgeError {
    #[must_use]
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// The foreign-supplied message, if this is an operation failure.
    #[must_use]
    pub fn foreign_message(&self) -> Option<&str> {
        match self {
            Self::OperationFailed { message } => Some(message),
            _ => None,
        }
    }
}
