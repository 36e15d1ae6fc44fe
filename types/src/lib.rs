//! Core domain types for relay.
//!
//! Pure data with no IO and no async: tokens, callback payloads, the error
//! taxonomy, and the anomaly records kept for orphaned callbacks.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod anomaly;
mod error;
mod payload;
mod token;

pub use anomaly::{Anomaly, AnomalyKind, DeliveryKind};
pub use error::BridgeError;
pub use payload::{DecodeError, FromPayload, Json, Payload};
pub use token::Token;
