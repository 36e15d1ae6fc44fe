//! Callback correlation for relay.
//!
//! A call to the foreign side returns a [`Deferred`] right away. The
//! [`HandleRegistry`] remembers which token belongs to which pending future,
//! and the foreign side answers by quoting that token to a [`CallbackSink`].
//! [`Bridge`] ties the two together around a pluggable [`ForeignSurface`].

mod bridge;
mod deferred;
pub mod mock;
mod registry;
mod settings;
mod surface;

pub use bridge::Bridge;
pub use deferred::{Completer, Deferred, Wait};
pub use registry::{CallbackSink, Delivery, HandleRegistry};
pub use settings::{BridgeSettings, OrphanLogLevel};
pub use surface::{ForeignCall, ForeignSurface, SurfaceError};

pub use relay_types::{
    Anomaly, AnomalyKind, BridgeError, DecodeError, DeliveryKind, FromPayload, Json, Payload,
    Token,
};
