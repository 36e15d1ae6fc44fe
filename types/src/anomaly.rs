use std::fmt;

/// Which inbound entry point a callback came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryKind {
    Success,
    Error,
}

impl DeliveryKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    /// Token was never minted, already delivered, or torn down.
    UnknownToken,
    /// Callback carried the null handle.
    NullToken,
}

/// A callback that arrived with nowhere to go.
///
/// Recorded by the registry instead of propagated: there is no caller left
/// to receive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    token: u64,
    kind: AnomalyKind,
    delivery: DeliveryKind,
}

impl Anomaly {
    #[must_use]
    pub fn new(token: u64, kind: AnomalyKind, delivery: DeliveryKind) -> Self {
        Self {
            token,
            kind,
            delivery,
        }
    }

    /// Raw token value the foreign side supplied.
    #[must_use]
    pub fn token(&self) -> u64 {
        self.token
    }

    #[must_use]
    pub fn kind(&self) -> AnomalyKind {
        self.kind
    }

    #[must_use]
    pub fn delivery(&self) -> DeliveryKind {
        self.delivery
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AnomalyKind::UnknownToken => write!(
                f,
                "orphaned {} callback for unknown token #{}",
                self.delivery.label(),
                self.token
            ),
            AnomalyKind::NullToken => {
                write!(f, "{} callback with null token", self.delivery.label())
            }
        }
    }
}
