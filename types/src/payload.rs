//! Raw callback payloads and their conversion into typed results.
//!
//! The foreign side can only call back with three shapes: nothing, a string,
//! or a number. Everything richer travels as JSON text and is decoded through
//! [`Json`].

use serde::de::DeserializeOwned;
use thiserror::Error;

/// What a success callback carried.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Void,
    Text(String),
    Number(f64),
}

impl Payload {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Text(_) => "text",
            Self::Number(_) => "number",
        }
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<()> for Payload {
    fn from((): ()) -> Self {
        Self::Void
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected {expected} payload, got {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid {expected} payload: {reason}")]
    Invalid {
        expected: &'static str,
        reason: String,
    },
}

/// Conversion from a raw callback payload into the result type of a dispatched call.
pub trait FromPayload: Sized {
    fn from_payload(payload: Payload) -> Result<Self, DecodeError>;
}

fn mismatch(expected: &'static str, found: &Payload) -> DecodeError {
    DecodeError::Mismatch {
        expected,
        found: found.kind(),
    }
}

/// Void operations ignore whatever the callback carried.
impl FromPayload for () {
    fn from_payload(_payload: Payload) -> Result<Self, DecodeError> {
        Ok(())
    }
}

impl FromPayload for String {
    fn from_payload(payload: Payload) -> Result<Self, DecodeError> {
        match payload {
            Payload::Text(text) => Ok(text),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl FromPayload for f64 {
    fn from_payload(payload: Payload) -> Result<Self, DecodeError> {
        match payload {
            Payload::Number(n) => Ok(n),
            Payload::Text(text) => text.trim().parse().map_err(|e| DecodeError::Invalid {
                expected: "number",
                reason: format!("{e}"),
            }),
            Payload::Void => Err(mismatch("number", &Payload::Void)),
        }
    }
}

impl FromPayload for f32 {
    fn from_payload(payload: Payload) -> Result<Self, DecodeError> {
        f64::from_payload(payload).map(|n| n as f32)
    }
}

impl FromPayload for bool {
    fn from_payload(payload: Payload) -> Result<Self, DecodeError> {
        match payload {
            Payload::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(DecodeError::Invalid {
                    expected: "bool",
                    reason: format!("'{text}' is not true/false"),
                }),
            },
            other => Err(mismatch("bool", &other)),
        }
    }
}

/// JSON text decoded into `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: DeserializeOwned> FromPayload for Json<T> {
    fn from_payload(payload: Payload) -> Result<Self, DecodeError> {
        match payload {
            Payload::Text(text) => serde_json::from_str(&text)
                .map(Json)
                .map_err(|e| DecodeError::Invalid {
                    expected: "json",
                    reason: e.to_string(),
                }),
            other => Err(mismatch("json", &other)),
        }
    }
}
