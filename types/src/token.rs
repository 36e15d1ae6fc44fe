use std::fmt;
use std::num::NonZeroU64;

/// Opaque correlation key handed to the foreign side with every dispatched call.
///
/// Zero is reserved as the null handle and is never minted, so a callback
/// carrying `0` can always be told apart from a real token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(NonZeroU64);

impl Token {
    /// Reconstruct a token from the raw value the foreign side called back with.
    ///
    /// Returns `None` for the null handle.
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    #[must_use]
    pub fn new(id: NonZeroU64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<Token> for u64 {
    fn from(token: Token) -> Self {
        token.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle_is_not_a_token() {
        assert_eq!(Token::from_raw(0), None);
    }

    #[test]
    fn raw_value_survives_the_foreign_side() {
        let token = Token::from_raw(42).unwrap();
        assert_eq!(token.value(), 42);
        assert_eq!(u64::from(token), 42);
        assert_eq!(token.to_string(), "#42");
    }
}
