//! Redaction of hub access tokens.

use std::fmt;

/// A hub access token that redacts itself in Debug and Display output.
///
/// The raw value is only reachable through [`expose`][AccessToken::expose],
/// so a token never leaks through logs or error messages by accident.
#[derive(Clone, Default)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token value.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token. Pass this to the hub client only.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<&str> for AccessToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AccessToken {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_redact() {
        let token = AccessToken::new("hf_abc123");
        assert_eq!(format!("{:?}", token), "AccessToken([REDACTED])");
        assert_eq!(format!("{}", token), "[REDACTED]");
    }

    #[test]
    fn test_expose_returns_raw_value() {
        let token = AccessToken::new("hf_abc123");
        assert_eq!(token.expose(), "hf_abc123");
    }
}
