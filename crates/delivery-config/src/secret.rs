// ============================================================================
// Shared Secret
// ============================================================================

use std::fmt;

/// Symmetric HMAC key shared by the minter and the gateway.
///
/// `Debug` and `Display` print `[REDACTED]` so the key never ends up in logs
/// when a config struct is dumped with `{:?}`.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret {
    inner: String,
}

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            inner: secret.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<&str> for SharedSecret {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SharedSecret {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted() {
        let secret = SharedSecret::new("super-secret-key");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.as_bytes(), b"super-secret-key");
    }
}
