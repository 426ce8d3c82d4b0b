//! Provider Credentials

use std::fmt;

/// LLM provider API key.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting blank input
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Pick the typed key if present, otherwise the startup fallback
    pub fn resolve(typed: Option<&str>, fallback: Option<&Self>) -> Option<Self> {
        typed
            .and_then(Self::new)
            .or_else(|| fallback.cloned())
    }

    /// Raw secret for the Authorization header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_rejected() {
        assert!(ApiKey::new("   ").is_none());
        assert!(ApiKey::new("").is_none());
    }

    #[test]
    fn test_resolve_prefers_typed() {
        let fallback = ApiKey::new("from-env").unwrap();
        let key = ApiKey::resolve(Some("typed"), Some(&fallback)).unwrap();
        assert_eq!(key.expose(), "typed");

        let key = ApiKey::resolve(Some(""), Some(&fallback)).unwrap();
        assert_eq!(key.expose(), "from-env");

        assert!(ApiKey::resolve(None, None).is_none());
    }

    #[test]
    fn test_debug_redacts() {
        let key = ApiKey::new("gsk_secret").unwrap();
        assert!(!format!("{key:?}").contains("gsk_secret"));
    }
}
