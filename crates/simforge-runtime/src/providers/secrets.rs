//! Credential handling for provider API keys.
//!
//! Keys are wrapped in [`secrecy::SecretString`] so they cannot leak
//! through `Debug` or `Display` and are zeroed on drop. The value is
//! only reachable through an explicit [`ApiCredential::expose`] at the
//! point of use.

use secrecy::{ExposeSecret, SecretString};

use super::ProviderError;

/// Where a credential was loaded from, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Programmatic,
}

/// A provider API key that cannot be accidentally logged.
pub struct ApiCredential {
    secret: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl std::fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredential")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

impl ApiCredential {
    /// Wrap a key supplied programmatically.
    pub fn new(key: impl Into<String>, name: &'static str) -> Self {
        Self {
            secret: SecretString::from(key.into()),
            source: CredentialSource::Programmatic,
            name,
        }
    }

    /// Load a key from an environment variable. The value is never
    /// logged.
    pub fn from_env(env_var: &str, name: &'static str) -> Result<Self, ProviderError> {
        let key = std::env::var(env_var).map_err(|_| {
            ProviderError::NotConfigured(format!("{name} required: set {env_var}"))
        })?;
        if key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "{name} is empty: set {env_var}"
            )));
        }
        Ok(Self {
            secret: SecretString::from(key),
            source: CredentialSource::Environment,
            name,
        })
    }

    /// Expose the key at the point of use.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.secret.expose_secret().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_value() {
        let cred = ApiCredential::new("sk-or-super-secret-123", "test key");
        let debug = format!("{cred:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_expose_returns_value() {
        let cred = ApiCredential::new("sk-or-abc", "test key");
        assert_eq!(cred.expose(), "sk-or-abc");
        assert!(!cred.is_empty());
        assert_eq!(cred.source(), CredentialSource::Programmatic);
    }

    #[test]
    fn test_missing_env_var() {
        let result = ApiCredential::from_env("SIMFORGE_DOES_NOT_EXIST", "test key");
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }
}
