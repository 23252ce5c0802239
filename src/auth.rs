//! Credential material for authenticating filters.
//!
//! Secrets are wrapped in [`secrecy::SecretString`] so they never appear in
//! debug output or logs; filters expose them only at the moment a signature
//! or authorization header is computed.

use secrecy::{ExposeSecret, SecretString};

use crate::error::CloudError;

/// Identity plus secret for one provider account.
#[derive(Clone)]
pub struct Credentials {
    identity: String,
    secret: SecretString,
}

impl Credentials {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Expose the secret for signing. Callers must not persist the returned
    /// reference.
    pub fn expose_secret(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Supplies credentials to authenticating filters. Read-only from the
/// engine's perspective.
pub trait CredentialSource: Send + Sync {
    fn credentials(&self) -> Result<Credentials, CloudError>;
}

/// Fixed credentials configured at startup.
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(identity, secret),
        }
    }
}

impl CredentialSource for StaticCredentials {
    fn credentials(&self) -> Result<Credentials, CloudError> {
        Ok(self.credentials.clone())
    }
}
