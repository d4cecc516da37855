//! Credentials and credential lookup.
//!
//! [`Credential`] is the client-side key pair used to sign requests.
//! [`CredentialProvider`] resolves secret keys by access key ID on the
//! verifying side, with [`StaticCredentialProvider`] as an in-memory store for
//! tests and development.

use std::collections::HashMap;
use std::fmt;

use crate::consts::{ENV_SECRET_ID, ENV_SECRET_KEY};
use crate::error::AuthError;

/// An access key ID and its secret key.
///
/// The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_key_id: String,
    secret_key: String,
}

impl Credential {
    /// Create a credential from an access key ID and secret key.
    pub fn new(access_key_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Load a credential from `COS_SECRET_ID` and `COS_SECRET_KEY`.
    ///
    /// Empty variables are treated as unset.
    pub fn from_env() -> Result<Self, AuthError> {
        let access_key_id = read_env(ENV_SECRET_ID)?;
        let secret_key = read_env(ENV_SECRET_KEY)?;
        Ok(Self::new(access_key_id, secret_key))
    }

    /// The access key ID.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The secret key.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

fn read_env(name: &'static str) -> Result<String, AuthError> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(AuthError::MissingCredential(name)),
    }
}

/// Trait for looking up secret keys by access key ID.
///
/// Implementations may back this with a database, configuration file,
/// or any other credential store.
pub trait CredentialProvider: Send + Sync {
    /// Retrieve the secret key for the given access key ID.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccessKeyNotFound`] if the access key ID is not recognized.
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, AuthError>;
}

/// A simple in-memory credential provider backed by a `HashMap`.
///
/// # Examples
///
/// ```
/// use qcos_auth::credentials::{Credential, CredentialProvider, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::from_credentials([Credential::new("AKID1", "secret123")]);
///
/// let secret = provider.get_secret_key("AKID1").unwrap();
/// assert_eq!(secret, "secret123");
/// ```
#[derive(Clone)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, String>,
}

impl StaticCredentialProvider {
    /// Create a provider from (access_key_id, secret_key) pairs.
    pub fn new(credentials: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            credentials: credentials.into_iter().collect(),
        }
    }

    /// Create a provider from client-side credentials.
    pub fn from_credentials(credentials: impl IntoIterator<Item = Credential>) -> Self {
        Self::new(
            credentials
                .into_iter()
                .map(|c| (c.access_key_id, c.secret_key)),
        )
    }
}

impl fmt::Debug for StaticCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.credentials.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("StaticCredentialProvider")
            .field("access_key_ids", &keys)
            .finish()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, AuthError> {
        self.credentials
            .get(access_key_id)
            .cloned()
            .ok_or_else(|| AuthError::AccessKeyNotFound(access_key_id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_return_secret_key_for_known_access_key() {
        let provider =
            StaticCredentialProvider::new(vec![("AKID".to_owned(), "secret".to_owned())]);

        let result = provider.get_secret_key("AKID");
        assert_eq!(result.unwrap(), "secret");
    }

    #[test]
    fn test_should_return_error_for_unknown_access_key() {
        let provider = StaticCredentialProvider::new(vec![]);

        let result = provider.get_secret_key("UNKNOWN");
        assert!(matches!(result, Err(AuthError::AccessKeyNotFound(_))));
    }

    #[test]
    fn test_should_redact_secret_in_debug_output() {
        let credential = Credential::new("AKID1", "secret123");
        let debug = format!("{credential:?}");
        assert!(debug.contains("AKID1"));
        assert!(!debug.contains("secret123"));

        let provider = StaticCredentialProvider::from_credentials([credential]);
        assert!(!format!("{provider:?}").contains("secret123"));
    }
}
