//! Signing and verification configuration.
//!
//! All configuration is driven by environment variables.

use crate::canonical::Filter;
use crate::consts::{ENV_CLOCK_SKEW, ENV_SIGN_EXPIRES, ENV_SIGN_HEADERS};
use crate::error::AuthError;

/// Default signing window length: one hour.
pub const DEFAULT_EXPIRES_SECS: u64 = 3600;

/// Configuration shared by [`Signer`](crate::Signer) and [`Verifier`](crate::Verifier).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignerConfig {
    /// Length of generated signing windows, in seconds.
    pub expires_secs: u64,
    /// Headers to sign. `None` signs every header with a non-empty value.
    pub header_allowlist: Option<Vec<String>>,
    /// Tolerance applied to both window bounds when verifying, in seconds.
    pub clock_skew_secs: i64,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            expires_secs: DEFAULT_EXPIRES_SECS,
            header_allowlist: None,
            clock_skew_secs: 0,
        }
    }
}

impl SignerConfig {
    /// Load configuration from `COS_SIGN_EXPIRES`, `COS_SIGN_HEADERS` and
    /// `COS_CLOCK_SKEW`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let mut config = Self::default();

        if let Some(v) = lookup(ENV_SIGN_EXPIRES) {
            config.expires_secs = match v.trim().parse() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(AuthError::Config(format!("{ENV_SIGN_EXPIRES}={v}"))),
            };
        }
        if let Some(v) = lookup(ENV_SIGN_HEADERS) {
            let names: Vec<String> = v
                .split(',')
                .map(|n| n.trim().to_ascii_lowercase())
                .filter(|n| !n.is_empty())
                .collect();
            config.header_allowlist = Some(names);
        }
        if let Some(v) = lookup(ENV_CLOCK_SKEW) {
            config.clock_skew_secs = match v.trim().parse() {
                Ok(secs) if secs >= 0 => secs,
                _ => return Err(AuthError::Config(format!("{ENV_CLOCK_SKEW}={v}"))),
            };
        }

        Ok(config)
    }

    /// The header filter implied by the allow-list.
    #[must_use]
    pub fn header_filter(&self) -> Filter {
        match &self.header_allowlist {
            Some(names) => Filter::only(names),
            None => Filter::NonEmpty,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_should_create_default_config() {
        let config = SignerConfig::default();
        assert_eq!(config.expires_secs, 3600);
        assert!(config.header_allowlist.is_none());
        assert_eq!(config.clock_skew_secs, 0);
        assert!(matches!(config.header_filter(), Filter::NonEmpty));
    }

    #[test]
    fn test_should_load_config_from_variables() {
        let config = SignerConfig::from_lookup(lookup(&[
            ("COS_SIGN_EXPIRES", "600"),
            ("COS_SIGN_HEADERS", "Host, content-type,,"),
            ("COS_CLOCK_SKEW", "30"),
        ]))
        .unwrap();

        assert_eq!(config.expires_secs, 600);
        assert_eq!(
            config.header_allowlist,
            Some(vec!["host".to_owned(), "content-type".to_owned()])
        );
        assert_eq!(config.clock_skew_secs, 30);
        assert!(config.header_filter().accepts("host", ""));
    }

    #[test]
    fn test_should_reject_malformed_values() {
        let result = SignerConfig::from_lookup(lookup(&[("COS_SIGN_EXPIRES", "soon")]));
        assert!(matches!(result, Err(AuthError::Config(_))));

        let result = SignerConfig::from_lookup(lookup(&[("COS_SIGN_EXPIRES", "0")]));
        assert!(matches!(result, Err(AuthError::Config(_))));

        let result = SignerConfig::from_lookup(lookup(&[("COS_CLOCK_SKEW", "-1")]));
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_should_deserialize_partial_config_with_defaults() {
        let config: SignerConfig = serde_json::from_str(r#"{"expiresSecs": 120}"#).unwrap();
        assert_eq!(config.expires_secs, 120);
        assert_eq!(config.clock_skew_secs, 0);
        assert!(config.header_allowlist.is_none());
    }
}
