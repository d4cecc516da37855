//! Error types for q-sign signing and verification.
//!
//! All failures are represented by [`AuthError`]. Signing errors carry enough
//! detail to locate the caller bug; verification collapses every failure into
//! [`AuthError::AuthenticationFailed`] so a rejected request reveals nothing
//! about which check tripped.

/// Errors that can occur while signing or verifying a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The signing window is inverted, empty, or has a non-positive bound.
    #[error("invalid signing window: {start};{end}")]
    InvalidWindow {
        /// Window start (unix seconds).
        start: i64,
        /// Window end (unix seconds).
        end: i64,
    },

    /// A header or parameter name is empty or contains non-ASCII characters.
    #[error("invalid header or parameter name: {0:?}")]
    InvalidName(String),

    /// A header value is not valid UTF-8 and cannot be placed in the canonical string.
    #[error("header value is not valid UTF-8: {0}")]
    InvalidHeaderValue(String),

    /// A percent-decoded query name or value is not valid UTF-8.
    #[error("query parameter is not valid UTF-8 after decoding: {0}")]
    InvalidParamValue(String),

    /// The `q-sign-algorithm` value is not supported (only `sha1` is).
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The access key ID was not found in the credential store.
    #[error("access key not found: {0}")]
    AccessKeyNotFound(String),

    /// A required credential environment variable is not set.
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    /// A configuration value could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The request signature could not be verified.
    #[error("authentication failed")]
    AuthenticationFailed,
}
