//! COS `q-sign` request signing and verification.
//!
//! This crate computes the time-bounded HMAC-SHA1 signature that an
//! object-storage server recomputes to authenticate each request, and
//! provides the matching verifier.
//!
//! # Overview
//!
//! Signing a request takes three steps:
//!
//! 1. **Canonicalize**: select the signed headers and query parameters,
//!    lowercase their names, and build the newline-separated canonical string.
//! 2. **Derive**: `SignKey = hex(HMAC-SHA1(SecretKey, "<start>;<end>"))`, a key
//!    valid only for one signing window.
//! 3. **Sign**: `Signature = hex(HMAC-SHA1(SignKey, CanonicalString))`,
//!    rendered with the window and name manifests as the authorization value.
//!
//! # Usage
//!
//! ```rust
//! use qcos_auth::{Credential, RawRequest, Signer, StaticCredentialProvider, Verifier};
//! use qcos_auth::clock::FixedClock;
//!
//! let credential = Credential::new("AKID1", "secret123");
//! let request = RawRequest::new("GET", "/bucket/object")
//!     .with_header("Host", "example.com")
//!     .with_header("Content-Type", "text/plain");
//!
//! let signer = Signer::new(credential.clone()).with_clock(FixedClock(1_600_000_000));
//! let authorization = signer.sign_now(&request).unwrap().to_string();
//!
//! let verifier = Verifier::new(StaticCredentialProvider::from_credentials([credential]))
//!     .with_clock(FixedClock(1_600_000_100));
//! assert!(verifier.verify(&request, &authorization).is_ok());
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical string construction and header/parameter filters
//! - [`clock`] - Time sources for window generation and expiry checks
//! - [`config`] - Environment-driven signing configuration
//! - [`consts`] - Wire field names and separators
//! - [`credentials`] - Credentials and credential lookup
//! - [`error`] - Error types
//! - [`request`] - Request abstraction over `http` types
//! - [`signer`] - Signature computation and authorization rendering
//! - [`verifier`] - Signature verification
//! - [`window`] - Signing windows and key derivation

pub mod canonical;
pub mod clock;
pub mod config;
pub mod consts;
pub mod credentials;
pub mod error;
pub mod request;
pub mod signer;
pub mod verifier;
pub mod window;

pub use canonical::{CanonicalRequest, Filter, canonicalize};
pub use config::SignerConfig;
pub use credentials::{Credential, CredentialProvider, StaticCredentialProvider};
pub use error::AuthError;
pub use request::{RawRequest, SignableRequest};
pub use signer::{SignatureResult, Signer, sign};
pub use verifier::{VerifiedRequest, Verifier};
pub use window::{SignAlgorithm, SigningWindow, derive_signing_key};
