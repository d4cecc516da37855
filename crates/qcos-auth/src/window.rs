//! Signing windows and time-scoped key derivation.
//!
//! A signing key is bound to exactly one window:
//!
//! ```text
//! SignKey = hex(HMAC-SHA1(SecretKey, "<start>;<end>"))
//! ```
//!
//! The lowercase hex string, not the raw digest, is the key of the final
//! signature step.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use hmac::{Hmac, KeyInit, Mac};
use sha1::Sha1;

use crate::clock::Clock;
use crate::consts::{Q_SIGN_ALGORITHM_SHA1, WINDOW_SEPARATOR};
use crate::error::AuthError;

type HmacSha1 = Hmac<Sha1>;

/// Hash primitive selected by the `q-sign-algorithm` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignAlgorithm {
    /// HMAC-SHA1, rendered as `sha1`.
    #[default]
    Sha1,
}

impl SignAlgorithm {
    /// Wire name of the algorithm.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => Q_SIGN_ALGORITHM_SHA1,
        }
    }

    /// Keyed hash of `data`, hex-encoded in lowercase.
    #[must_use]
    pub fn hmac_hex(self, key: &[u8], data: &[u8]) -> String {
        match self {
            Self::Sha1 => {
                let mut mac =
                    HmacSha1::new_from_slice(key).expect("HMAC can accept keys of any length");
                mac.update(data);
                hex::encode(mac.finalize().into_bytes())
            }
        }
    }
}

impl fmt::Display for SignAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Q_SIGN_ALGORITHM_SHA1 => Ok(Self::Sha1),
            _ => Err(AuthError::UnsupportedAlgorithm(s.to_owned())),
        }
    }
}

/// The time range, in unix seconds, during which a signature is valid.
///
/// Rendered as `"<start>;<end>"`, the exact string fed into key derivation
/// and placed in both `q-sign-time` and `q-key-time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedWindow")]
pub struct SigningWindow {
    /// First second at which the signature is valid.
    pub start_time: i64,
    /// Last second at which the signature is valid.
    pub end_time: i64,
}

/// Deserialized bounds, validated before becoming a [`SigningWindow`].
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedWindow {
    start_time: i64,
    end_time: i64,
}

impl TryFrom<UncheckedWindow> for SigningWindow {
    type Error = AuthError;

    fn try_from(window: UncheckedWindow) -> Result<Self, Self::Error> {
        Self::new(window.start_time, window.end_time)
    }
}

impl SigningWindow {
    /// Create a validated window.
    ///
    /// # Examples
    ///
    /// ```
    /// use qcos_auth::window::SigningWindow;
    ///
    /// let window = SigningWindow::new(1_600_000_000, 1_600_000_060).unwrap();
    /// assert_eq!(window.to_string(), "1600000000;1600000060");
    /// assert!(SigningWindow::new(10, 10).is_err());
    /// ```
    pub fn new(start_time: i64, end_time: i64) -> Result<Self, AuthError> {
        let window = Self {
            start_time,
            end_time,
        };
        window.validate()?;
        Ok(window)
    }

    /// A window opening now and lasting `expires`.
    pub fn from_clock(clock: &dyn Clock, expires: Duration) -> Result<Self, AuthError> {
        let start = clock.now();
        let secs = i64::try_from(expires.as_secs()).map_err(|_| AuthError::InvalidWindow {
            start,
            end: i64::MAX,
        })?;
        Self::new(start, start.saturating_add(secs))
    }

    /// Check that both bounds are positive and `end_time > start_time`.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.start_time <= 0 || self.end_time <= 0 || self.end_time <= self.start_time {
            return Err(AuthError::InvalidWindow {
                start: self.start_time,
                end: self.end_time,
            });
        }
        Ok(())
    }

    /// Whether `now` lies in `[start - skew, end + skew]`.
    #[must_use]
    pub fn contains(&self, now: i64, skew: i64) -> bool {
        let skew = skew.max(0);
        now >= self.start_time.saturating_sub(skew) && now <= self.end_time.saturating_add(skew)
    }
}

impl fmt::Display for SigningWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{WINDOW_SEPARATOR}{}", self.start_time, self.end_time)
    }
}

impl FromStr for SigningWindow {
    type Err = AuthError;

    /// Parse `"<start>;<end>"`. Unparseable bounds are reported as zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(WINDOW_SEPARATOR)
            .ok_or(AuthError::InvalidWindow { start: 0, end: 0 })?;
        let start = start
            .parse()
            .map_err(|_| AuthError::InvalidWindow { start: 0, end: 0 })?;
        let end = end
            .parse()
            .map_err(|_| AuthError::InvalidWindow { start, end: 0 })?;
        Self::new(start, end)
    }
}

/// Derive the window-scoped signing key from a secret key.
///
/// # Examples
///
/// ```
/// use qcos_auth::window::{SigningWindow, derive_signing_key};
///
/// let window = SigningWindow::new(1_600_000_000, 1_600_000_060).unwrap();
/// let key = derive_signing_key("secret123", &window).unwrap();
/// assert_eq!(key, "08735bb7fc592fe3daa37adc1802bd986e9dba71");
/// ```
pub fn derive_signing_key(secret_key: &str, window: &SigningWindow) -> Result<String, AuthError> {
    derive_signing_key_with(SignAlgorithm::Sha1, secret_key, window)
}

/// Derive the signing key with an explicit algorithm.
pub fn derive_signing_key_with(
    algorithm: SignAlgorithm,
    secret_key: &str,
    window: &SigningWindow,
) -> Result<String, AuthError> {
    window.validate()?;
    Ok(algorithm.hmac_hex(secret_key.as_bytes(), window.to_string().as_bytes()))
}
