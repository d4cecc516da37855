//! q-sign request signing.
//!
//! Signing runs in a fixed order so that no work happens on invalid input:
//!
//! 1. Validate the signing window.
//! 2. Canonicalize the request into the canonical string and name manifest.
//! 3. Derive the window-scoped signing key from the secret key.
//! 4. `signature = hex(HMAC-SHA1(signing_key, canonical_string))`.
//! 5. Assemble a [`SignatureResult`] whose `q-sign-time` and `q-key-time` are
//!    the same window string.
//!
//! The rendered authorization value is
//!
//! ```text
//! q-sign-algorithm=sha1&q-ak=<ak>&q-sign-time=<s>;<e>&q-key-time=<s>;<e>
//!   &q-header-list=<h1;h2>&q-url-param-list=<p1;p2>&q-signature=<hex>
//! ```

use std::fmt;
use std::time::Duration;

use http::HeaderValue;
use tracing::debug;

use crate::canonical::{CanonicalRequest, Filter, canonicalize, encode, parse_name_list};
use crate::clock::{Clock, SystemClock};
use crate::config::SignerConfig;
use crate::consts::{
    FIELD_ORDER, Q_AK, Q_HEADER_LIST, Q_KEY_TIME, Q_SIGN_ALGORITHM, Q_SIGN_TIME, Q_SIGNATURE,
    Q_URL_PARAM_LIST,
};
use crate::credentials::Credential;
use crate::error::AuthError;
use crate::request::SignableRequest;
use crate::window::{SignAlgorithm, SigningWindow, derive_signing_key_with};

/// Every field of a q-sign authorization value.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureResult {
    /// Signing algorithm, always `sha1`.
    pub algorithm: String,
    /// Access key ID of the signing credential.
    pub access_key_id: String,
    /// Claimed signing window, `"<start>;<end>"`.
    pub sign_time: String,
    /// Key derivation window; identical to `sign_time`.
    pub key_time: String,
    /// Sorted signed header names joined by `;`.
    pub header_list: String,
    /// Sorted signed parameter names joined by `;`.
    pub param_list: String,
    /// Lowercase hex signature.
    pub signature: String,
}

impl SignatureResult {
    /// Render the authorization value with fields in wire order.
    #[must_use]
    pub fn to_authorization(&self) -> String {
        self.fields()
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Render as a sensitive `Authorization` header value.
    pub fn to_header_value(&self) -> Result<HeaderValue, AuthError> {
        let mut value = HeaderValue::from_str(&self.to_authorization())
            .map_err(|_| AuthError::InvalidHeaderValue(http::header::AUTHORIZATION.to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// The seven fields as query parameters, for presigned URLs.
    ///
    /// Values are not encoded; see [`SignatureResult::to_query_string`].
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        self.fields()
            .into_iter()
            .map(|(name, value)| (name, value.to_owned()))
            .collect()
    }

    /// The seven fields as a percent-encoded query string, for presigned URLs.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        self.fields()
            .iter()
            .map(|(name, value)| format!("{name}={}", encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parse a rendered authorization value.
    ///
    /// The seven fields must all be present, in wire order, with no extras.
    /// Each value runs up to the `&` that introduces the next expected field,
    /// so an access key ID may itself contain `&`.
    ///
    /// # Examples
    ///
    /// ```
    /// use qcos_auth::signer::SignatureResult;
    ///
    /// let parsed = SignatureResult::parse(
    ///     "q-sign-algorithm=sha1&q-ak=AKID1&q-sign-time=1;2&q-key-time=1;2\
    ///      &q-header-list=host&q-url-param-list=&q-signature=abc",
    /// )
    /// .unwrap();
    /// assert_eq!(parsed.access_key_id, "AKID1");
    /// assert_eq!(parsed.param_list, "");
    /// ```
    pub fn parse(authorization: &str) -> Result<Self, AuthError> {
        let mut rest = authorization.trim();
        let mut values = [""; 7];
        for (idx, (slot, name)) in values.iter_mut().zip(FIELD_ORDER).enumerate() {
            rest = rest
                .strip_prefix(name)
                .and_then(|r| r.strip_prefix('='))
                .ok_or(AuthError::AuthenticationFailed)?;
            let end = match FIELD_ORDER.get(idx + 1) {
                Some(next) => rest
                    .find(&format!("&{next}="))
                    .ok_or(AuthError::AuthenticationFailed)?,
                None if rest.contains('&') => return Err(AuthError::AuthenticationFailed),
                None => rest.len(),
            };
            *slot = &rest[..end];
            rest = rest[end..].strip_prefix('&').unwrap_or_default();
        }

        let [algorithm, ak, sign_time, key_time, header_list, param_list, signature] = values;
        Ok(Self {
            algorithm: algorithm.to_owned(),
            access_key_id: ak.to_owned(),
            sign_time: sign_time.to_owned(),
            key_time: key_time.to_owned(),
            header_list: header_list.to_owned(),
            param_list: param_list.to_owned(),
            signature: signature.to_owned(),
        })
    }

    /// Read the seven fields from decoded query parameters.
    ///
    /// Returns `None` unless every field is present.
    pub fn from_query_params<'a, I>(params: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut fields: [Option<&str>; 7] = [None; 7];
        for (name, value) in params {
            if let Some(idx) = FIELD_ORDER.iter().position(|f| *f == name) {
                fields[idx] = Some(value);
            }
        }
        let [algorithm, ak, sign_time, key_time, header_list, param_list, signature] = fields;
        Some(Self {
            algorithm: algorithm?.to_owned(),
            access_key_id: ak?.to_owned(),
            sign_time: sign_time?.to_owned(),
            key_time: key_time?.to_owned(),
            header_list: header_list?.to_owned(),
            param_list: param_list?.to_owned(),
            signature: signature?.to_owned(),
        })
    }

    /// The window named by `q-key-time`.
    pub fn window(&self) -> Result<SigningWindow, AuthError> {
        self.key_time.parse()
    }

    /// Decoded names from `q-header-list`.
    #[must_use]
    pub fn signed_headers(&self) -> Vec<String> {
        parse_name_list(&self.header_list)
    }

    /// Decoded names from `q-url-param-list`.
    #[must_use]
    pub fn signed_params(&self) -> Vec<String> {
        parse_name_list(&self.param_list)
    }

    fn fields(&self) -> [(&'static str, &str); 7] {
        [
            (Q_SIGN_ALGORITHM, self.algorithm.as_str()),
            (Q_AK, self.access_key_id.as_str()),
            (Q_SIGN_TIME, self.sign_time.as_str()),
            (Q_KEY_TIME, self.key_time.as_str()),
            (Q_HEADER_LIST, self.header_list.as_str()),
            (Q_URL_PARAM_LIST, self.param_list.as_str()),
            (Q_SIGNATURE, self.signature.as_str()),
        ]
    }
}

impl fmt::Display for SignatureResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_authorization())
    }
}

/// Sign a request with an explicit window and filters.
///
/// # Errors
///
/// Returns [`AuthError::InvalidWindow`] before any other work if the window is
/// invalid, and propagates canonicalization errors unchanged.
///
/// # Examples
///
/// ```
/// use qcos_auth::canonical::Filter;
/// use qcos_auth::credentials::Credential;
/// use qcos_auth::request::RawRequest;
/// use qcos_auth::signer::sign;
/// use qcos_auth::window::SigningWindow;
///
/// let credential = Credential::new("AKID1", "secret123");
/// let request = RawRequest::new("GET", "/bucket/object").with_header("Host", "example.com");
/// let window = SigningWindow::new(1_600_000_000, 1_600_000_060).unwrap();
///
/// let result = sign(&credential, &request, &window, &Filter::NonEmpty, &Filter::NonEmpty).unwrap();
/// assert_eq!(result.header_list, "host");
/// assert!(result.to_string().starts_with("q-sign-algorithm=sha1&q-ak=AKID1&"));
/// ```
pub fn sign(
    credential: &Credential,
    request: &impl SignableRequest,
    window: &SigningWindow,
    header_filter: &Filter,
    param_filter: &Filter,
) -> Result<SignatureResult, AuthError> {
    window.validate()?;

    let canonical = canonicalize_request(request, header_filter, param_filter)?;
    let algorithm = SignAlgorithm::Sha1;
    let signing_key = derive_signing_key_with(algorithm, credential.secret_key(), window)?;
    let signature = algorithm.hmac_hex(
        signing_key.as_bytes(),
        canonical.canonical_string.as_bytes(),
    );

    let window_str = window.to_string();

    debug!(
        access_key_id = %credential.access_key_id(),
        window = %window_str,
        header_list = %canonical.header_list(),
        param_list = %canonical.param_list(),
        "Signed request"
    );

    Ok(SignatureResult {
        algorithm: algorithm.as_str().to_owned(),
        access_key_id: credential.access_key_id().to_owned(),
        sign_time: window_str.clone(),
        key_time: window_str,
        header_list: canonical.header_list(),
        param_list: canonical.param_list(),
        signature,
    })
}

/// Canonicalize any [`SignableRequest`].
pub fn canonicalize_request(
    request: &impl SignableRequest,
    header_filter: &Filter,
    param_filter: &Filter,
) -> Result<CanonicalRequest, AuthError> {
    let headers = request.headers()?;
    let params = request.query_params()?;
    let param_refs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (&**k, &**v)).collect();

    canonicalize(
        request.method(),
        request.path(),
        &param_refs,
        &headers,
        header_filter,
        param_filter,
    )
}

/// A credential bound to a signing configuration and clock.
///
/// # Examples
///
/// ```
/// use qcos_auth::clock::FixedClock;
/// use qcos_auth::credentials::Credential;
/// use qcos_auth::request::RawRequest;
/// use qcos_auth::signer::Signer;
///
/// let signer = Signer::new(Credential::new("AKID1", "secret123"))
///     .with_clock(FixedClock(1_600_000_000));
/// let request = RawRequest::new("GET", "/bucket/object").with_header("Host", "example.com");
///
/// let result = signer.sign_now(&request).unwrap();
/// assert_eq!(result.sign_time, "1600000000;1600003600");
/// ```
#[derive(Debug, Clone)]
pub struct Signer<C = SystemClock> {
    credential: Credential,
    config: SignerConfig,
    clock: C,
}

impl Signer {
    /// Create a signer with the default configuration and the system clock.
    #[must_use]
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            config: SignerConfig::default(),
            clock: SystemClock,
        }
    }
}

impl<C: Clock> Signer<C> {
    /// Replace the signing configuration.
    #[must_use]
    pub fn with_config(mut self, config: SignerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the clock used for default windows.
    #[must_use]
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Signer<C2> {
        Signer {
            credential: self.credential,
            config: self.config,
            clock,
        }
    }

    /// The signing credential.
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// A fresh window opening now and lasting the configured expiry.
    pub fn window_now(&self) -> Result<SigningWindow, AuthError> {
        SigningWindow::from_clock(&self.clock, Duration::from_secs(self.config.expires_secs))
    }

    /// Sign with the configured header selection within `window`.
    pub fn sign(
        &self,
        request: &impl SignableRequest,
        window: &SigningWindow,
    ) -> Result<SignatureResult, AuthError> {
        sign(
            &self.credential,
            request,
            window,
            &self.config.header_filter(),
            &Filter::NonEmpty,
        )
    }

    /// Sign within a fresh window from the clock.
    pub fn sign_now(&self, request: &impl SignableRequest) -> Result<SignatureResult, AuthError> {
        let window = self.window_now()?;
        self.sign(request, &window)
    }
}
