//! q-sign signature verification.
//!
//! The verifier recomputes the signature from the received request:
//!
//! 1. Check that `q-sign-time` equals `q-key-time` and that the current time
//!    falls inside that window (widened by the configured clock skew).
//! 2. Resolve the secret key for `q-ak`.
//! 3. Re-canonicalize the request restricted to exactly the names in
//!    `q-header-list` / `q-url-param-list`. The canonicalizer sorts on its
//!    own, so the manifest order carries no weight.
//! 4. Re-derive the signing key, recompute the HMAC and compare in constant time.
//!
//! Every failure is reported as [`AuthError::AuthenticationFailed`]. The
//! specific reason is only logged at debug level.

use std::collections::HashSet;

use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::Filter;
use crate::clock::{Clock, SystemClock};
use crate::config::SignerConfig;
use crate::credentials::CredentialProvider;
use crate::error::AuthError;
use crate::request::SignableRequest;
use crate::signer::{SignatureResult, canonicalize_request};
use crate::window::{SignAlgorithm, SigningWindow, derive_signing_key_with};

/// The result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRequest {
    /// The access key ID that signed the request.
    pub access_key_id: String,
    /// The window the signature was bound to.
    pub window: SigningWindow,
    /// The header names that were included in the signature.
    pub signed_headers: Vec<String>,
    /// The parameter names that were included in the signature.
    pub signed_params: Vec<String>,
}

/// Recomputes and checks q-sign signatures.
///
/// # Examples
///
/// ```
/// use qcos_auth::canonical::Filter;
/// use qcos_auth::clock::FixedClock;
/// use qcos_auth::credentials::{Credential, StaticCredentialProvider};
/// use qcos_auth::request::RawRequest;
/// use qcos_auth::signer::sign;
/// use qcos_auth::verifier::Verifier;
/// use qcos_auth::window::SigningWindow;
///
/// let credential = Credential::new("AKID1", "secret123");
/// let request = RawRequest::new("GET", "/bucket/object").with_header("Host", "example.com");
/// let window = SigningWindow::new(1_600_000_000, 1_600_000_060).unwrap();
/// let auth = sign(&credential, &request, &window, &Filter::NonEmpty, &Filter::NonEmpty).unwrap();
///
/// let verifier = Verifier::new(StaticCredentialProvider::from_credentials([credential]))
///     .with_clock(FixedClock(1_600_000_030));
/// let verified = verifier.verify(&request, &auth.to_string()).unwrap();
/// assert_eq!(verified.access_key_id, "AKID1");
/// ```
#[derive(Debug, Clone)]
pub struct Verifier<P, C = SystemClock> {
    provider: P,
    clock: C,
    clock_skew: i64,
}

impl<P: CredentialProvider> Verifier<P> {
    /// Create a verifier on the system clock with no skew tolerance.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            clock: SystemClock,
            clock_skew: 0,
        }
    }
}

impl<P: CredentialProvider, C: Clock> Verifier<P, C> {
    /// Replace the clock used for expiry checks.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Verifier<P, C2> {
        Verifier {
            provider: self.provider,
            clock,
            clock_skew: self.clock_skew,
        }
    }

    /// Apply the verification settings of `config`, currently the clock skew.
    #[must_use]
    pub fn with_config(self, config: &SignerConfig) -> Self {
        self.with_clock_skew(config.clock_skew_secs)
    }

    /// Widen both window bounds by `secs` seconds.
    #[must_use]
    pub fn with_clock_skew(mut self, secs: i64) -> Self {
        self.clock_skew = secs.max(0);
        self
    }

    /// Verify a request against a rendered authorization value.
    pub fn verify(
        &self,
        request: &impl SignableRequest,
        authorization: &str,
    ) -> Result<VerifiedRequest, AuthError> {
        let claimed = SignatureResult::parse(authorization).inspect_err(|_| {
            debug!("Rejected malformed authorization value");
        })?;
        self.verify_result(request, &claimed)
    }

    /// Verify a request that carries its authorization in the `Authorization` header.
    pub fn verify_header(
        &self,
        request: &impl SignableRequest,
    ) -> Result<VerifiedRequest, AuthError> {
        let headers = request.headers().map_err(|e| reject(&e.to_string()))?;
        let authorization = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(http::header::AUTHORIZATION.as_str()))
            .map(|(_, value)| *value)
            .ok_or_else(|| reject("missing authorization header"))?;
        self.verify(request, authorization)
    }

    /// Verify a presigned request carrying the `q-*` fields in its query string.
    pub fn verify_presigned(
        &self,
        request: &impl SignableRequest,
    ) -> Result<VerifiedRequest, AuthError> {
        let params = request.query_params().map_err(|e| reject(&e.to_string()))?;
        let claimed =
            SignatureResult::from_query_params(params.iter().map(|(k, v)| (&**k, &**v)))
                .ok_or_else(|| reject("missing presigned query parameters"))?;
        self.verify_result(request, &claimed)
    }

    /// Verify a request against already-parsed authorization fields.
    pub fn verify_result(
        &self,
        request: &impl SignableRequest,
        claimed: &SignatureResult,
    ) -> Result<VerifiedRequest, AuthError> {
        self.check(request, claimed).map_err(reject)
    }

    fn check(
        &self,
        request: &impl SignableRequest,
        claimed: &SignatureResult,
    ) -> Result<VerifiedRequest, &'static str> {
        let algorithm: SignAlgorithm = claimed
            .algorithm
            .parse()
            .map_err(|_| "unsupported algorithm")?;

        if claimed.sign_time != claimed.key_time {
            return Err("sign time and key time differ");
        }
        let window = claimed.window().map_err(|_| "malformed window")?;

        let now = self.clock.now();
        if !window.contains(now, self.clock_skew) {
            return Err("outside signing window");
        }

        let secret_key = self
            .provider
            .get_secret_key(&claimed.access_key_id)
            .map_err(|_| "unknown access key")?;

        let signed_headers = claimed.signed_headers();
        let signed_params = claimed.signed_params();

        let headers = request.headers().map_err(|_| "invalid header value")?;
        let present_headers: HashSet<String> = headers
            .iter()
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect();
        if !signed_headers.iter().all(|h| present_headers.contains(h)) {
            return Err("signed header missing from request");
        }

        let present_params: HashSet<String> = request
            .query_params()
            .map_err(|_| "invalid query parameter")?
            .iter()
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect();
        if !signed_params.iter().all(|p| present_params.contains(p)) {
            return Err("signed parameter missing from request");
        }

        let canonical = canonicalize_request(
            request,
            &Filter::only(&signed_headers),
            &Filter::only(&signed_params),
        )
        .map_err(|_| "request cannot be canonicalized")?;

        let signing_key = derive_signing_key_with(algorithm, &secret_key, &window)
            .map_err(|_| "malformed window")?;
        let expected = algorithm.hmac_hex(
            signing_key.as_bytes(),
            canonical.canonical_string.as_bytes(),
        );

        if !bool::from(claimed.signature.as_bytes().ct_eq(expected.as_bytes())) {
            return Err("signature mismatch");
        }

        debug!(access_key_id = %claimed.access_key_id, "Signature verification succeeded");
        Ok(VerifiedRequest {
            access_key_id: claimed.access_key_id.clone(),
            window,
            signed_headers: canonical.signed_headers,
            signed_params: canonical.signed_params,
        })
    }
}

fn reject(reason: &str) -> AuthError {
    debug!(reason, "Signature verification failed");
    AuthError::AuthenticationFailed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::credentials::{Credential, StaticCredentialProvider};
    use crate::request::RawRequest;
    use crate::signer::sign;

    const START: i64 = 1_600_000_000;
    const END: i64 = 1_600_000_060;

    fn credential() -> Credential {
        Credential::new("AKID1", "secret123")
    }

    fn verifier_at(now: i64) -> Verifier<StaticCredentialProvider, FixedClock> {
        Verifier::new(StaticCredentialProvider::from_credentials([credential()]))
            .with_clock(FixedClock(now))
    }

    fn request() -> RawRequest {
        RawRequest::new("PUT", "/bucket/object")
            .with_header("Host", "example.com")
            .with_header("Content-Type", "text/plain")
            .with_query("versionId", "v 1")
    }

    fn signed(request: &RawRequest) -> SignatureResult {
        sign(
            &credential(),
            request,
            &SigningWindow::new(START, END).unwrap(),
            &Filter::NonEmpty,
            &Filter::NonEmpty,
        )
        .unwrap()
    }

    #[test]
    fn test_should_verify_signed_request() {
        let request = request();
        let auth = signed(&request);

        let verified = verifier_at(START + 30)
            .verify(&request, &auth.to_authorization())
            .unwrap();
        assert_eq!(verified.access_key_id, "AKID1");
        assert_eq!(verified.signed_headers, vec!["content-type", "host"]);
        assert_eq!(verified.signed_params, vec!["versionid"]);
    }

    #[test]
    fn test_should_accept_window_bounds_inclusively() {
        let request = request();
        let auth = signed(&request).to_authorization();
        assert!(verifier_at(START).verify(&request, &auth).is_ok());
        assert!(verifier_at(END).verify(&request, &auth).is_ok());
    }

    #[test]
    fn test_should_reject_expired_window_regardless_of_signature() {
        let request = request();
        let auth = signed(&request).to_authorization();
        let result = verifier_at(END + 1).verify(&request, &auth);
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));

        let result = verifier_at(START - 1).verify(&request, &auth);
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }

    #[test]
    fn test_should_honor_clock_skew() {
        let request = request();
        let auth = signed(&request).to_authorization();
        let verifier = verifier_at(END + 10).with_clock_skew(10);
        assert!(verifier.verify(&request, &auth).is_ok());
    }

    #[test]
    fn test_should_take_clock_skew_from_config() {
        let request = request();
        let auth = signed(&request).to_authorization();
        let config = SignerConfig::from_lookup(|name| {
            (name == "COS_CLOCK_SKEW").then(|| "10".to_owned())
        })
        .unwrap();

        assert!(verifier_at(END + 10).verify(&request, &auth).is_err());
        let verifier = verifier_at(END + 10).with_config(&config);
        assert!(verifier.verify(&request, &auth).is_ok());
        let verifier = verifier_at(END + 11).with_config(&config);
        assert!(verifier.verify(&request, &auth).is_err());
    }

    #[test]
    fn test_should_fail_after_mutating_signed_header() {
        let mut request = request();
        let auth = signed(&request).to_authorization();
        request.set_header("Content-Type", "application/json");

        let result = verifier_at(START + 1).verify(&request, &auth);
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }

    #[test]
    fn test_should_ignore_unsigned_headers_added_later() {
        let request = request();
        let auth = signed(&request).to_authorization();
        let request = request.with_header("Authorization", auth.clone());

        assert!(verifier_at(START + 1).verify(&request, &auth).is_ok());
    }

    #[test]
    fn test_should_fail_when_signed_header_is_removed() {
        let request = request();
        let auth = signed(&request).to_authorization();
        let mut stripped = request.clone();
        stripped.headers.retain(|(name, _)| name != "Content-Type");

        let result = verifier_at(START + 1).verify(&stripped, &auth);
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }

    #[test]
    fn test_should_resort_manifest_names_before_canonicalizing() {
        let request = request();
        let mut auth = signed(&request);
        assert_eq!(auth.header_list, "content-type;host");
        auth.header_list = "host;content-type".to_owned();

        assert!(verifier_at(START + 1).verify_result(&request, &auth).is_ok());
    }

    #[test]
    fn test_should_reject_diverging_sign_and_key_time() {
        let request = request();
        let mut auth = signed(&request);
        auth.sign_time = format!("{START};{}", END + 3600);

        let result = verifier_at(START + 1).verify_result(&request, &auth);
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }

    #[test]
    fn test_should_reject_unknown_access_key_and_wrong_secret() {
        let request = request();
        let auth = signed(&request).to_authorization();

        let empty = Verifier::new(StaticCredentialProvider::new(vec![]))
            .with_clock(FixedClock(START + 1));
        assert!(matches!(
            empty.verify(&request, &auth),
            Err(AuthError::AuthenticationFailed)
        ));

        let wrong = Verifier::new(StaticCredentialProvider::new(vec![(
            "AKID1".to_owned(),
            "not-the-secret".to_owned(),
        )]))
        .with_clock(FixedClock(START + 1));
        assert!(matches!(
            wrong.verify(&request, &auth),
            Err(AuthError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_should_reject_malformed_authorization() {
        let request = request();
        for bad in ["", "q-sign-algorithm=sha1", "garbage&&&&&&"] {
            let result = verifier_at(START + 1).verify(&request, bad);
            assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
        }
    }

    #[test]
    fn test_should_reject_unsupported_algorithm() {
        let request = request();
        let mut auth = signed(&request);
        auth.algorithm = "sha256".to_owned();

        let result = verifier_at(START + 1).verify_result(&request, &auth);
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }

    #[test]
    fn test_should_verify_authorization_header() {
        let request = request();
        let auth = signed(&request).to_authorization();
        let request = request.with_header("authorization", auth);

        assert!(verifier_at(START + 1).verify_header(&request).is_ok());
        assert!(verifier_at(START + 1).verify_header(&self::request()).is_err());
    }

    #[test]
    fn test_should_verify_presigned_query_parameters() {
        let base = request();
        let auth = signed(&base);

        let mut presigned = base.clone();
        for (name, value) in auth.to_query_pairs() {
            presigned.query.push((name.to_owned(), value));
        }

        let verified = verifier_at(START + 1).verify_presigned(&presigned).unwrap();
        assert_eq!(verified.signed_params, vec!["versionid"]);

        let tampered = presigned.clone().with_query("versionId", "v2");
        assert!(verifier_at(START + 1).verify_presigned(&tampered).is_err());
        assert!(verifier_at(START + 1).verify_presigned(&base).is_err());
    }

    #[test]
    fn test_should_round_trip_repeated_names_with_empty_values() {
        let request = RawRequest::new("GET", "/bucket")
            .with_header("Host", "example.com")
            .with_query("tag", "")
            .with_query("tag", "a");
        let auth = signed(&request);
        assert_eq!(auth.param_list, "tag");

        assert!(verifier_at(START + 1).verify(&request, &auth.to_authorization()).is_ok());
    }

    #[test]
    fn test_should_round_trip_repeated_headers_under_custom_filter() {
        let request = RawRequest::new("GET", "/bucket")
            .with_header("x-a", "keep")
            .with_header("x-a", "drop");
        let auth = sign(
            &credential(),
            &request,
            &SigningWindow::new(START, END).unwrap(),
            &Filter::custom(|_, value| value != "drop"),
            &Filter::NonEmpty,
        )
        .unwrap();

        assert!(verifier_at(START + 1).verify(&request, &auth.to_authorization()).is_ok());
    }

    #[test]
    fn test_should_round_trip_param_names_that_need_encoding() {
        let request = RawRequest::new("GET", "/bucket")
            .with_header("Host", "example.com")
            .with_query("My Param", "1")
            .with_query("a;b", "2")
            .with_query("a&b", "3");
        let auth = signed(&request);
        assert_eq!(auth.param_list, "a%26b;a%3Bb;my%20param");

        let verified = verifier_at(START + 1)
            .verify(&request, &auth.to_authorization())
            .unwrap();
        assert_eq!(verified.signed_params, vec!["a%26b", "a%3Bb", "my%20param"]);

        let mut tampered = request.clone();
        tampered.query[1].1 = "3".to_owned();
        let result = verifier_at(START + 1).verify(&tampered, &auth.to_authorization());
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }

    #[test]
    fn test_should_verify_empty_selection() {
        let request = request();
        let auth = sign(
            &credential(),
            &request,
            &SigningWindow::new(START, END).unwrap(),
            &Filter::only::<_, &str>([]),
            &Filter::only::<_, &str>([]),
        )
        .unwrap();

        let verified = verifier_at(START + 1)
            .verify(&request, &auth.to_authorization())
            .unwrap();
        assert!(verified.signed_headers.is_empty());
        assert!(verified.signed_params.is_empty());
    }
}
