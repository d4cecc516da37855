//! Read-only request abstraction consumed by the signer and verifier.
//!
//! [`SignableRequest`] is implemented for [`http::request::Parts`],
//! [`http::Request`], and the transport-agnostic [`RawRequest`].

use std::borrow::Cow;

use http::{HeaderMap, Uri};
use percent_encoding::percent_decode_str;

use crate::error::AuthError;

/// A request that can be canonicalized.
pub trait SignableRequest {
    /// HTTP method, in any case.
    fn method(&self) -> &str;

    /// URI path, without the query string.
    fn path(&self) -> &str;

    /// Query parameters with URL-decoded names and values. Repeated names are
    /// repeated entries.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidParamValue`] if a decoded name or value is
    /// not valid UTF-8.
    fn query_params(&self) -> Result<Vec<(Cow<'_, str>, Cow<'_, str>)>, AuthError>;

    /// Header name/value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidHeaderValue`] if a value is not valid UTF-8.
    fn headers(&self) -> Result<Vec<(&str, &str)>, AuthError>;
}

/// A plain request value, independent of any HTTP library.
///
/// # Examples
///
/// ```
/// use qcos_auth::request::{RawRequest, SignableRequest};
///
/// let request = RawRequest::new("GET", "/bucket/object")
///     .with_query("prefix", "logs/")
///     .with_header("Host", "example.com");
/// assert_eq!(request.headers().unwrap(), vec![("Host", "example.com")]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRequest {
    /// HTTP method.
    pub method: String,
    /// URI path.
    pub path: String,
    /// Decoded query parameters.
    pub query: Vec<(String, String)>,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
}

impl RawRequest {
    /// Create a request with no query parameters or headers.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Append a decoded query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace every header matching `name` (case-insensitively) with one value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_owned(), value.into()));
    }
}

impl SignableRequest for RawRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn query_params(&self) -> Result<Vec<(Cow<'_, str>, Cow<'_, str>)>, AuthError> {
        Ok(self
            .query
            .iter()
            .map(|(k, v)| (Cow::Borrowed(k.as_str()), Cow::Borrowed(v.as_str())))
            .collect())
    }

    fn headers(&self) -> Result<Vec<(&str, &str)>, AuthError> {
        Ok(self
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect())
    }
}

impl SignableRequest for http::request::Parts {
    fn method(&self) -> &str {
        self.method.as_str()
    }

    fn path(&self) -> &str {
        self.uri.path()
    }

    fn query_params(&self) -> Result<Vec<(Cow<'_, str>, Cow<'_, str>)>, AuthError> {
        decode_query(&self.uri)
    }

    fn headers(&self) -> Result<Vec<(&str, &str)>, AuthError> {
        collect_headers(&self.headers)
    }
}

impl<B> SignableRequest for http::Request<B> {
    fn method(&self) -> &str {
        self.method().as_str()
    }

    fn path(&self) -> &str {
        self.uri().path()
    }

    fn query_params(&self) -> Result<Vec<(Cow<'_, str>, Cow<'_, str>)>, AuthError> {
        decode_query(self.uri())
    }

    fn headers(&self) -> Result<Vec<(&str, &str)>, AuthError> {
        collect_headers(http::Request::headers(self))
    }
}

/// Split and percent-decode the query string of `uri`. `+` is kept literally.
fn decode_query(uri: &Uri) -> Result<Vec<(Cow<'_, str>, Cow<'_, str>)>, AuthError> {
    let Some(query) = uri.query() else {
        return Ok(Vec::new());
    };
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| -> Result<_, AuthError> {
            let (k, v) = param.split_once('=').unwrap_or((param, ""));
            Ok((url_decode(k)?, url_decode(v)?))
        })
        .collect()
}

/// Invalid UTF-8 is rejected rather than replaced, so distinct wire values
/// never decode to the same string.
fn url_decode(input: &str) -> Result<Cow<'_, str>, AuthError> {
    percent_decode_str(input)
        .decode_utf8()
        .map_err(|_| AuthError::InvalidParamValue(input.to_owned()))
}

fn collect_headers(headers: &HeaderMap) -> Result<Vec<(&str, &str)>, AuthError> {
    headers
        .iter()
        .map(|(name, value)| {
            value
                .to_str()
                .map(|v| (name.as_str(), v))
                .map_err(|_| AuthError::InvalidHeaderValue(name.as_str().to_owned()))
        })
        .collect()
}
