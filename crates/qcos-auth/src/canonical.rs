//! Canonical request construction for q-sign signatures.
//!
//! The canonical string is four lines, each terminated by `\n`:
//!
//! ```text
//! lowercase(HTTPMethod)\n
//! URIPath\n
//! CanonicalQuery\n
//! CanonicalHeaders\n
//! ```
//!
//! `CanonicalQuery` and `CanonicalHeaders` are `name=value` pairs joined by
//! `&`, sorted byte-wise by name, then by value for repeated names. Names are
//! lowercased and percent-encoded; parameter values are percent-encoded;
//! header values are used verbatim. A name is selected as a whole: when the
//! filter accepts any entry under it, all of its entries are signed.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use tracing::debug;

use crate::consts::{LINE_SEPARATOR, LIST_SEPARATOR};
use crate::error::AuthError;

/// Characters percent-encoded in names and parameter values.
///
/// Everything except the RFC 3986 unreserved set (A-Z, a-z, 0-9, `-`, `_`,
/// `.`, `~`) is encoded, so a space becomes `%20`, never `+`.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

type Predicate = dyn Fn(&str, &str) -> bool + Send + Sync;

/// Selects which headers or query parameters participate in the signature.
///
/// Predicates see the lowercased name and the raw value.
#[derive(Clone, Default)]
pub enum Filter {
    /// Every entry whose value is non-empty.
    #[default]
    NonEmpty,
    /// Every entry, empty values included.
    All,
    /// Entries whose lowercased name is in the set, empty values included.
    Only(BTreeSet<String>),
    /// A caller-supplied predicate over `(lowercased name, value)`.
    Custom(Arc<Predicate>),
}

impl Filter {
    /// Allow-list filter; names are matched case-insensitively.
    ///
    /// # Examples
    ///
    /// ```
    /// use qcos_auth::canonical::Filter;
    ///
    /// let filter = Filter::only(["Host", "content-type"]);
    /// assert!(filter.accepts("host", "example.com"));
    /// assert!(filter.accepts("content-type", ""));
    /// assert!(!filter.accepts("x-cos-meta", "1"));
    /// ```
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Only(
            names
                .into_iter()
                .map(|n| n.as_ref().to_ascii_lowercase())
                .collect(),
        )
    }

    /// Filter backed by an arbitrary predicate.
    pub fn custom(predicate: impl Fn(&str, &str) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(predicate))
    }

    /// Whether an entry with the given lowercased name and value is selected.
    #[must_use]
    pub fn accepts(&self, name: &str, value: &str) -> bool {
        match self {
            Self::NonEmpty => !value.is_empty(),
            Self::All => true,
            Self::Only(names) => names.contains(name),
            Self::Custom(predicate) => predicate(name, value),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonEmpty => f.write_str("NonEmpty"),
            Self::All => f.write_str("All"),
            Self::Only(names) => f.debug_tuple("Only").field(names).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// The canonical form of a request plus the manifest of signed names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// Lowercased HTTP method.
    pub method: String,
    /// Sorted, deduplicated, lowercased (and encoded) header names.
    pub signed_headers: Vec<String>,
    /// Sorted, deduplicated, lowercased (and encoded) parameter names.
    pub signed_params: Vec<String>,
    /// The string fed into the final HMAC.
    pub canonical_string: String,
}

impl CanonicalRequest {
    /// Signed header names joined by `;`, the `q-header-list` value.
    #[must_use]
    pub fn header_list(&self) -> String {
        join_names(&self.signed_headers)
    }

    /// Signed parameter names joined by `;`, the `q-url-param-list` value.
    #[must_use]
    pub fn param_list(&self) -> String {
        join_names(&self.signed_params)
    }
}

/// Canonicalize a request.
///
/// `query_params` carries URL-decoded values; repeated names are repeated
/// entries. Only entries selected by the filters participate.
///
/// # Errors
///
/// Returns [`AuthError::InvalidName`] if a selected name is empty or contains
/// non-ASCII characters.
///
/// # Examples
///
/// ```
/// use qcos_auth::canonical::{Filter, canonicalize};
///
/// let canonical = canonicalize(
///     "GET",
///     "/bucket/object",
///     &[("prefix", "a b")],
///     &[("Host", "example.com")],
///     &Filter::NonEmpty,
///     &Filter::NonEmpty,
/// )
/// .unwrap();
/// assert_eq!(
///     canonical.canonical_string,
///     "get\n/bucket/object\nprefix=a%20b\nhost=example.com\n"
/// );
/// assert_eq!(canonical.header_list(), "host");
/// ```
pub fn canonicalize(
    method: &str,
    path: &str,
    query_params: &[(&str, &str)],
    headers: &[(&str, &str)],
    header_filter: &Filter,
    param_filter: &Filter,
) -> Result<CanonicalRequest, AuthError> {
    let params = select_entries(query_params, param_filter, encode)?;
    let headers = select_entries(headers, header_filter, str::to_owned)?;

    let method = method.to_ascii_lowercase();
    let path = if path.is_empty() { "/" } else { path };
    let canonical_query = join_pairs(&params);
    let canonical_headers = join_pairs(&headers);

    let canonical_string = [
        method.as_str(),
        path,
        canonical_query.as_str(),
        canonical_headers.as_str(),
    ]
    .iter()
    .fold(String::new(), |mut acc, segment| {
        acc.push_str(segment);
        acc.push_str(LINE_SEPARATOR);
        acc
    });

    debug!(%canonical_string, "Built canonical string");

    Ok(CanonicalRequest {
        method,
        signed_headers: manifest(&headers),
        signed_params: manifest(&params),
        canonical_string,
    })
}

/// Split a `;`-joined manifest into percent-decoded names.
///
/// Empty segments are dropped, so an empty manifest yields no names.
#[must_use]
pub fn parse_name_list(list: &str) -> Vec<String> {
    list.split(LIST_SEPARATOR)
        .filter(|name| !name.is_empty())
        .map(|name| {
            percent_decode_str(name)
                .decode_utf8_lossy()
                .to_ascii_lowercase()
        })
        .collect()
}

/// Percent-encode a name or parameter value with the request encoding rules.
///
/// # Examples
///
/// ```
/// use qcos_auth::canonical::encode;
///
/// assert_eq!(encode("a b+c/d"), "a%20b%2Bc%2Fd");
/// assert_eq!(encode("safe-_.~"), "safe-_.~");
/// ```
#[must_use]
pub fn encode(input: &str) -> String {
    utf8_percent_encode(input, QUERY_ENCODE_SET).to_string()
}

/// Filter, validate, lowercase and sort entries. Values pass through `render`.
///
/// Selection is per name: once the filter accepts any entry under a name,
/// every entry under that name is signed, so the name manifest alone
/// reproduces the selection.
fn select_entries(
    entries: &[(&str, &str)],
    filter: &Filter,
    render: impl Fn(&str) -> String,
) -> Result<Vec<(String, String)>, AuthError> {
    let lowered: Vec<(String, &str, &str)> = entries
        .iter()
        .map(|&(name, value)| (name.to_ascii_lowercase(), name, value))
        .collect();
    let names: BTreeSet<&str> = lowered
        .iter()
        .filter(|(lower, _, value)| filter.accepts(lower, value))
        .map(|(lower, _, _)| lower.as_str())
        .collect();

    let mut selected = Vec::with_capacity(names.len());
    for (lower, name, value) in &lowered {
        if !names.contains(lower.as_str()) {
            continue;
        }
        validate_name(name)?;
        selected.push((encode(lower), render(*value)));
    }
    selected.sort_unstable();
    Ok(selected)
}

fn validate_name(name: &str) -> Result<(), AuthError> {
    if name.is_empty() || !name.is_ascii() {
        return Err(AuthError::InvalidName(name.to_owned()));
    }
    Ok(())
}

fn join_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Sorted input in, sorted and deduplicated names out.
fn manifest(pairs: &[(String, String)]) -> Vec<String> {
    let mut names: Vec<String> = pairs.iter().map(|(k, _)| k.clone()).collect();
    names.dedup();
    names
}

fn join_names(names: &[String]) -> String {
    names.join(LIST_SEPARATOR)
}
