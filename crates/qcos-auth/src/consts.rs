//! Wire constants of the q-sign authorization format.
//!
//! Field names are case-sensitive and appear in the rendered authorization
//! value in the order of [`FIELD_ORDER`].

/// Line separator used between canonical string segments.
pub const LINE_SEPARATOR: &str = "\n";

/// Separator between names in `q-header-list` and `q-url-param-list`.
pub const LIST_SEPARATOR: &str = ";";

/// Separator between the start and end of a signing window.
pub const WINDOW_SEPARATOR: char = ';';

/// Signing algorithm field name.
pub const Q_SIGN_ALGORITHM: &str = "q-sign-algorithm";

/// The only supported signing algorithm value.
pub const Q_SIGN_ALGORITHM_SHA1: &str = "sha1";

/// Access key ID field name.
pub const Q_AK: &str = "q-ak";

/// Claimed signing window field name.
pub const Q_SIGN_TIME: &str = "q-sign-time";

/// Key derivation window field name.
pub const Q_KEY_TIME: &str = "q-key-time";

/// Signed header manifest field name.
pub const Q_HEADER_LIST: &str = "q-header-list";

/// Signed query parameter manifest field name.
pub const Q_URL_PARAM_LIST: &str = "q-url-param-list";

/// Signature field name.
pub const Q_SIGNATURE: &str = "q-signature";

/// Field order of the rendered authorization value. Parsers may be
/// position-sensitive, so this order is part of the wire contract.
pub const FIELD_ORDER: [&str; 7] = [
    Q_SIGN_ALGORITHM,
    Q_AK,
    Q_SIGN_TIME,
    Q_KEY_TIME,
    Q_HEADER_LIST,
    Q_URL_PARAM_LIST,
    Q_SIGNATURE,
];

/// Environment variable holding the access key ID.
pub const ENV_SECRET_ID: &str = "COS_SECRET_ID";

/// Environment variable holding the secret key.
pub const ENV_SECRET_KEY: &str = "COS_SECRET_KEY";

/// Environment variable overriding the default window length (seconds).
pub const ENV_SIGN_EXPIRES: &str = "COS_SIGN_EXPIRES";

/// Environment variable holding a comma-separated header allow-list.
pub const ENV_SIGN_HEADERS: &str = "COS_SIGN_HEADERS";

/// Environment variable holding the verifier clock skew tolerance (seconds).
pub const ENV_CLOCK_SKEW: &str = "COS_CLOCK_SKEW";
