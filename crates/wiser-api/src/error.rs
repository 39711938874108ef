use thiserror::Error;

use crate::validate::ValidationError;

/// Top-level error type for the `wiser-api` crate.
///
/// Covers every failure mode of the hub's domain API: transport,
/// response decoding, schema validation, and registry misuse.
/// `wiser-core` maps these into its own user-facing taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The hub answered with a non-success status code.
    #[error("Hub responded with HTTP {status}")]
    Status { status: u16, body: String },

    /// A header value could not be encoded (e.g. a secret with control characters).
    #[error("Invalid header value for {name}")]
    InvalidHeader { name: &'static str },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body was not valid JSON, with the raw body for debugging.
    #[error("Parse error: {message}")]
    Parse { message: String, body: String },

    /// JSON was well-formed but did not match the expected shape.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ── Registry ────────────────────────────────────────────────────
    /// No family is registered under this tag.
    #[error("Unknown device family: {0}")]
    UnknownFamily(String),

    /// A family with this tag was already registered.
    #[error("Device family already registered: {0}")]
    DuplicateFamily(&'static str),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the offending field name for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation(v) => Some(v.field()),
            _ => None,
        }
    }
}
