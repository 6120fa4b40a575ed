//! Error types for dialtone-client.
//!
//! Two layers: [`RemoteError`] describes a syntactically-successful response
//! whose embedded status reports failure, [`BackendError`] is the error type
//! returned from every `Client` method.

use std::{fmt, io};

// ─── RemoteError ──────────────────────────────────────────────────────────────

/// An error reported inside a decoded service response (`ok == false`).
///
/// The service's numeric codes are undocumented; the raw decoded response is
/// kept verbatim for diagnostics. Code `20` is empirically ambiguous and most
/// often means the configured callback number is missing or invalid, so it
/// carries an actionable hint.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteError {
    /// Service-defined numeric code, when one was present in the response.
    pub code: Option<i64>,
    /// Human-actionable hint for recognized codes.
    pub hint: Option<String>,
    /// The raw decoded response body.
    pub raw: String,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(c) => write!(f, "service error {c}")?,
            None => write!(f, "service error")?,
        }
        if let Some(hint) = &self.hint {
            write!(f, ": {hint}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {}

impl RemoteError {
    /// Returns `true` if the service reported the given numeric code.
    pub fn is_code(&self, code: i64) -> bool {
        self.code == Some(code)
    }
}

// ─── NetworkError ─────────────────────────────────────────────────────────────

/// Transport-level failure. Already retried internally up to the configured
/// bound before being surfaced, so an immediate caller-side retry is unlikely
/// to help.
#[derive(Debug)]
pub enum NetworkError {
    /// HTTP request failed (connect, TLS, read, non-success status).
    Http(reqwest::Error),
    /// Local I/O failure (cookie jar file).
    Io(io::Error),
    /// Declared Content-Length did not match the bytes actually read.
    /// Integrity failure — never retried.
    Truncated { expected: u64, got: u64 },
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Truncated { expected, got } => {
                write!(f, "truncated response: declared {expected} bytes, read {got}")
            }
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Truncated { .. } => None,
        }
    }
}

// ─── BackendError ─────────────────────────────────────────────────────────────

/// The error type returned from any `Client` method that talks to the service.
///
/// Authentication failures are a distinct variant from network failures so a
/// caller can re-prompt for credentials instead of blindly retrying.
#[derive(Debug)]
pub enum BackendError {
    /// Transport failed after exhausting the retry policy.
    Network(NetworkError),
    /// Login rejected, or token/account extraction failed on a page that
    /// should have carried them.
    Authentication(String),
    /// Malformed caller input, detected before any network call.
    Validation(String),
    /// The service answered but its embedded status reports failure.
    Remote(RemoteError),
    /// The response envelope did not have the expected two-child shape —
    /// the wire format changed out from under us.
    Envelope(String),
    /// The JSON and HTML halves of an envelope describe different message
    /// sets; `id` was present in the HTML but missing from the JSON.
    OutOfSync { id: String },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(e) => write!(f, "{e}"),
            Self::Authentication(s) => write!(f, "authentication failed: {s}"),
            Self::Validation(s) => write!(f, "invalid input: {s}"),
            Self::Remote(e) => write!(f, "{e}"),
            Self::Envelope(s) => write!(f, "malformed response envelope: {s}"),
            Self::OutOfSync { id } => {
                write!(f, "response halves out of sync: id {id:?} missing from status JSON")
            }
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Network(e) => Some(e),
            Self::Remote(e) => Some(e),
            _ => None,
        }
    }
}

impl From<NetworkError> for BackendError {
    fn from(e: NetworkError) -> Self {
        Self::Network(e)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(NetworkError::Http(e))
    }
}

impl From<io::Error> for BackendError {
    fn from(e: io::Error) -> Self {
        Self::Network(NetworkError::Io(e))
    }
}

impl From<RemoteError> for BackendError {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e)
    }
}

impl BackendError {
    /// Returns `true` for failures that indicate the session is no longer
    /// valid (as opposed to connectivity problems).
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}
