//! Errors produced by the test-planning engine.

use std::fmt::Debug;

/// Errors surfaced by the engine.
///
/// Every fallible operation in this crate returns one of these four domain
/// variants, plus a handful of `#[from(skip)]`-guarded conversions from the
/// underlying libraries used to build and send requests.
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum MeqaError {
    /// The schema or plan is internally inconsistent: unknown schema types,
    /// conflicting numeric bounds, an unsupported string `format`, or an
    /// `expect.status` value that isn't `"fail"` or an integer.
    #[display("invalid schema or plan: {message}")]
    #[from(skip)]
    Invalid {
        /// Description of what was inconsistent.
        message: String,
    },

    /// A referenced path, operation, or class is absent from the document.
    #[display("not found: {message}")]
    #[from(skip)]
    NotFound {
        /// Description of what could not be located.
        message: String,
    },

    /// Transport failure, or a post-response mismatch against the shadow
    /// store during reconciliation.
    #[display("http error: {message}")]
    #[from(skip)]
    Http {
        /// Description of the transport failure or mismatch.
        message: String,
    },

    /// The response body was malformed JSON, or failed schema validation.
    #[display("server response error: {message}")]
    #[from(skip)]
    ServerResp {
        /// Description of why the response was rejected.
        message: String,
    },

    /// JSON (de)serialization failure from the underlying `serde_json` crate.
    Json(serde_json::Error),

    /// URL construction failure from the underlying `url` crate.
    Url(url::ParseError),

    /// HTTP transport failure from the underlying `reqwest` crate.
    #[cfg(feature = "http-transport")]
    Reqwest(reqwest::Error),
}

impl MeqaError {
    /// Shorthand for [`MeqaError::Invalid`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Shorthand for [`MeqaError::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Shorthand for [`MeqaError::Http`].
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Shorthand for [`MeqaError::ServerResp`].
    pub fn server_resp(message: impl Into<String>) -> Self {
        Self::ServerResp {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MeqaError>;
