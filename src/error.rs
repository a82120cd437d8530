//! Error taxonomy for the dispatch core.
//!
//! Everything a middleware, handler or the orchestrator itself can fail with is an
//! [`Error`]. Handler code usually just uses `?`: `anyhow::Error`, `std::io::Error`
//! and `serde_json::Error` all convert.

use std::time::Duration;

use http::StatusCode;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced while compiling routes or running a request chain.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A path pattern could not be compiled. Raised at registration, never per request.
    #[error("invalid route pattern '{pattern}': {reason}")]
    RouteCompilation { pattern: String, reason: String },

    /// No registered route accepts the method/path pair.
    #[error("no route matches {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// A middleware invoked `next` a second time within one invocation.
    #[error("next() called more than once by the middleware at chain position {position}")]
    NextCalledTwice { position: usize },

    /// The timeout guard expired before the chain completed.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A file argument resolved outside of its base directory.
    #[error("path '{path}' escapes the configured base directory")]
    PathTraversal { path: String },

    /// A file helper was called but no base directory is configured for it.
    #[error("no {0} directory configured")]
    RootNotConfigured(&'static str),

    /// A body sender was invoked after the response had already been written.
    #[error("response already sent")]
    ResponseAlreadySent,

    /// A header name or value could not be encoded.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A middleware or handler panicked.
    #[error("handler panicked: {0}")]
    Panic(String),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure raised by user code.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl Error {
    /// HTTP status the orchestrator uses when this error reaches it with no response written.
    ///
    /// Only a timeout and a missing route get their own status; every other failure,
    /// rejected file paths included, is a plain 500.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Error::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn compilation(pattern: &str, reason: impl Into<String>) -> Self {
        Error::RouteCompilation {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}
