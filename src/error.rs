//! Error types.
//!
//! Three layers:
//!
//! - [`ConfigError`]: a plugin was given options it cannot work with. Raised
//!   synchronously at registration, before a single route is wired.
//! - [`Error`]: everything fallible outside a request: configuration,
//!   route insertion, binding a socket.
//! - [`HttpError`]: a request failed. Handlers return it; the router's error
//!   pipeline turns it into a response.

use std::io;

use http::StatusCode;
use thiserror::Error;

/// The error type returned by the crate's fallible setup operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid route `{path}`: {source}")]
    Route {
        path: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("io: {0}")]
    Io(#[from] io::Error),
}

/// Invalid plugin options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the `root` option is required")]
    RootRequired,

    #[error("the `root` option must be a string")]
    RootNotString,

    #[error("the `root` option must be an absolute path")]
    RootNotAbsolute,

    #[error("the `prefix` option must be a string")]
    PrefixNotString,

    #[error("the `prefix` option must start with a '/' character")]
    PrefixMissingSlash,

    #[error("the `setHeaders` option must be a function")]
    SetHeadersNotCallable,

    #[error("options must be an object")]
    NotAnObject,

    #[error("malformed options: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// A request-time failure, routed through the error pipeline.
///
/// Carries the status to respond with, a human-readable message and, when the
/// failure came from the filesystem, the underlying [`io::Error`] unchanged.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    message: String,
    #[source]
    source: Option<io::Error>,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), source: None }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> &str { &self.message }

    /// The I/O error this failure was raised from, if any.
    pub fn io_error(&self) -> Option<&io::Error> { self.source.as_ref() }
}

impl From<io::Error> for HttpError {
    fn from(e: io::Error) -> Self {
        let status = match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, message: e.to_string(), source: Some(e) }
    }
}
