//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Build a [`Response`] in your handler and return it, or return a
//! `Result<_, HttpError>` and let the router's error pipeline render the
//! failure.

use std::convert::Infallible;
use std::io;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use http::StatusCode;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};

use crate::error::HttpError;

/// The body type every response is erased to: a stream of [`Bytes`] frames
/// that may fail with an I/O error (files are read while being sent).
pub type Body = UnsyncBoxBody<Bytes, io::Error>;

/// Wraps an in-memory buffer as a [`Body`].
pub fn full(bytes: impl Into<Bytes>) -> Body {
    Full::new(bytes.into())
        .map_err(|never: Infallible| match never {})
        .boxed_unsync()
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use http::StatusCode;
/// use serve_static::Response;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Body,
    pub(crate) error: Option<HttpError>,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::with_type("application/json", full(body))
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_type("text/plain; charset=utf-8", full(body.into()))
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, headers: HeaderMap::new(), body: full(Bytes::new()), error: None }
    }

    /// `200 OK` with a streamed body.
    ///
    /// Without better knowledge the content type defaults to
    /// `application/octet-stream`; whoever produced the stream is expected to
    /// replace it.
    pub fn stream(body: Body) -> Self {
        Self::with_type("application/octet-stream", body)
    }

    /// A failed response. The router's error pipeline renders it.
    pub fn from_error(err: HttpError) -> Self {
        let mut response = Self::status(err.status());
        response.error = Some(err);
        response
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    /// The error this response was built from, if it has not been rendered yet.
    pub fn error(&self) -> Option<&HttpError> { self.error.as_ref() }

    pub(crate) fn take_error(&mut self) -> Option<HttpError> { self.error.take() }

    pub(crate) fn set_status(&mut self, status: StatusCode) { self.status = status; }

    /// Converts into an [`http::Response`], ready for hyper.
    pub fn into_inner(self) -> http::Response<Body> {
        let mut inner = http::Response::new(self.body);
        *inner.status_mut() = self.status;
        *inner.headers_mut() = self.headers;
        inner
    }

    /// Reads the whole body into memory.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        Ok(self.body.collect().await?.to_bytes())
    }

    fn with_type(content_type: &'static str, body: Body) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self { status: StatusCode::OK, headers, body, error: None }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return StatusCode::NO_CONTENT`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response { Response::from_error(self) }
}

/// `Err` values are handed to the error pipeline untouched.
impl<T, E> IntoResponse for Result<T, E>
where
    T: IntoResponse,
    E: Into<HttpError>,
{
    fn into_response(self) -> Response {
        match self {
            Ok(value) => value.into_response(),
            Err(e) => Response::from_error(e.into()),
        }
    }
}
