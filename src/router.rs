//! Radix-tree request router and error pipeline.
//!
//! One tree per HTTP method. O(path-length) lookup. A handler either produces
//! a response or an [`HttpError`]; errors are rendered in exactly one place,
//! [`Router::handle`], by the default renderer or by the handler installed
//! with [`Router::on_error`].

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Uri};
use matchit::Router as MatchitRouter;
use serde_json::json;
use tracing::debug;

use crate::error::{Error, HttpError};
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

type ErrorHandler = Arc<dyn Fn(&HttpError, &Uri) -> Response + Send + Sync + 'static>;

/// The application router.
///
/// Build it once at startup, pass it to [`Server::serve`](crate::Server::serve).
/// Registration methods return `self` so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    error_handler: Option<ErrorHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), error_handler: None }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax, catch-alls `{*name}`:
    ///
    /// ```rust
    /// # use http::Method;
    /// # use serve_static::{Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn asset(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET, "/users/{id}", get_user)
    ///     .on(Method::GET, "/assets/{*path}", asset);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with an existing one.
    /// Routes are static application structure; use a plugin's fallible
    /// registration for anything derived from configuration.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.route(method, path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Shorthand for `on(Method::GET, ..)`.
    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    /// Replace the default error renderer.
    ///
    /// The returned response is sent with the error's status code, whatever
    /// status the handler itself chose.
    pub fn on_error<F, R>(mut self, handler: F) -> Self
    where
        F: Fn(&HttpError, &Uri) -> R + Send + Sync + 'static,
        R: IntoResponse,
    {
        self.error_handler = Some(Arc::new(move |err: &HttpError, uri: &Uri| {
            handler(err, uri).into_response()
        }));
        self
    }

    pub(crate) fn route(
        mut self,
        method: Method,
        path: &str,
        handler: BoxedHandler,
    ) -> Result<Self, Error> {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler)
            .map_err(|source| Error::Route { path: path.to_owned(), source })?;
        Ok(self)
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Routes one request and produces one response, errors rendered.
    ///
    /// This is the whole request path minus the network: the server calls it
    /// once per request, tests can call it directly.
    pub async fn handle(&self, req: http::Request<Bytes>) -> Response {
        let (head, body) = req.into_parts();
        let uri = head.uri.clone();

        let mut response = match self.lookup(&head.method, uri.path()) {
            Some((handler, params)) => handler.call(Request::new(head, body, params)).await,
            None => {
                debug!(method = %head.method, path = uri.path(), "no route matched");
                let message = format!("Route {} {} not found", head.method, uri.path());
                Response::from_error(HttpError::not_found(message))
            }
        };

        match response.take_error() {
            Some(err) => self.render_error(&err, &uri),
            None => response,
        }
    }

    fn render_error(&self, err: &HttpError, uri: &Uri) -> Response {
        debug!(status = err.status().as_u16(), error = %err, path = uri.path(), "request failed");
        let mut response = match &self.error_handler {
            Some(handler) => handler(err, uri),
            None => default_error_response(err),
        };
        response.set_status(err.status());
        response
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// `{"statusCode": 404, "error": "Not Found", "message": "..."}`
fn default_error_response(err: &HttpError) -> Response {
    let status = err.status();
    let body = json!({
        "statusCode": status.as_u16(),
        "error": status.canonical_reason().unwrap_or(""),
        "message": err.message(),
    });
    Response::json(body.to_string().into_bytes())
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http::header::CONTENT_TYPE;

    use super::*;

    fn get(path: &str) -> http::Request<Bytes> {
        http::Request::get(path).body(Bytes::new()).unwrap()
    }

    async fn echo_id(req: Request) -> String {
        req.param("id").unwrap_or("none").to_owned()
    }

    async fn deny(_req: Request) -> Result<Response, HttpError> {
        Err(HttpError::forbidden())
    }

    #[tokio::test]
    async fn captures_path_params() {
        let router = Router::new().get("/users/{id}", echo_id);
        let body = router.handle(get("/users/42")).await.into_bytes().await.unwrap();
        assert_eq!(&body[..], b"42");
    }

    #[tokio::test]
    async fn unmatched_route_renders_json_404() {
        let response = Router::new().handle(get("/missing")).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let body = response.into_bytes().await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["statusCode"], 404);
        assert_eq!(value["error"], "Not Found");
    }

    #[tokio::test]
    async fn custom_error_handler_keeps_status() {
        let router = Router::new()
            .get("/secret", deny)
            .on_error(|err: &HttpError, uri: &Uri| format!("{} at {}", err, uri.path()));

        let response = router.handle(get("/secret")).await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
        let body = response.into_bytes().await.unwrap();
        assert_eq!(&body[..], b"Forbidden at /secret");
    }

    #[test]
    fn conflicting_route_is_an_error() {
        let handler = echo_id.into_boxed_handler();
        let router = Router::new().route(Method::GET, "/a", Arc::clone(&handler)).unwrap();
        assert!(matches!(
            router.route(Method::GET, "/a", handler),
            Err(Error::Route { .. })
        ));
    }
}
