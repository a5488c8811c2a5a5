//! Serve a directory of files under a URL prefix.
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use serve_static::{Router, Server, StaticOptions};
//!
//! # async fn run() -> Result<(), serve_static::Error> {
//! let app = serve_static::register(
//!     Router::new(),
//!     StaticOptions::new("/var/www").prefix("/assets"),
//! )?;
//! Server::bind(SocketAddr::from(([0, 0, 0, 0], 3000))).serve(app).await
//! # }
//! ```
//!
//! # Routes
//!
//! For a prefix `P` with one trailing `/` stripped to `B`, `GET` and `HEAD`
//! are registered on:
//!
//! | Pattern | Remainder |
//! |---|---|
//! | `B/{*path}` | the captured tail |
//! | `B/` | empty |
//! | `B` (only when `P` has no trailing `/`) | empty |
//!
//! An empty remainder resolves as `/`, so `/assets`, `/assets/` and
//! `/assets/index.html` all serve the same index file.
//!
//! # Per request
//!
//! The remainder is handed to a [`FileSender`] with the frozen
//! [`SendOptions`](crate::SendOptions). Directories without a usable index are
//! reported as 404; nothing is ever listed. Sender errors go to the router's
//! error pipeline as they are.

use std::sync::Arc;

use http::Method;
use http::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::error::{Error, HttpError};
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::options::{SetHeaders, StaticConfig, StaticOptions};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Router;
use crate::send::{DiskSender, FileSender, SendOutcome, SentFile};

/// Name of the catch-all parameter holding the path below the prefix.
pub const WILDCARD: &str = "path";

/// Validates options and registers the routes with the default sender.
pub fn register(router: Router, options: StaticOptions) -> Result<Router, Error> {
    ServeStatic::new(options).register(router)
}

/// The static file plugin, before registration.
pub struct ServeStatic {
    options: StaticOptions,
    sender: Arc<dyn FileSender>,
}

impl ServeStatic {
    pub fn new(options: StaticOptions) -> Self {
        Self::with_sender(options, DiskSender)
    }

    /// Uses `sender` instead of [`DiskSender`] to resolve and stream files.
    pub fn with_sender(options: StaticOptions, sender: impl FileSender) -> Self {
        Self { options, sender: Arc::new(sender) }
    }

    /// Validates the options, then wires the routes.
    ///
    /// Fails with [`Error::Config`] before touching the router if the options
    /// are invalid, and with [`Error::Route`] if a pattern collides with an
    /// existing route.
    pub fn register(self, mut router: Router) -> Result<Router, Error> {
        let config = self.options.validate()?;
        let patterns = route_patterns(&config.prefix);

        debug!(
            root = %config.send.root.display(),
            prefix = config.prefix.as_str(),
            routes = ?patterns,
            "registering static file routes"
        );

        let handler: BoxedHandler = Arc::new(StaticHandler {
            config: Arc::new(config),
            sender: self.sender,
        });

        for pattern in &patterns {
            for method in [Method::GET, Method::HEAD] {
                router = router.route(method, pattern, Arc::clone(&handler))?;
            }
        }
        Ok(router)
    }
}

fn route_patterns(prefix: &str) -> Vec<String> {
    let base = prefix.strip_suffix('/').unwrap_or(prefix);
    let mut patterns = vec![format!("{base}/{{*{WILDCARD}}}"), format!("{base}/")];
    if !prefix.ends_with('/') {
        patterns.push(base.to_owned());
    }
    patterns
}

/// The registered route handler. Owns the frozen configuration; holds no
/// per-request state.
struct StaticHandler {
    config: Arc<StaticConfig>,
    sender: Arc<dyn FileSender>,
}

impl ErasedHandler for StaticHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let config = Arc::clone(&self.config);
        let sender = Arc::clone(&self.sender);
        Box::pin(async move { serve(&config, sender.as_ref(), req).await.into_response() })
    }
}

async fn serve(
    config: &StaticConfig,
    sender: &dyn FileSender,
    req: Request,
) -> Result<Response, HttpError> {
    let pathname = format!("/{}", req.param(WILDCARD).unwrap_or_default());
    debug!(pathname = pathname.as_str(), "serving static file");

    let outcome = sender
        .send(req.head(), &pathname, &config.send)
        .await
        .inspect_err(|e| warn!(pathname = pathname.as_str(), "file sender failed: {e}"))?;

    match outcome {
        SendOutcome::Resolved(file) => Ok(respond(file, config.set_headers.as_ref())),
        SendOutcome::Directory | SendOutcome::NotFound => {
            Err(HttpError::not_found(format!("Not Found: {}", req.path())))
        }
        SendOutcome::Forbidden(reason) => {
            debug!(pathname = pathname.as_str(), reason = reason.as_str(), "refusing to serve");
            Err(HttpError::forbidden())
        }
        SendOutcome::BadRequest(reason) => Err(HttpError::bad_request(reason)),
    }
}

/// The framework's streaming default content type is dropped so the sender's
/// (or the hook's) choice is the one that goes out. The hook runs last.
fn respond(file: SentFile, set_headers: Option<&SetHeaders>) -> Response {
    let SentFile { path, metadata, status, headers, body } = file;

    let mut response = Response::stream(body);
    response.set_status(status);

    let response_headers = response.headers_mut();
    response_headers.remove(CONTENT_TYPE);
    response_headers.extend(headers);

    if let Some(set_headers) = set_headers {
        set_headers(response_headers, &path, &metadata);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn root_prefix_routes() {
        assert_eq!(route_patterns("/"), ["/{*path}", "/"]);
    }

    #[test]
    fn bare_prefix_also_matches_itself() {
        assert_eq!(route_patterns("/prefix"), ["/prefix/{*path}", "/prefix/", "/prefix"]);
    }

    #[test]
    fn trailing_slash_prefix_does_not_match_bare() {
        assert_eq!(route_patterns("/prefix/"), ["/prefix/{*path}", "/prefix/"]);
    }

    #[test]
    fn invalid_options_fail_registration() {
        let result = register(Router::new(), StaticOptions::new("relative"));
        assert!(matches!(result, Err(Error::Config(ConfigError::RootNotAbsolute))));

        let result = register(Router::new(), StaticOptions::new("/srv").prefix("v1"));
        assert!(matches!(result, Err(Error::Config(ConfigError::PrefixMissingSlash))));
    }

    #[test]
    fn registering_the_same_prefix_twice_collides() {
        let router = register(Router::new(), StaticOptions::new("/srv")).unwrap();
        let result = register(router, StaticOptions::new("/other"));
        assert!(matches!(result, Err(Error::Route { .. })));
    }

    #[test]
    fn prefixes_coexist() {
        let router = register(Router::new(), StaticOptions::new("/srv").prefix("/a")).unwrap();
        assert!(register(router, StaticOptions::new("/srv").prefix("/b/")).is_ok());
    }
}
