//! # serve-static
//!
//! Serve a directory of static files from a minimal hyper-based router.
//!
//! The crate has two halves:
//!
//! - a small HTTP framework: radix-tree [`Router`] via [`matchit`], async
//!   handlers, an error pipeline, and a [`Server`] with graceful shutdown;
//! - the [`serve_static`](middleware::serve_static) plugin, which validates
//!   its [`StaticOptions`], registers routes under a prefix, and hands every
//!   request to a [`FileSender`].
//!
//! Finding files, MIME types, ranges, `ETag`/`If-Modified-Since` and streaming
//! are the sender's job. The default, [`DiskSender`], delegates them to
//! `hyper-staticfile`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use http::HeaderValue;
//! use serve_static::{Request, Router, Server, StaticOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), serve_static::Error> {
//!     let app = Router::new().get("/healthz", healthz);
//!
//!     let app = serve_static::register(
//!         app,
//!         StaticOptions::new("/var/www")
//!             .prefix("/assets")
//!             .set_headers(|headers, _path, _metadata| {
//!                 headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
//!             }),
//!     )?;
//!
//!     Server::bind(SocketAddr::from(([0, 0, 0, 0], 3000))).serve(app).await
//! }
//!
//! async fn healthz(_req: Request) -> &'static str {
//!     "ok"
//! }
//! ```

mod error;
mod handler;
mod options;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;
pub mod send;

pub use error::{ConfigError, Error, HttpError};
pub use handler::Handler;
pub use middleware::serve_static::{ServeStatic, register};
pub use options::{Dotfiles, SendOptions, SetHeaders, StaticOptions};
pub use request::Request;
pub use response::{Body, IntoResponse, Response, full};
pub use router::Router;
pub use send::{DiskSender, FileSender, SendOutcome, SentFile};
pub use server::Server;
