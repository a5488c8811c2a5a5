//! Serve a directory over HTTP.
//!
//! Options come from `static.toml` (optional) and `STATIC_*` environment
//! variables, using the same keys as `StaticOptions::from_value`:
//!
//! ```toml
//! root = "/var/www"
//! prefix = "/assets"
//! max_age = 3600000
//! extensions = ["html"]
//! ```
//!
//! Run with:
//!   STATIC_ROOT=$PWD/tests/static RUST_LOG=debug cargo run --example static_site
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i http://localhost:3000/nested/
//!   curl -i http://localhost:3000/nested        # 404, no redirect
//!   curl -i --path-as-is http://localhost:3000/../Cargo.toml   # 403

use std::net::SocketAddr;

use http::HeaderValue;
use serve_static::{Router, Server, StaticOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let settings: serde_json::Value = config::Config::builder()
        .add_source(config::File::with_name("static").required(false))
        .add_source(config::Environment::with_prefix("STATIC").try_parsing(true))
        .build()?
        .try_deserialize()?;

    let options = StaticOptions::from_value(settings)?
        .set_headers(|headers, _path, _metadata| {
            headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
        });

    let app = serve_static::register(Router::new(), options)?;

    Server::bind(SocketAddr::from(([0, 0, 0, 0], 3000))).serve(app).await?;
    Ok(())
}
