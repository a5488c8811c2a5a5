//! Plugins that wire themselves into a [`Router`](crate::Router).
//!
//! - [`serve_static`]: serves a directory of files under a URL prefix.

pub mod serve_static;
