//! Development servers for frontforge.
//!
//! Serves a variant's distribution folder over HTTP, and runs the
//! live-reload server that browsers connect to while watching.

pub mod error;
pub mod livereload;
pub mod server;
pub mod static_files;

pub use error::ApiError;
pub use livereload::LiveReloadHub;
pub use server::{ServerHandle, serve_live_reload, serve_variant, spawn_server};
