//! Static file serving for a built variant.

use axum::Router;
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};

/// Serve `root`, answering unknown paths with `root/index.html` so client
/// side routes resolve.
pub fn router(root: &Path) -> Router {
    let index = ServeFile::new(root.join("index.html"));
    Router::new().fallback_service(ServeDir::new(root).fallback(index))
}
