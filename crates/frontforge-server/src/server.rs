//! Spawning the HTTP servers.

use crate::livereload::{self, LiveReloadHub};
use crate::static_files;
use axum::Router;
use frontforge_core::{Error, Result, Variant};
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// A running server.
pub struct ServerHandle {
    pub addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Bind `port` on all interfaces and serve `app` in a background task.
pub async fn spawn_server(name: &'static str, port: u16, app: Router) -> Result<ServerHandle> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Server(format!("failed to bind {} server on {}: {}", name, addr, e)))?;
    let addr = listener.local_addr()?;

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(server = name, error = %e, "Server stopped");
        }
    });

    Ok(ServerHandle { addr, task })
}

/// Serve a variant's distribution folder.
pub async fn serve_variant(variant: &Variant, root: &Path, port: u16) -> Result<ServerHandle> {
    let app = static_files::router(root).layer(TraceLayer::new_for_http());
    let handle = spawn_server("static", port, app).await?;
    info!(
        root = %root.display(),
        "Variant {} listening on http://localhost:{}",
        variant,
        handle.port()
    );
    Ok(handle)
}

/// Run the live-reload server for `hub`.
pub async fn serve_live_reload(hub: LiveReloadHub, port: u16) -> Result<ServerHandle> {
    let app = livereload::router(hub)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    let handle = spawn_server("live-reload", port, app).await?;
    info!("Live reload listening on port {}", handle.port());
    Ok(handle)
}
