//! Live-reload server.
//!
//! Speaks the LiveReload protocol (official-7) over `/livereload`, serves
//! the client script at `/livereload.js`, and accepts external change
//! notifications on `/changed?files=a,b`.

use crate::error::ApiError;
use axum::Json;
use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use frontforge_core::LiveReload;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub const PROTOCOL: &str = "http://livereload.com/protocols/official-7";
const SERVER_NAME: &str = "frontforge";
const CLIENT_SCRIPT: &str = include_str!("livereload.js");

/// Fans change notifications out to every connected browser.
#[derive(Clone)]
pub struct LiveReloadHub {
    tx: broadcast::Sender<String>,
}

impl Default for LiveReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Number of connected clients.
    pub fn clients(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl LiveReload for LiveReloadHub {
    fn notify(&self, paths: &[String]) {
        for path in paths {
            // No receivers just means no browser is connected.
            let _ = self.tx.send(path.clone());
        }
        debug!(count = paths.len(), clients = self.clients(), "Live reload notified");
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
enum ClientCommand {
    Hello {
        #[serde(default)]
        protocols: Vec<String>,
    },
    Info {},
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "command", rename_all = "lowercase")]
enum ServerMessage {
    Hello {
        protocols: Vec<String>,
        #[serde(rename = "serverName")]
        server_name: String,
    },
    Reload {
        path: String,
        #[serde(rename = "liveCSS")]
        live_css: bool,
    },
}

impl ServerMessage {
    fn hello() -> Self {
        ServerMessage::Hello {
            protocols: vec![PROTOCOL.to_string()],
            server_name: SERVER_NAME.to_string(),
        }
    }

    fn reload(path: String) -> Self {
        ServerMessage::Reload {
            path,
            live_css: true,
        }
    }
}

/// The reply to a client frame, if any.
fn reply_to(text: &str) -> Option<ServerMessage> {
    match serde_json::from_str::<ClientCommand>(text) {
        Ok(ClientCommand::Hello { protocols }) => {
            debug!(?protocols, "Live reload client hello");
            Some(ServerMessage::hello())
        }
        Ok(ClientCommand::Info {}) => None,
        Err(e) => {
            debug!(error = %e, "Ignoring live reload frame");
            None
        }
    }
}

/// Build the live-reload router.
pub fn router(hub: LiveReloadHub) -> Router {
    Router::new()
        .route("/livereload", get(ws_handler))
        .route("/livereload.js", get(client_script))
        .route("/changed", get(changed).post(changed))
        .with_state(hub)
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<LiveReloadHub>) -> Response {
    let updates = hub.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, updates))
}

async fn send(sender: &mut futures::stream::SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(_) => true,
    }
}

async fn handle_socket(socket: WebSocket, mut updates: broadcast::Receiver<String>) {
    info!("Live reload client connected");
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = reply_to(&text) {
                        if !send(&mut sender, &reply).await {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!(error = %e, "Live reload socket error");
                    break;
                }
                Some(Ok(_)) => {}
            },
            update = updates.recv() => match update {
                Ok(path) => {
                    if !send(&mut sender, &ServerMessage::reload(path)).await {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Live reload client lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    info!("Live reload client disconnected");
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}

#[derive(Debug, Deserialize)]
struct ChangedQuery {
    files: Option<String>,
}

async fn changed(
    State(hub): State<LiveReloadHub>,
    Query(query): Query<ChangedQuery>,
) -> Result<Json<Value>, ApiError> {
    let files: Vec<String> = query
        .files
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect();
    if files.is_empty() {
        return Err(ApiError::BadRequest("no files given".to_string()));
    }

    hub.notify(&files);
    Ok(Json(json!({ "clients": hub.clients(), "files": files })))
}
