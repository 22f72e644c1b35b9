//! HTTP and WebSocket API in front of the agents.
//!
//! Every answer carries the list of downloadable source files so a client can
//! link to the reports the agents read.

use crate::agent::Agent;
use crate::config::{Settings, SourceFile};
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Request, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeFile;
use tracing::{debug, info, warn};

/// Sent after each WebSocket answer.
pub const END_MARKER: &str = "[END]";

const FILE_NOT_FOUND: &str = "File not found";

/// Shared application state.
pub struct AppState {
    /// Agent over the environmental (location) documents.
    pub location_agent: Arc<Agent>,
    /// Outer agent routing between all document agents.
    pub router_agent: Arc<Agent>,
    /// Source files returned with every answer.
    pub files: Vec<SourceFile>,
    /// Directory served by `/download/{filename}`.
    pub download_dir: PathBuf,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/query_location", post(query_location))
        .route("/query_agent", post(query_agent))
        .route("/download/{filename}", get(download))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

/// Source files to advertise: configured sources, or the files found in the
/// download directory sorted by name.
pub fn source_files(settings: &Settings) -> Vec<SourceFile> {
    if !settings.server.sources.is_empty() {
        return settings.server.sources.clone();
    }

    let dir = settings.download_dir();
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list download directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();

    names
        .into_iter()
        .map(|name| SourceFile {
            link: name.clone(),
            name,
        })
        .collect()
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub content: String,
    pub files: Vec<SourceFile>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn answer(state: &AppState, agent: &Agent, query: &str) -> Response {
    match agent.query(query).await {
        Ok(response) => Json(QueryResponse {
            content: response.content,
            files: state.files.clone(),
        })
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

async fn query_location(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Response {
    answer(&state, &state.location_agent, &req.query).await
}

async fn query_agent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Response {
    answer(&state, &state.router_agent, &req.query).await
}

async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    request: Request,
) -> Response {
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return error_response(StatusCode::NOT_FOUND, FILE_NOT_FOUND);
    }

    let path = state.download_dir.join(&filename);
    if !path.is_file() {
        return error_response(StatusCode::NOT_FOUND, FILE_NOT_FOUND);
    }

    let mut response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.map(Body::new).into_response(),
        Err(never) => match never {},
    };

    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket client connected");
    let (sender, receiver) = socket.split();
    relay(receiver, sender, &state.location_agent).await;
    debug!("WebSocket client disconnected");
}

/// Answer each text message with the agent, followed by the end marker.
///
/// Runs until the client closes, the stream ends, or a send fails.
async fn relay<R, W, E>(mut receiver: R, mut sender: W, agent: &Agent)
where
    R: Stream<Item = std::result::Result<Message, E>> + Unpin,
    W: Sink<Message> + Unpin,
{
    while let Some(message) = receiver.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text.as_str().to_string(),
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let reply = respond(agent, &text).await;
        if sender.send(Message::Text(reply.into())).await.is_err() {
            break;
        }
        if sender.send(Message::Text(END_MARKER.into())).await.is_err() {
            break;
        }
    }
}

async fn respond(agent: &Agent, text: &str) -> String {
    match agent.query(text).await {
        Ok(response) => response.content,
        Err(e) => format!("Error: {}", e),
    }
}
