//! HTTP/SSE transport.
//!
//! Serves four routes on the configured bind address:
//!
//! - `GET /health` - liveness probe with version and target instance
//! - `POST /mcp` - simplified tool-call envelope (`{"name": ..., ...}`)
//! - `GET /sse` - opens an SSE session and streams JSON-RPC responses
//! - `POST /messages?sessionId=...` - submits JSON-RPC messages for a session
//!
//! An SSE client first receives an `endpoint` event naming the messages
//! URL for its session, then one `message` event per JSON-RPC response.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;
use youtrack_core::{Error, Result, ServerConfig};

use crate::handlers::ToolHandler;
use crate::protocol::JsonRpcResponse;
use crate::server::McpServer;
use crate::transport::IncomingMessage;

/// Buffered responses per SSE session before backpressure kicks in.
const SESSION_CHANNEL_CAPACITY: usize = 32;

/// One SSE session: its protocol state plus the response channel.
struct SseSession {
    server: McpServer,
    tx: mpsc::Sender<JsonRpcResponse>,
}

/// Shared state for the HTTP transport.
#[derive(Clone)]
pub struct AppState {
    handler: Arc<ToolHandler>,
    config: Arc<ServerConfig>,
    sessions: Arc<Mutex<HashMap<String, SseSession>>>,
}

impl AppState {
    /// Create the shared state.
    pub fn new(handler: Arc<ToolHandler>, config: Arc<ServerConfig>) -> Self {
        Self {
            handler,
            config,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a new SSE session, returning its id and response receiver.
    async fn open_session(&self) -> (String, mpsc::Receiver<JsonRpcResponse>) {
        let session_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let server = McpServer::new(self.handler.clone(), self.config.clone());

        self.sessions
            .lock()
            .await
            .insert(session_id.clone(), SseSession { server, tx });

        (session_id, rx)
    }
}

/// Build the HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/mcp", post(mcp_handler))
        .route("/sse", get(sse_handler))
        .route("/messages", post(messages_handler))
        .with_state(state)
}

/// Bind and serve the HTTP transport until ctrl-c.
pub async fn serve(handler: Arc<ToolHandler>, config: Arc<ServerConfig>) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(
        addr = %addr,
        url = %config.display_url(),
        read_only = config.read_only,
        "Starting MCP server on HTTP/SSE"
    );

    let state = AppState::new(handler, config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Http(e.to_string()))?;

    tracing::info!("MCP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}

// ============================================================================
// /health
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub env: String,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        env: state.config.youtrack_url.clone(),
    })
}

// ============================================================================
// /mcp - simplified tool-call envelope
// ============================================================================

/// Tool-call envelope: a tool name plus its arguments, flattened.
#[derive(Debug, Deserialize)]
struct InvokeRequest {
    name: String,
    #[serde(flatten)]
    arguments: serde_json::Map<String, Value>,
}

fn error_envelope(message: impl std::fmt::Display) -> Value {
    json!({ "status": "error", "error": message.to_string() })
}

/// Dispatch a tool call from the flat `{"name": ..., ...}` envelope.
/// Failures stay in-band as `{"status": "error", ...}` bodies.
async fn mcp_handler(State(state): State<AppState>, body: String) -> Json<Value> {
    let request: InvokeRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => return Json(error_envelope(format!("Invalid request: {}", e))),
    };

    let arguments = if request.arguments.is_empty() {
        None
    } else {
        Some(Value::Object(request.arguments))
    };

    tracing::info!(tool = %request.name, "HTTP tool call");

    match state.handler.invoke(&request.name, arguments).await {
        Ok(result) => Json(json!({ "status": "success", "result": result })),
        Err(e) => Json(error_envelope(e)),
    }
}

// ============================================================================
// /sse + /messages - MCP over SSE
// ============================================================================

async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (session_id, rx) = state.open_session().await;
    tracing::info!(session = %session_id, "SSE session opened");

    let endpoint = format!("/messages?sessionId={}", session_id);
    let hello = tokio_stream::once(Ok::<Event, Infallible>(
        Event::default().event("endpoint").data(endpoint),
    ));

    let responses = ReceiverStream::new(rx).map(|resp| {
        let data = serde_json::to_string(&resp).unwrap_or_default();
        Ok::<Event, Infallible>(Event::default().event("message").data(data))
    });

    Sse::new(hello.chain(responses)).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagesQuery {
    session_id: String,
}

/// Accept a JSON-RPC message for a session and push the response down its
/// SSE stream. A dead stream drops the session.
async fn messages_handler(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
    body: String,
) -> StatusCode {
    let Some(msg) = IncomingMessage::parse(body.trim()) else {
        tracing::warn!(session = %query.session_id, "Invalid JSON-RPC message");
        return StatusCode::BAD_REQUEST;
    };

    let mut sessions = state.sessions.lock().await;
    let Some(session) = sessions.get_mut(&query.session_id) else {
        return StatusCode::NOT_FOUND;
    };

    if let Some(resp) = session.server.handle_message(msg).await {
        if session.tx.send(resp).await.is_err() {
            tracing::info!(session = %query.session_id, "SSE stream closed, dropping session");
            sessions.remove(&query.session_id);
            return StatusCode::NOT_FOUND;
        }
    }

    StatusCode::ACCEPTED
}
