//! Streamable HTTP transport for the MCP server.
//!
//! One endpoint carries the protocol:
//!
//! - `POST /mcp`: a JSON-RPC message or batch in the body, the session id in
//!   the `Mcp-Session-Id` header. Responses come back as `application/json`
//!   with status 200; a body holding only notifications gets 202 and no body.
//! - `DELETE /mcp`: ends the session named by the header.
//!
//! Any other method on `/mcp` is answered 405 by the router. A session
//! created by `initialize` is announced in the `Mcp-Session-Id` response
//! header. A POST still running when the server is stopped is answered 503.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::mcp::server::McpServer;

/// Path of the MCP endpoint.
pub const MCP_ENDPOINT: &str = "/mcp";

/// Header carrying the session id, in both directions.
pub const SESSION_HEADER: &str = "mcp-session-id";

#[derive(Clone)]
struct AppState {
    server: Arc<McpServer>,
    cancel: CancellationToken,
}

/// Builds the axum router serving the MCP endpoint.
pub fn router(server: Arc<McpServer>) -> Router {
    cancellable_router(server, CancellationToken::new())
}

/// Like [`router`], but in-flight POSTs are answered 503 once `cancel` fires.
fn cancellable_router(server: Arc<McpServer>, cancel: CancellationToken) -> Router {
    Router::new()
        .route(MCP_ENDPOINT, post(handle_post).delete(handle_delete))
        .with_state(AppState { server, cancel })
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

async fn handle_post(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    if body.trim().is_empty() {
        tracing::debug!("Rejecting empty request body");
        return (StatusCode::BAD_REQUEST, "Empty request body").into_response();
    }

    let outcome = tokio::select! {
        outcome = state.server.process(&body, session_id(&headers)) => outcome,
        () = state.cancel.cancelled() => {
            tracing::warn!("Request cancelled by server shutdown");
            return (StatusCode::SERVICE_UNAVAILABLE, "Server shutting down").into_response();
        }
    };

    let mut response = if outcome.reply.is_empty() {
        StatusCode::ACCEPTED.into_response()
    } else {
        match serde_json::to_string(&outcome.reply) {
            Ok(json) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                json,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialise response");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    };

    if let Some(id) = outcome.new_session_id {
        match HeaderValue::from_str(&id) {
            Ok(value) => {
                response.headers_mut().insert(SESSION_HEADER, value);
            }
            Err(e) => tracing::error!(error = %e, "Session id is not a valid header value"),
        }
    }

    response
}

async fn handle_delete(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    match session_id(&headers) {
        Some(id) if state.server.sessions().remove(id) => {
            tracing::info!(session_id = %id, "Session closed by client");
            StatusCode::OK
        }
        Some(id) => {
            tracing::debug!(session_id = %id, "DELETE for unknown session");
            StatusCode::NOT_FOUND
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// A listener in the serving state.
struct Running {
    addr: SocketAddr,
    /// Stops accepting connections.
    graceful: CancellationToken,
    /// Ends in-flight requests with 503.
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// The HTTP listener hosting an [`McpServer`].
///
/// `start` binds and serves in a background task. `stop` stops accepting and
/// waits up to the shutdown timeout for in-flight requests; requests still
/// running after that are answered 503 and their connections closed, so no
/// connection outlives `stop`. Dropping a running server does the same
/// without waiting.
pub struct HttpServer {
    server: Arc<McpServer>,
    bind_addr: SocketAddr,
    shutdown_timeout: Duration,
    running: Option<Running>,
}

impl HttpServer {
    /// Creates a stopped server that will listen on `bind_addr`.
    #[must_use]
    pub fn new(server: Arc<McpServer>, bind_addr: SocketAddr) -> Self {
        Self {
            server,
            bind_addr,
            shutdown_timeout: ServerConfig::default().shutdown_timeout(),
            running: None,
        }
    }

    /// Creates a stopped server from the `server` config section.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidAddress`] if the bind address does not parse.
    pub fn from_config(server: Arc<McpServer>, config: &ServerConfig) -> Result<Self, ServerError> {
        let bind_addr = config
            .socket_addr()
            .ok_or_else(|| ServerError::InvalidAddress {
                address: config.bind_address.clone(),
            })?;
        Ok(Self::new(server, bind_addr).with_shutdown_timeout(config.shutdown_timeout()))
    }

    /// Sets how long `stop` waits for in-flight requests.
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Binds the listener and starts serving. Returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyRunning`] if the server was already
    /// started, or [`ServerError::Bind`] if the address cannot be bound.
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if let Some(running) = &self.running {
            return Err(ServerError::AlreadyRunning { addr: running.addr });
        }

        let listener = TcpListener::bind(self.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.bind_addr,
                source,
            })?;
        let addr = listener.local_addr()?;

        let graceful = CancellationToken::new();
        let cancel = CancellationToken::new();
        let app = cancellable_router(Arc::clone(&self.server), cancel.clone());
        let stop_accepting = graceful.clone();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                stop_accepting.cancelled().await;
            });
            if let Err(e) = serve.await {
                tracing::error!(error = %e, "MCP HTTP server failed");
            }
        });

        tracing::info!(%addr, endpoint = MCP_ENDPOINT, "MCP HTTP server listening");

        self.running = Some(Running {
            addr,
            graceful,
            cancel,
            task,
        });
        Ok(addr)
    }

    /// Address of the running listener.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.addr)
    }

    /// Whether the listener is serving.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Stops serving. Calling it on a stopped server does nothing.
    ///
    /// Returns within twice the shutdown timeout.
    pub async fn stop(&mut self) {
        let Some(Running {
            addr,
            graceful,
            cancel,
            mut task,
        }) = self.running.take()
        else {
            return;
        };
        let timeout_ms = u64::try_from(self.shutdown_timeout.as_millis()).unwrap_or(u64::MAX);

        graceful.cancel();
        if tokio::time::timeout(self.shutdown_timeout, &mut task)
            .await
            .is_err()
        {
            tracing::warn!(%addr, timeout_ms, "Graceful shutdown timed out, cancelling in-flight requests");
            cancel.cancel();
            if tokio::time::timeout(self.shutdown_timeout, &mut task)
                .await
                .is_err()
            {
                tracing::warn!(%addr, "Connections still open after cancellation, aborting");
                task.abort();
            }
        }

        tracing::info!(%addr, "MCP HTTP server stopped");
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.graceful.cancel();
            running.cancel.cancel();
            running.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolCallResult, ToolRegistry};
    use serde_json::{json, Map, Value};
    use tower::ServiceExt;

    struct Stall;

    impl Tool for Stall {
        fn name(&self) -> &str {
            "stall"
        }

        fn description(&self) -> &str {
            "Blocks for a while"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        fn execute(&self, _arguments: &Map<String, Value>) -> ToolCallResult {
            std::thread::sleep(Duration::from_millis(300));
            ToolCallResult::text("finished")
        }
    }

    fn loopback() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    fn mcp_server() -> Arc<McpServer> {
        Arc::new(McpServer::new(ToolRegistry::new()))
    }

    #[tokio::test]
    async fn start_reports_bound_port() {
        let mut server = HttpServer::new(mcp_server(), loopback());
        let addr = server.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.local_addr(), Some(addr));
        server.stop().await;
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn start_twice_fails() {
        let mut server = HttpServer::new(mcp_server(), loopback());
        let addr = server.start().await.unwrap();
        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ServerError::AlreadyRunning { addr: a } if a == addr));
        server.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut server = HttpServer::new(mcp_server(), loopback());
        server.stop().await;
        server.start().await.unwrap();
        server.stop().await;
        server.stop().await;
        assert_eq!(server.local_addr(), None);
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let mut first = HttpServer::new(mcp_server(), loopback());
        let addr = first.start().await.unwrap();

        let mut second = HttpServer::new(mcp_server(), addr);
        let err = second.start().await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
        assert!(!second.is_running());

        first.stop().await;
    }

    #[tokio::test]
    async fn cancelled_post_is_service_unavailable() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Stall)).unwrap();
        let server = Arc::new(McpServer::new(registry));
        let session = server
            .process(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26"}}"#,
                None,
            )
            .await
            .new_session_id
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = axum::http::Request::post(MCP_ENDPOINT)
            .header(SESSION_HEADER, session)
            .body(axum::body::Body::from(
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"stall"}}"#,
            ))
            .unwrap();
        let response = cancellable_router(server, cancel)
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn from_config_rejects_bad_address() {
        let config = ServerConfig {
            bind_address: "not-an-ip".to_string(),
            ..ServerConfig::default()
        };
        let result = HttpServer::from_config(mcp_server(), &config);
        assert!(matches!(result, Err(ServerError::InvalidAddress { .. })));
    }

    #[test]
    fn session_header_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static(" abc "));
        assert_eq!(session_id(&headers), Some("abc"));

        headers.insert(SESSION_HEADER, HeaderValue::from_static(""));
        assert_eq!(session_id(&headers), None);
    }
}
