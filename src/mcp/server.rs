//! MCP server: JSON-RPC dispatch for the Unreal Editor tool set.
//!
//! This module implements the MCP server lifecycle on top of a session map:
//!
//! 1. **Initialisation**: `initialize` creates a session and negotiates the
//!    protocol version; `notifications/initialized` acknowledges it
//! 2. **Operation**: `tools/list` and `tools/call` on an existing session
//! 3. **Shutdown**: the transport removes the session (`DELETE`, expiry)
//!
//! Protocol failures become JSON-RPC error objects. Tool failures are
//! `isError` results inside a successful response.
//!
//! # Tool execution
//!
//! Tools touch editor state that is not safe to use concurrently, so every
//! call takes a single dispatch lock before running on the blocking pool.
//! The lock guard moves into the blocking task: a call that outlives its
//! timeout keeps later calls waiting until it actually returns.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::ServerConfig;
use crate::mcp::protocol::{
    negotiate_protocol_version, parse_payload, parse_value, ErrorCode, IncomingMessage,
    IncomingPayload, JsonRpcError, JsonRpcErrorData, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, OutgoingMessage, RequestId, SERVER_NAME,
};
use crate::mcp::session::{ClientInfo, SessionManager};
use crate::tools::schema::validate_arguments;
use crate::tools::{Tool, ToolCallResult, ToolRegistry};

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool; absent and `null` mean no arguments.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// What to write back for one HTTP body.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// Nothing: the body held only notifications.
    Empty,
    /// Response to a single request.
    Single(OutgoingMessage),
    /// Responses to the requests of a batch, in order.
    Batch(Vec<OutgoingMessage>),
}

impl Reply {
    /// Whether there is no response body.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Result of processing one HTTP body.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Messages to send back.
    pub reply: Reply,
    /// Id of a session created by `initialize` in this body.
    pub new_session_id: Option<String>,
}

/// The MCP server for Unreal Editor automation.
pub struct McpServer {
    /// Registered tools, read-only after start-up.
    registry: Arc<ToolRegistry>,
    /// Live client sessions.
    sessions: SessionManager,
    /// Serialises tool execution.
    dispatch_lock: Arc<tokio::sync::Mutex<()>>,
    /// Bound on waiting for and running one tool call.
    request_timeout: Duration,
    /// Sessions idle longer than this are discarded.
    session_idle_timeout: Duration,
}

impl McpServer {
    /// Creates a server over a filled registry, with default timeouts.
    #[must_use]
    pub fn new(registry: ToolRegistry) -> Self {
        let defaults = ServerConfig::default();
        Self {
            registry: Arc::new(registry),
            sessions: SessionManager::new(),
            dispatch_lock: Arc::new(tokio::sync::Mutex::new(())),
            request_timeout: defaults.request_timeout(),
            session_idle_timeout: defaults.session_idle_timeout(),
        }
    }

    /// Creates a server using the timeouts from `config`.
    #[must_use]
    pub fn from_config(registry: ToolRegistry, config: &ServerConfig) -> Self {
        Self::new(registry)
            .with_request_timeout(config.request_timeout())
            .with_session_idle_timeout(config.session_idle_timeout())
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the session idle expiry.
    #[must_use]
    pub const fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = timeout;
        self
    }

    /// The tool registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The session manager.
    #[must_use]
    pub const fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Processes one raw body received with the given session header.
    pub async fn process(&self, body: &str, session_id: Option<&str>) -> Outcome {
        self.sessions.prune_idle(self.session_idle_timeout);

        let mut new_session_id = None;
        let reply = match parse_payload(body) {
            Err(error) => {
                tracing::debug!(code = error.error.code, "Rejected payload");
                Reply::Single(error.into())
            }
            Ok(IncomingPayload::Single(value)) => {
                match self
                    .handle_value(value, session_id, &mut new_session_id)
                    .await
                {
                    Some(message) => Reply::Single(message),
                    None => Reply::Empty,
                }
            }
            Ok(IncomingPayload::Batch(values)) => {
                let mut responses = Vec::new();
                for value in values {
                    // A session created earlier in the batch applies to the rest of it.
                    let current = new_session_id.clone();
                    let effective = current.as_deref().or(session_id);
                    if let Some(message) = self
                        .handle_value(value, effective, &mut new_session_id)
                        .await
                    {
                        responses.push(message);
                    }
                }
                if responses.is_empty() {
                    Reply::Empty
                } else {
                    Reply::Batch(responses)
                }
            }
        };

        Outcome {
            reply,
            new_session_id,
        }
    }

    /// Handles one decoded message.
    async fn handle_value(
        &self,
        value: Value,
        session_id: Option<&str>,
        new_session_id: &mut Option<String>,
    ) -> Option<OutgoingMessage> {
        match parse_value(value) {
            Err(error) => Some(error.into()),
            Ok(IncomingMessage::Notification(notif)) => {
                self.handle_notification(&notif, session_id);
                None
            }
            Ok(IncomingMessage::Request(req)) => Some(
                self.handle_request(req, session_id, new_session_id)
                    .await,
            ),
        }
    }

    /// Handles an incoming request.
    async fn handle_request(
        &self,
        req: JsonRpcRequest,
        session_id: Option<&str>,
        new_session_id: &mut Option<String>,
    ) -> OutgoingMessage {
        tracing::debug!(method = %req.method, id = %req.id, "Handling request");

        match req.method.as_str() {
            "initialize" => match self.handle_initialize(&req, session_id) {
                Ok((response, id)) => {
                    *new_session_id = Some(id);
                    response.into()
                }
                Err(error) => error.into(),
            },
            "ping" => Self::handle_ping(&req).into(),
            "tools/list" => self.handle_tools_list(&req, session_id).into(),
            "tools/call" => self.handle_tools_call(&req, session_id).await.into(),
            _ => JsonRpcError::method_not_found(req.id.clone(), &req.method).into(),
        }
    }

    /// Handles an incoming notification. Never produces a response.
    fn handle_notification(&self, notif: &JsonRpcNotification, session_id: Option<&str>) {
        if notif.jsonrpc != "2.0" {
            tracing::warn!(method = %notif.method, "Dropping notification with invalid jsonrpc version");
            return;
        }

        match notif.method.as_str() {
            "notifications/initialized" => match session_id {
                Some(id) if self.sessions.mark_initialized(id) => {
                    tracing::info!(session_id = %id, "Client initialised");
                }
                Some(id) => {
                    tracing::warn!(session_id = %id, "Initialized notification for unknown session");
                }
                None => {
                    tracing::warn!("Initialized notification without a session id");
                }
            },
            method if method.starts_with("notifications/") => {
                tracing::debug!(method, "Ignoring notification");
            }
            method => {
                tracing::debug!(method, "Ignoring unknown notification");
            }
        }
    }

    /// Handles the initialize request.
    ///
    /// Returns the response and the id of the session it created.
    fn handle_initialize(
        &self,
        req: &JsonRpcRequest,
        session_id: Option<&str>,
    ) -> Result<(JsonRpcResponse, String), JsonRpcError> {
        let params: InitializeParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid initialize params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing initialize params")
            })?;

        if let Some(previous) = session_id {
            if self.sessions.remove(previous) {
                tracing::info!(session_id = %previous, "Re-initialising session");
            }
        }

        let negotiated_version = negotiate_protocol_version(&params.protocol_version);
        let client_name = params.client_info.as_ref().map(|c| c.name.clone());
        let id = self
            .sessions
            .create(negotiated_version, params.client_info);

        tracing::info!(
            session_id = %id,
            requested = %params.protocol_version,
            negotiated = negotiated_version,
            client = client_name.as_deref().unwrap_or("unknown"),
            "Session initialised"
        );

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        Ok((JsonRpcResponse::success(req.id.clone(), result), id))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(
        &self,
        req: &JsonRpcRequest,
        session_id: Option<&str>,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_session(&req.id, session_id)?;

        let result = json!({
            "tools": self.registry.list(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(
        &self,
        req: &JsonRpcRequest,
        session_id: Option<&str>,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_session(&req.id, session_id)?;

        let params: ToolCallParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid tool call params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing tool call params")
            })?;

        let Some(registered) = self.registry.get(&params.name) else {
            return Err(JsonRpcError::invalid_params(
                req.id.clone(),
                format!("Unknown tool: {}", params.name),
            ));
        };

        let arguments = match params.arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(JsonRpcError::invalid_params(
                    req.id.clone(),
                    "Invalid tool call params: arguments must be an object",
                ))
            }
        };

        let result = match validate_arguments(&registered.definition.input_schema, &arguments) {
            Err(reason) => ToolCallResult::error(reason),
            Ok(()) => {
                self.run_tool(&req.id, &params.name, Arc::clone(&registered.tool), arguments)
                    .await?
            }
        };

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::server_error(req.id.clone(), "Internal error: failed to serialise result")
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    /// Runs a tool under the dispatch lock, bounded by the request timeout.
    async fn run_tool(
        &self,
        id: &RequestId,
        name: &str,
        tool: Arc<dyn Tool>,
        arguments: Map<String, Value>,
    ) -> Result<ToolCallResult, JsonRpcError> {
        let lock = Arc::clone(&self.dispatch_lock);
        let started = Instant::now();
        let execution = async move {
            let guard = lock.lock_owned().await;
            tokio::task::spawn_blocking(move || {
                let _guard = guard;
                tool.execute(&arguments)
            })
            .await
        };

        match tokio::time::timeout(self.request_timeout, execution).await {
            Ok(Ok(result)) => {
                tracing::info!(
                    tool = name,
                    is_error = result.is_error,
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Tool call finished"
                );
                Ok(result)
            }
            Ok(Err(join_error)) => {
                tracing::error!(tool = name, error = %join_error, "Tool execution aborted");
                Err(JsonRpcError::server_error(
                    id.clone(),
                    format!("Tool '{name}' failed unexpectedly: {join_error}"),
                ))
            }
            Err(_) => {
                let timeout_ms =
                    u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(tool = name, timeout_ms, "Tool call timed out");
                Err(JsonRpcError::new(
                    Some(id.clone()),
                    JsonRpcErrorData::with_message(
                        ErrorCode::ServerError,
                        format!("Tool '{name}' timed out after {timeout_ms} ms"),
                    )
                    .with_data(json!({ "timeoutMs": timeout_ms })),
                ))
            }
        }
    }

    /// Handles the ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Ensures the request belongs to a live session.
    fn require_session(
        &self,
        id: &RequestId,
        session_id: Option<&str>,
    ) -> Result<(), JsonRpcError> {
        match session_id {
            None => Err(JsonRpcError::not_initialized(
                id.clone(),
                "missing Mcp-Session-Id header; send initialize first",
            )),
            Some(session) if self.sessions.touch(session) => Ok(()),
            Some(session) => Err(JsonRpcError::not_initialized(
                id.clone(),
                &format!("unknown session '{session}'; send initialize first"),
            )),
        }
    }
}
