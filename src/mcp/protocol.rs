//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! This module defines the core message types used in the Model Context Protocol.
//! All messages follow the JSON-RPC 2.0 specification with MCP-specific extensions.
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has a non-null `id`)
//! - **Response**: A reply to a request (success or error)
//! - **Notification**: A one-way message (no `id`, or `id: null`; never answered)
//!
//! A payload may also be a batch: a JSON array of messages processed in order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The latest MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2025-03-26";

/// Every protocol version the server can speak, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &[MCP_PROTOCOL_VERSION, "2024-11-05"];

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "ue-mcp-server";

/// Picks the version to answer `initialize` with.
///
/// A supported version requested by the client is echoed back; anything else
/// is answered with the latest version and left for the client to reject.
#[must_use]
pub fn negotiate_protocol_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|v| *v == requested)
        .unwrap_or(MCP_PROTOCOL_VERSION)
}

/// A JSON-RPC 2.0 request ID.
///
/// `null` ids are not represented here: a `null` id marks a notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// Numeric request ID above `i64::MAX`.
    Unsigned(u64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Unsigned(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A JSON-RPC 2.0 request message.
///
/// Requests expect a response from the server.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be "2.0".
    pub jsonrpc: String,

    /// Unique request identifier.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Validates that this is a well-formed JSON-RPC 2.0 request.
    ///
    /// Returns an error message if validation fails.
    #[must_use]
    pub fn validate(&self) -> Option<&'static str> {
        if self.jsonrpc != "2.0" {
            return Some("jsonrpc field must be \"2.0\"");
        }
        if self.method.is_empty() {
            return Some("method field cannot be empty");
        }
        None
    }
}

/// A JSON-RPC 2.0 notification message (incoming).
///
/// Notifications do not have an ID and do not expect a response. Envelope
/// problems on a notification are logged by the server, never answered.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    /// Should be "2.0".
    #[serde(default)]
    pub jsonrpc: String,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result,
        }
    }
}

/// JSON-RPC 2.0 error codes, including the MCP server-defined range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// A session-bound method arrived before `initialize`.
    ServerNotInitialized,
    /// Generic server failure (timeouts, tool panics).
    ServerError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::ServerNotInitialized => -32002,
            Self::ServerError => -32000,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::ServerNotInitialized => "Server not initialized",
            Self::ServerError => "Server error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A JSON-RPC 2.0 error response.
///
/// `id` serialises as `null` when the request id could not be determined.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this error corresponds to (if known).
    pub id: Option<RequestId>,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error,
        }
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorData::from_code(ErrorCode::ParseError))
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>, reason: &str) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::with_message(
                ErrorCode::InvalidRequest,
                format!("Invalid Request: {reason}"),
            ),
        )
    }

    /// Creates a method not found error response.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(
            Some(id),
            JsonRpcErrorData::with_message(
                ErrorCode::MethodNotFound,
                format!("Method not found: {method}"),
            ),
        )
    }

    /// Creates an invalid params error response.
    #[must_use]
    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(
            Some(id),
            JsonRpcErrorData::with_message(ErrorCode::InvalidParams, message),
        )
    }

    /// Creates a "server not initialized" error response.
    #[must_use]
    pub fn not_initialized(id: RequestId, detail: &str) -> Self {
        Self::new(
            Some(id),
            JsonRpcErrorData::with_message(
                ErrorCode::ServerNotInitialized,
                format!("Server not initialized: {detail}"),
            ),
        )
    }

    /// Creates a generic server error response (-32000).
    #[must_use]
    pub fn server_error(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(
            Some(id),
            JsonRpcErrorData::with_message(ErrorCode::ServerError, message),
        )
    }
}

/// Any message the server writes back: a result or an error.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    /// A successful response.
    Response(JsonRpcResponse),
    /// An error response.
    Error(JsonRpcError),
}

impl OutgoingMessage {
    /// Returns the error object if this is an error response.
    #[must_use]
    pub const fn as_error(&self) -> Option<&JsonRpcErrorData> {
        match self {
            Self::Response(_) => None,
            Self::Error(err) => Some(&err.error),
        }
    }
}

impl From<JsonRpcResponse> for OutgoingMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for OutgoingMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

impl From<Result<JsonRpcResponse, JsonRpcError>> for OutgoingMessage {
    fn from(result: Result<JsonRpcResponse, JsonRpcError>) -> Self {
        match result {
            Ok(response) => Self::Response(response),
            Err(error) => Self::Error(error),
        }
    }
}

/// An incoming message that could be either a request or notification.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

/// A decoded HTTP body: one message or a batch.
#[derive(Debug)]
pub enum IncomingPayload {
    /// A single JSON object.
    Single(Value),
    /// A JSON array of messages, in receipt order.
    Batch(Vec<Value>),
}

/// Parses a raw body into a single message or a batch.
///
/// # Errors
///
/// Returns a parse error (-32700, `id: null`) for malformed JSON, and an
/// invalid request error for an empty batch or a non-object, non-array body.
pub fn parse_payload(json: &str) -> Result<IncomingPayload, JsonRpcError> {
    let value: Value = serde_json::from_str(json).map_err(|_| JsonRpcError::parse_error())?;

    match value {
        Value::Array(items) if items.is_empty() => {
            Err(JsonRpcError::invalid_request(None, "empty batch"))
        }
        Value::Array(items) => Ok(IncomingPayload::Batch(items)),
        Value::Object(_) => Ok(IncomingPayload::Single(value)),
        _ => Err(JsonRpcError::invalid_request(
            None,
            "message must be a JSON object",
        )),
    }
}

/// Classifies one decoded JSON value as a request or notification.
///
/// An object with a string `method` and an absent or `null` id is a
/// notification, whatever else is wrong with it.
///
/// # Errors
///
/// Returns an invalid request error (-32600) if the value is not an object,
/// lacks a string `method`, carries an id that is neither string nor integer,
/// or (for requests) has a `jsonrpc` field other than `"2.0"`.
pub fn parse_value(value: Value) -> Result<IncomingMessage, JsonRpcError> {
    let obj = value
        .as_object()
        .ok_or_else(|| JsonRpcError::invalid_request(None, "message must be a JSON object"))?;

    let id = match obj.get("id") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(serde_json::from_value::<RequestId>(raw.clone()).map_err(|_| {
            JsonRpcError::invalid_request(None, "id must be a string or an integer")
        })?),
    };

    if !obj.get("method").is_some_and(Value::is_string) {
        return Err(JsonRpcError::invalid_request(
            id,
            "method field must be a string",
        ));
    }

    if id.is_none() {
        return Ok(IncomingMessage::Notification(JsonRpcNotification {
            jsonrpc: obj
                .get("jsonrpc")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            method: obj
                .get("method")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            params: obj.get("params").filter(|p| !p.is_null()).cloned(),
        }));
    }

    let jsonrpc_ok = obj.get("jsonrpc").and_then(Value::as_str) == Some("2.0");
    if !jsonrpc_ok {
        return Err(JsonRpcError::invalid_request(
            id,
            "jsonrpc field must be \"2.0\"",
        ));
    }

    let request: JsonRpcRequest = serde_json::from_value(value)
        .map_err(|_| JsonRpcError::invalid_request(id.clone(), "malformed request"))?;

    if let Some(reason) = request.validate() {
        return Err(JsonRpcError::invalid_request(Some(request.id), reason));
    }

    Ok(IncomingMessage::Request(request))
}

/// Parses a JSON string holding exactly one message.
///
/// # Errors
///
/// Returns a `JsonRpcError` if the JSON is malformed or not a valid message.
pub fn parse_message(json: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(json).map_err(|_| JsonRpcError::parse_error())?;
    parse_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::Number(1));
        assert_eq!(req.method, "initialize");
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Notification(notif) = msg else {
            panic!("Expected Notification, got Request");
        };
        assert_eq!(notif.method, "notifications/initialized");
    }

    #[test]
    fn null_id_is_a_notification() {
        let json = r#"{"jsonrpc": "2.0", "id": null, "method": "notifications/initialized"}"#;
        let msg = parse_message(json).unwrap();
        assert!(matches!(msg, IncomingMessage::Notification(_)));
    }

    #[test]
    fn bad_envelope_notification_still_classified() {
        let json = r#"{"jsonrpc": 2, "method": "notifications/initialized", "params": null}"#;
        let IncomingMessage::Notification(notif) = parse_message(json).unwrap() else {
            panic!("Expected Notification");
        };
        assert_eq!(notif.jsonrpc, "");
        assert!(notif.params.is_none());
    }

    #[test]
    fn parse_id_above_i64_max() {
        let json = r#"{"jsonrpc": "2.0", "id": 18446744073709551615, "method": "ping"}"#;
        let IncomingMessage::Request(req) = parse_message(json).unwrap() else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::Unsigned(u64::MAX));

        let response = JsonRpcResponse::success(req.id, serde_json::json!({}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""id":18446744073709551615"#));
    }

    #[test]
    fn parse_string_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::String("abc-123".to_string()));
    }

    #[test]
    fn parse_invalid_json() {
        let json = "not valid json";
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::ParseError.code());
        assert!(err.id.is_none());
    }

    #[test]
    fn parse_missing_jsonrpc_keeps_id() {
        let json = r#"{"id": 1, "method": "test"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, Some(RequestId::Number(1)));
    }

    #[test]
    fn parse_wrong_jsonrpc_version() {
        let json = r#"{"jsonrpc": "1.0", "id": 1, "method": "test"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn parse_non_string_method() {
        let json = r#"{"jsonrpc": "2.0", "id": 7, "method": 42}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert!(err.error.message.contains("method"));
    }

    #[test]
    fn error_codes() {
        let codes: Vec<i32> = [
            ErrorCode::ParseError,
            ErrorCode::InvalidRequest,
            ErrorCode::MethodNotFound,
            ErrorCode::InvalidParams,
            ErrorCode::ServerNotInitialized,
            ErrorCode::ServerError,
        ]
        .into_iter()
        .map(ErrorCode::code)
        .collect();
        assert_eq!(codes, [-32700, -32600, -32601, -32602, -32002, -32000]);
    }

    #[test]
    fn parse_fractional_id_rejected() {
        let json = r#"{"jsonrpc": "2.0", "id": 1.5, "method": "ping"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn payload_batch_and_empty_batch() {
        let batch = parse_payload(r#"[{"jsonrpc":"2.0","id":1,"method":"ping"}]"#).unwrap();
        assert!(matches!(batch, IncomingPayload::Batch(ref items) if items.len() == 1));

        let err = parse_payload("[]").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn payload_scalar_rejected() {
        let err = parse_payload("42").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn serialise_success_response() {
        let response =
            JsonRpcResponse::success(RequestId::Number(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
    }

    #[test]
    fn serialise_error_response() {
        let error = JsonRpcError::method_not_found(RequestId::Number(1), "unknown/method");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("unknown/method"));
    }

    #[test]
    fn serialise_parse_error_has_null_id() {
        let json = serde_json::to_value(JsonRpcError::parse_error()).unwrap();
        assert_eq!(json["id"], Value::Null);
        assert_eq!(json["error"]["code"], -32700);
        assert!(json.get("result").is_none());
    }

    #[test]
    fn negotiate_versions() {
        assert_eq!(negotiate_protocol_version("2024-11-05"), "2024-11-05");
        assert_eq!(negotiate_protocol_version("2025-03-26"), "2025-03-26");
        assert_eq!(negotiate_protocol_version("1999-01-01"), MCP_PROTOCOL_VERSION);
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::Number(42)), "42");
        assert_eq!(format!("{}", RequestId::String("abc".to_string())), "abc");
    }
}
