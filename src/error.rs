//! Error types for ue-mcp-server.
//!
//! Only start-up and transport failures are Rust errors. Protocol failures
//! are JSON-RPC error objects ([`crate::mcp::JsonRpcError`]) and tool failures
//! are `isError` results ([`crate::tools::ToolCallResult::error`]); neither
//! ever surfaces through these types.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised by the HTTP transport.
///
/// A bind failure is fatal: the server cannot run without its listener.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind MCP listener on {addr}")]
    Bind {
        /// Address the server attempted to bind.
        addr: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// `start` was called on a server that is already listening.
    #[error("MCP HTTP server is already running on {addr}")]
    AlreadyRunning {
        /// Address of the running listener.
        addr: SocketAddr,
    },

    /// The configured bind address is not a valid socket address.
    #[error("invalid bind address: {address}")]
    InvalidAddress {
        /// The offending address string.
        address: String,
    },

    /// I/O failure while serving.
    #[error("MCP HTTP server I/O error")]
    Io(#[from] std::io::Error),
}

/// Errors raised when registering a tool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A tool with the same name is already registered; the first one is kept.
    #[error("tool already registered: {name}")]
    DuplicateTool {
        /// The conflicting tool name.
        name: String,
    },

    /// The tool name is empty or not `snake_case`.
    #[error("invalid tool name '{name}': must be non-empty snake_case")]
    InvalidName {
        /// The rejected tool name.
        name: String,
    },

    /// The tool has an empty description.
    #[error("tool '{name}' has an empty description")]
    MissingDescription {
        /// The tool name.
        name: String,
    },

    /// The tool's input schema is not a JSON Schema object definition.
    #[error("tool '{name}' has an invalid input schema: {reason}")]
    InvalidSchema {
        /// The tool name.
        name: String,
        /// Why the schema was rejected.
        reason: String,
    },
}
