//! Model Context Protocol (MCP) server implementation.
//!
//! This module exposes Unreal Editor automation as MCP tools to AI
//! assistants. Clients talk JSON-RPC 2.0 over HTTP `POST /mcp`, identified
//! between requests by the `Mcp-Session-Id` header.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│   Server    │───▶│   Tools     │    │
//! │   │   (HTTP)    │    │ (dispatch)  │    │ (registry)  │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │          │                  │                  │            │
//! │          ▼                  ▼                  ▼            │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  JSON-RPC   │    │  Sessions   │    │   Modules   │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! The server speaks MCP `2025-03-26` and `2024-11-05`, echoing the
//! client's version when it is one of these.

pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use session::SessionManager;
pub use transport::HttpServer;
