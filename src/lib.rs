//! ue-mcp-server: MCP server for AI-driven Unreal Editor automation
//!
//! This library hosts a Model Context Protocol server over HTTP that lets AI
//! assistants operate on an editor world through a small set of tools.
//!
//! # Architecture
//!
//! The server is assembled bottom-up at start-up, with no global state:
//!
//! - **Modules**: editor capabilities behind traits (actors in the level)
//! - **Tools**: MCP tools over modules, collected in a registry
//! - **Server**: JSON-RPC dispatch with sessions and serialised tool execution
//! - **Transport**: the axum listener at `/mcp`
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol, sessions and HTTP transport
//! - [`modules`] — Editor capability modules
//! - [`tools`] — Tool trait, registry and built-in tools

pub mod config;
pub mod error;
pub mod mcp;
pub mod modules;
pub mod tools;
