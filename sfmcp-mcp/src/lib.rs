//! Salesforce MCP Server Library
//!
//! Speaks the Model Context Protocol over stdio and hands every tool call
//! to the [`sfmcp_core::Dispatcher`].
//!
//! ## Architecture
//!
//! ```text
//! Agent (MCP client)
//!        │  JSON-RPC 2.0, one message per line
//!        ▼
//! ┌─────────────────┐
//! │   MCP Server    │ ◄── This crate
//! │                 │  initialize, ping,
//! │                 │  tools/list, tools/call
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   sfmcp-core    │
//! │                 │
//! │ Registry │ Validator │ Translators
//! │ Session  │ Backend   │ Mapper
//! └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sfmcp_core::{BridgeConfig, Credentials};
//! use sfmcp_mcp::McpServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = McpServer::connect(BridgeConfig::from_env(), Credentials::from_env()?)?;
//!     server.run_stdio().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod protocol;
pub mod server;

pub use error::{McpError, McpResult};
pub use protocol::{McpRequest, McpResponse, RpcError, PROTOCOL_VERSION};
pub use server::McpServer;

/// Server metadata for MCP protocol
pub const SERVER_NAME: &str = "salesforce-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const SERVER_INSTRUCTIONS: &str = "Salesforce tools: create custom objects and fields, \
run SOQL queries and SOSL searches, inspect object schemas, and define Einstein Studio models. \
Every tool returns a JSON envelope with `success` and either `result` or `error`.";
