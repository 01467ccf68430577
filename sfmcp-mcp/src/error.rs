//! Error types for the MCP server

use sfmcp_core::BridgeError;
use thiserror::Error;

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

/// Protocol-level failures
///
/// Tool failures are not represented here; they travel inside the tool
/// result with `isError: true`.
#[derive(Error, Debug)]
pub enum McpError {
    /// Line is not valid JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Valid JSON but not a JSON-RPC 2.0 request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Malformed protocol parameters (e.g. `tools/call` without a name)
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Bridge setup errors
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::Parse(_) => -32700,
            McpError::InvalidRequest(_) => -32600,
            McpError::MethodNotFound(_) => -32601,
            McpError::InvalidParams(_) => -32602,
            McpError::Bridge(e) => e.jsonrpc_code(),
            McpError::Serialization(_) => -32700,
            McpError::Io(_) | McpError::Internal(_) => -32603,
        }
    }
}
