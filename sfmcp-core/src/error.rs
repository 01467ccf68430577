//! Error types for bridge operations
//!
//! Every failure a tool call can produce is a [`BridgeError`]. Each variant
//! carries enough structure for the caller to tell three situations apart:
//!
//! - "retry me" ([`ErrorCategory::Retryable`])
//! - "fix your input" ([`ErrorCategory::Input`])
//! - "fatal, stop" ([`ErrorCategory::Fatal`])
//!
//! Backend rejections that are neither of these land in
//! [`ErrorCategory::Backend`].
//!
//! # Example
//!
//! ```rust
//! use sfmcp_core::error::{BridgeError, ErrorCategory};
//!
//! let err = BridgeError::validation("fields[0].api_name", "must end in __c");
//! assert_eq!(err.category(), ErrorCategory::Input);
//! assert_eq!(err.error_code(), "VALIDATION_ERROR");
//! assert!(!err.is_retryable());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::translators::object::ObjectCreationReport;

/// Result type alias for bridge operations
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The caller must correct the request and resubmit
    Input,
    /// A later attempt may succeed unchanged
    Retryable,
    /// Nothing will succeed until the operator intervenes
    Fatal,
    /// The backend refused the operation
    Backend,
}

/// Errors that can occur while dispatching a tool call
#[derive(Error, Debug)]
pub enum BridgeError {
    // ═══════════════════════════════════════════════════════════════════════
    // Request errors
    // ═══════════════════════════════════════════════════════════════════════

    /// Requested tool name is not in the registry
    #[error("Unknown tool: '{name}'. Call tools/list to see the supported tools.")]
    UnknownTool { name: String },

    /// Parameters are missing or malformed
    #[error("Invalid parameter '{path}': {reason}")]
    Validation { path: String, reason: String },

    // ═══════════════════════════════════════════════════════════════════════
    // Session errors
    // ═══════════════════════════════════════════════════════════════════════

    /// Credentials were rejected by the org
    #[error("Authentication failed: {reason}")]
    Authentication { reason: String },

    // ═══════════════════════════════════════════════════════════════════════
    // Backend errors
    // ═══════════════════════════════════════════════════════════════════════

    /// Query or search was rejected as malformed
    #[error("Query rejected [{code}]: {message}")]
    QuerySyntax { code: String, message: String },

    /// The org denied access to an object, field or API
    #[error("Permission denied [{code}]: {message}")]
    Permission { code: String, message: String },

    /// Object shell was created but one or more fields were not attached
    #[error("Object '{}' partially configured: {}", .report.object_api_name, .report.outcome_summary())]
    PartialFailure { report: Box<ObjectCreationReport> },

    /// Network failure, timeout or 5xx from the org
    #[error("Transient backend error: {message}")]
    TransientBackend { status: Option<u16>, message: String },

    /// Einstein Studio rejected the model definition bundle
    #[error("Model definition rejected [{code}]: {message}")]
    ModelDefinition { code: String, message: String },

    /// Requested object or resource does not exist
    #[error("Not found [{code}]: {message}")]
    NotFound { code: String, message: String },

    /// Any other backend rejection
    #[error("Backend rejected request (HTTP {status}) [{code}]: {message}")]
    Backend { status: u16, code: String, message: String },

    // ═══════════════════════════════════════════════════════════════════════
    // Infrastructure errors
    // ═══════════════════════════════════════════════════════════════════════

    /// Process configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON serialization or deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error that shouldn't happen
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Shorthand for a validation failure at `path`
    pub fn validation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an authentication failure
    pub fn authentication(reason: impl Into<String>) -> Self {
        BridgeError::Authentication {
            reason: reason.into(),
        }
    }

    /// Shorthand for a transient failure
    pub fn transient(status: Option<u16>, message: impl Into<String>) -> Self {
        BridgeError::TransientBackend {
            status,
            message: message.into(),
        }
    }

    /// Returns true if retrying the same call unchanged might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::TransientBackend { .. })
    }

    /// Returns the error category for grouping
    pub fn category(&self) -> ErrorCategory {
        match self {
            BridgeError::UnknownTool { .. }
            | BridgeError::Validation { .. }
            | BridgeError::QuerySyntax { .. } => ErrorCategory::Input,

            BridgeError::TransientBackend { .. } => ErrorCategory::Retryable,

            BridgeError::Authentication { .. }
            | BridgeError::Configuration(_)
            | BridgeError::Internal(_) => ErrorCategory::Fatal,

            BridgeError::Permission { .. }
            | BridgeError::PartialFailure { .. }
            | BridgeError::ModelDefinition { .. }
            | BridgeError::NotFound { .. }
            | BridgeError::Backend { .. }
            | BridgeError::Serialization(_) => ErrorCategory::Backend,
        }
    }

    /// Returns the error kind name surfaced in result envelopes
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::UnknownTool { .. } => "UnknownTool",
            BridgeError::Validation { .. } => "ValidationError",
            BridgeError::Authentication { .. } => "AuthenticationError",
            BridgeError::QuerySyntax { .. } => "QuerySyntaxError",
            BridgeError::Permission { .. } => "PermissionError",
            BridgeError::PartialFailure { .. } => "PartialFailure",
            BridgeError::TransientBackend { .. } => "TransientBackendError",
            BridgeError::ModelDefinition { .. } => "ModelDefinitionError",
            BridgeError::NotFound { .. } => "NotFound",
            BridgeError::Backend { .. } => "BackendError",
            BridgeError::Configuration(_) => "ConfigurationError",
            BridgeError::Serialization(_) => "SerializationError",
            BridgeError::Internal(_) => "InternalError",
        }
    }

    /// Returns the stable error code for this error
    ///
    /// Backend-originated errors keep the org's own code (for example
    /// `MALFORMED_QUERY`) so callers can switch on it.
    pub fn error_code(&self) -> String {
        match self {
            BridgeError::UnknownTool { .. } => "UNKNOWN_TOOL".to_string(),
            BridgeError::Validation { .. } => "VALIDATION_ERROR".to_string(),
            BridgeError::Authentication { .. } => "AUTHENTICATION_FAILED".to_string(),
            BridgeError::QuerySyntax { code, .. }
            | BridgeError::Permission { code, .. }
            | BridgeError::ModelDefinition { code, .. }
            | BridgeError::NotFound { code, .. }
            | BridgeError::Backend { code, .. } => code.clone(),
            BridgeError::PartialFailure { .. } => "PARTIAL_FAILURE".to_string(),
            BridgeError::TransientBackend { .. } => "TRANSIENT_BACKEND_ERROR".to_string(),
            BridgeError::Configuration(_) => "CONFIGURATION_ERROR".to_string(),
            BridgeError::Serialization(_) => "SERIALIZATION_ERROR".to_string(),
            BridgeError::Internal(_) => "INTERNAL_ERROR".to_string(),
        }
    }

    /// Returns the HTTP status code for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            BridgeError::UnknownTool { .. } => 404,
            BridgeError::Validation { .. } | BridgeError::QuerySyntax { .. } => 400,
            BridgeError::Authentication { .. } => 401,
            BridgeError::Permission { .. } => 403,
            BridgeError::NotFound { .. } => 404,
            BridgeError::PartialFailure { .. } | BridgeError::ModelDefinition { .. } => 422,
            BridgeError::Backend { status, .. } => *status,
            BridgeError::TransientBackend { .. } => 503,
            BridgeError::Serialization(_) => 502,
            BridgeError::Configuration(_) | BridgeError::Internal(_) => 500,
        }
    }

    /// Returns the JSON-RPC error code used when the error escapes as a
    /// protocol-level error rather than a tool result
    pub fn jsonrpc_code(&self) -> i32 {
        match self {
            BridgeError::UnknownTool { .. } => -32601,
            BridgeError::Validation { .. } => -32602,
            BridgeError::Authentication { .. } => -32001,
            BridgeError::TransientBackend { .. } => -32002,
            _ => -32000,
        }
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        BridgeError::TransientBackend {
            status,
            message: err.to_string(),
        }
    }
}
