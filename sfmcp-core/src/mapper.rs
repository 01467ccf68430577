//! Response mapping
//!
//! Turns a translator outcome into the protocol-uniform [`ToolResult`]
//! envelope. Every error keeps its kind, so the caller can tell "retry
//! me" from "fix your input" from "stop".

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{BridgeError, BridgeResult};

/// Error half of the envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: String,
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Status for HTTP surfaces; not part of the envelope text
    #[serde(skip)]
    pub http_status: u16,
}

impl From<&BridgeError> for ErrorDescriptor {
    fn from(err: &BridgeError) -> Self {
        let (path, details) = match err {
            BridgeError::Validation { path, reason } => (Some(path.clone()), Some(json!({ "reason": reason }))),
            BridgeError::PartialFailure { report } => (None, serde_json::to_value(report.as_ref()).ok()),
            BridgeError::TransientBackend { status: Some(status), .. } => (None, Some(json!({ "status": status }))),
            BridgeError::Backend { status, .. } => (None, Some(json!({ "status": status }))),
            _ => (None, None),
        };

        Self {
            kind: err.kind().to_string(),
            code: err.error_code(),
            message: err.to_string(),
            retryable: err.is_retryable(),
            path,
            details,
            http_status: err.http_status_code(),
        }
    }
}

/// Result envelope returned for every dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
}

impl ToolResult {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(error: &BridgeError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(ErrorDescriptor::from(error)),
        }
    }

    /// Kind of the error, if any
    pub fn error_kind(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.kind.as_str())
    }

    /// 200 on success, the error's status otherwise
    pub fn http_status(&self) -> u16 {
        self.error.as_ref().map_or(200, |e| e.http_status)
    }

    /// Pretty JSON text for protocol content blocks
    pub fn to_text(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!(r#"{{"success":false,"error":{{"kind":"SerializationError","message":"{}"}}}}"#, e)
        })
    }
}

/// Map a serializable outcome into the envelope
pub fn map_result<T: Serialize>(outcome: BridgeResult<T>) -> ToolResult {
    match outcome.and_then(|value| serde_json::to_value(value).map_err(BridgeError::from)) {
        Ok(value) => ToolResult::ok(value),
        Err(e) => ToolResult::err(&e),
    }
}
