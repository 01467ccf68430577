//! Plain tool endpoint

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::Value;

use sfmcp_core::{BridgeError, ToolResult};

use crate::AppState;

/// Run one tool; the body is its parameters, an empty body means none
pub async fn call_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> (StatusCode, Json<ToolResult>) {
    let params = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(params) => params,
            Err(e) => {
                let result = ToolResult::err(&BridgeError::validation("$", format!("body is not valid JSON: {e}")));
                return (StatusCode::BAD_REQUEST, Json(result));
            }
        }
    };

    let result = state.dispatcher.dispatch(&name, &params).await;
    let status = StatusCode::from_u16(result.http_status()).unwrap_or(StatusCode::BAD_GATEWAY);

    (status, Json(result))
}
