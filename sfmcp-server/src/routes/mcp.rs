//! JSON-RPC over HTTP

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::Value;

use sfmcp_core::ToolSummary;

use crate::AppState;

/// One JSON-RPC message per POST; notifications get `202 Accepted`
pub async fn rpc(State(state): State<Arc<AppState>>, Json(message): Json<Value>) -> Response {
    match state.mcp.handle_value(message).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct ToolCatalog {
    pub tools: Vec<ToolSummary>,
}

pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<ToolCatalog> {
    Json(ToolCatalog {
        tools: state.dispatcher.list_tools(),
    })
}
