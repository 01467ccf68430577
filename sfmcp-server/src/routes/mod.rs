//! HTTP route handlers

mod mcp;
mod tools;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Service info
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub protocol_version: &'static str,
    pub endpoints: Vec<&'static str>,
}

async fn index() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: sfmcp_mcp::SERVER_NAME,
        version: env!("CARGO_PKG_VERSION"),
        protocol_version: sfmcp_mcp::PROTOCOL_VERSION,
        endpoints: vec![
            "GET /health",
            "POST /mcp",
            "GET /mcp/tools",
            "POST /v1/tools/:name",
        ],
    })
}

/// Create the router with all routes
pub fn create_router(state: Arc<AppState>, cors: bool) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/mcp", post(mcp::rpc))
        .route("/mcp/tools", get(mcp::list_tools))
        .route("/v1/tools/:name", post(tools::call_tool))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
