//! Salesforce MCP Server - HTTP front end
//!
//! Exposes the same dispatcher as the stdio server over HTTP:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     SfServer                         │
//! │  ┌─────────────────────────────────────────────┐    │
//! │  │          sfmcp-core::Dispatcher              │    │
//! │  │         (all logic lives here)              │    │
//! │  └─────────────────────────────────────────────┘    │
//! │                        │                             │
//! │  ┌─────────────────────┼─────────────────────┐      │
//! │  ▼                     ▼                     ▼      │
//! │ POST /mcp        GET /mcp/tools    POST /v1/tools/:name
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! `POST /mcp` takes JSON-RPC messages exactly as the stdio server does;
//! `POST /v1/tools/:name` takes the tool parameters as the body and
//! answers with the plain result envelope.

pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sfmcp_core::Dispatcher;
use sfmcp_mcp::McpServer;

/// Shared application state
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    /// JSON-RPC handling shared with the stdio server
    pub mcp: McpServer,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let dispatcher = Arc::new(dispatcher);
        Self {
            mcp: McpServer::from_shared(Arc::clone(&dispatcher)),
            dispatcher,
        }
    }
}

/// HTTP server over a [`Dispatcher`]
///
/// # Example
///
/// ```rust,ignore
/// use sfmcp_core::{BackendClient, BridgeConfig, Credentials, Dispatcher};
/// use sfmcp_server::SfServer;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let bridge = BridgeConfig::from_env();
///     let backend = BackendClient::connect(&bridge, Credentials::from_env()?)?;
///     let server = SfServer::new(Dispatcher::new(backend, bridge)).with_cors(false);
///     server.run(([0, 0, 0, 0], 8000).into()).await
/// }
/// ```
pub struct SfServer {
    state: Arc<AppState>,
    cors_enabled: bool,
}

impl SfServer {
    /// Server with permissive CORS enabled
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            state: Arc::new(AppState::new(dispatcher)),
            cors_enabled: true,
        }
    }

    /// Turn the permissive CORS layer on or off
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors_enabled = enabled;
        self
    }

    /// Build the Axum router with all routes
    pub fn router(&self) -> Router {
        routes::create_router(Arc::clone(&self.state), self.cors_enabled)
    }

    pub async fn run(&self, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();

        tracing::info!("Salesforce MCP server listening on http://{}", addr);
        tracing::info!("Endpoints:");
        tracing::info!("  GET  /");
        tracing::info!("  GET  /health");
        tracing::info!("  POST /mcp");
        tracing::info!("  GET  /mcp/tools");
        tracing::info!("  POST /v1/tools/:name");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
