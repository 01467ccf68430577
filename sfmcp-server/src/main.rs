//! Salesforce MCP HTTP Server Binary
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults (port 8000)
//! SF_USERNAME=admin@acme.example SF_PASSWORD=... SF_SECURITY_TOKEN=... sfmcp-server
//!
//! # Custom port, no CORS
//! PORT=3000 sfmcp-server --no-cors
//! ```

use std::net::SocketAddr;

use clap::Parser;
use sfmcp_core::{BackendClient, BridgeConfig, Credentials, Dispatcher};
use sfmcp_server::SfServer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Parser)]
#[command(name = "sfmcp-server", version, about = "Salesforce MCP bridge over HTTP")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Disable permissive CORS
    #[arg(long)]
    no_cors: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sfmcp_server=info,sfmcp_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let bridge = BridgeConfig::from_env();
    let credentials = Credentials::from_env()?;
    let backend = BackendClient::connect(&bridge, credentials)?;

    tracing::info!("Starting Salesforce MCP server v{}", env!("CARGO_PKG_VERSION"));

    let server = SfServer::new(Dispatcher::new(backend, bridge)).with_cors(!args.no_cors);
    server.run(SocketAddr::from(([0, 0, 0, 0], args.port))).await?;

    Ok(())
}
