//! Salesforce MCP Server Binary
//!
//! ## Usage
//!
//! ```bash
//! # Credentials from the environment
//! SF_USERNAME=admin@acme.example SF_PASSWORD=... SF_SECURITY_TOKEN=... sfmcp-mcp
//!
//! # Sandbox org
//! sfmcp-mcp --login-url https://test.salesforce.com
//! ```

use clap::Parser;
use sfmcp_core::{BridgeConfig, Credentials};
use sfmcp_mcp::McpServer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "sfmcp-mcp", version, about = "Salesforce MCP server over stdio")]
struct Args {
    /// Login endpoint (production or sandbox)
    #[arg(long, env = "SF_LOGIN_URL")]
    login_url: Option<String>,

    /// REST API version, e.g. 59.0
    #[arg(long, env = "SF_API_VERSION")]
    api_version: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries protocol messages only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sfmcp_mcp=info,sfmcp_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = BridgeConfig::from_env();
    if let Some(url) = args.login_url {
        config.login_url = url;
    }
    if let Some(version) = args.api_version {
        config.api_version = version;
    }

    let credentials = Credentials::from_env()?;

    tracing::info!(
        login_url = %config.login_url,
        api_version = %config.api_version,
        "Starting Salesforce MCP server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let server = McpServer::connect(config, credentials)?;

    tracing::info!("MCP server ready, listening on stdio");
    server.run_stdio().await?;

    Ok(())
}
