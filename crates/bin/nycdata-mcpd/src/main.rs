//! Daemon entry point for the NYC Open Data MCP server.
//!
//! Loads configuration from CLI arguments and the environment, builds the
//! Socrata client and control plane, and serves MCP over stdio or
//! streamable HTTP.

mod config;
mod logging;

use nycdata_core::{OpenDataControl, SocrataClient};
use nycdata_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use tracing::info;

use crate::config::NycDataConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = NycDataConfig::from_args()?;
    logging::init(config.log_format);

    let client = SocrataClient::new(&config.socrata)?;
    info!(
        base_url = client.base_url(),
        app_token = config.socrata.app_token.is_some(),
        "socrata client ready"
    );
    let control = OpenDataControl::new(client, config.reliability);

    if config.enable_stdio {
        serve_stdio(control).await
    } else {
        serve_streamable_http(control, McpHttpServerConfig::new(config.mcp_http_addr)).await
    }
}
