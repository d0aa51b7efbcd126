use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use ghl_core::{
    ClientConfig, GhlClient, ENV_API_KEY, ENV_API_VERSION, ENV_BASE_URL, ENV_LOCATION_ID,
};
use ghl_mcp::{stdio, GhlToolServer, McpConnection, McpServerConfig};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ghl-mcp", version, about = "MCP server for the GoHighLevel API")]
struct Args {
    /// Private integration token or OAuth access token.
    #[arg(long, env = ENV_API_KEY, hide_env_values = true)]
    api_key: Option<String>,

    /// API base URL, e.g. `https://services.leadconnectorhq.com`.
    #[arg(long, env = ENV_BASE_URL)]
    base_url: Option<String>,

    /// Sub-account (location) all calls are scoped to.
    #[arg(long, env = ENV_LOCATION_ID)]
    location_id: Option<String>,

    /// Default `Version` header.
    #[arg(long, env = ENV_API_VERSION)]
    api_version: Option<String>,

    /// Start serving without the startup connection test.
    #[arg(long, default_value_t = false)]
    skip_connection_test: bool,
}

impl Args {
    fn config(&self) -> Result<ClientConfig, ghl_core::ConfigError> {
        ClientConfig::from_lookup(|name| match name {
            ENV_API_KEY => self.api_key.clone(),
            ENV_BASE_URL => self.base_url.clone(),
            ENV_LOCATION_ID => self.location_id.clone(),
            ENV_API_VERSION => self.api_version.clone(),
            _ => None,
        })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = args.config().context("invalid configuration")?;
    let client = Arc::new(GhlClient::new(config).context("building GHL client")?);

    if !args.skip_connection_test {
        client.test_connection().await?;
        info!(location_id = %client.location_id(), "GHL API connection verified");
    }

    let cfg = McpServerConfig::new("ghl-mcp", env!("CARGO_PKG_VERSION"))
        .with_instructions("Tools for the GoHighLevel CRM. Every result is an envelope with `ok`.");
    let conn = McpConnection::new(cfg, Arc::new(GhlToolServer::new(client)));

    info!("serving MCP on stdio");
    stdio::serve(conn, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    Ok(())
}
