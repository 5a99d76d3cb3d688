//! SkyWalking MCP server binary.
//!
//! Resolves the OAP backend URL, builds the shared GraphQL client and serves
//! the MCP protocol over the selected transport.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use miette::Diagnostic;
use skywalking_mcp::config::{SW_URL_ENV, resolve_backend_url};
use skywalking_mcp::graphql::{GraphQlClient, QueryError};
use skywalking_mcp::mcp::{self, TransportError};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Error, Diagnostic, Debug)]
enum BinaryError {
    #[error("GraphQL client error: {0}")]
    #[diagnostic(code(swmcp::binary::graphql))]
    GraphQl(#[from] QueryError),

    #[error("Transport error: {0}")]
    #[diagnostic(code(swmcp::binary::transport))]
    Transport(#[from] TransportError),
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Transport {
    Stdio,
    Sse,
    StreamableHttp,
}

#[derive(Parser)]
#[command(name = "skywalking-mcp")]
#[command(author, version, about = "Apache SkyWalking MCP server", long_about = None)]
struct Cli {
    /// Transport to serve the MCP protocol over
    #[arg(short, long, value_enum, default_value = "stdio")]
    transport: Transport,

    /// SkyWalking OAP backend URL (falls back to the SW_URL environment
    /// variable, then http://127.0.0.1:12800)
    #[arg(short, long)]
    url: Option<String>,

    /// Address to bind for the sse and streamable-http transports
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    address: SocketAddr,

    /// URL path for the streamable-http transport
    #[arg(long, default_value = "/mcp")]
    endpoint_path: String,
}

/// Logs go to stderr: the stdio transport owns stdout.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skywalking_mcp=info,tower_http=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), BinaryError> {
    init_tracing();
    let cli = Cli::parse();

    let backend_url = resolve_backend_url(cli.url);
    tracing::info!(%backend_url, env = SW_URL_ENV, "connecting to SkyWalking OAP backend");

    let client = Arc::new(GraphQlClient::new(&backend_url)?);

    match cli.transport {
        Transport::Stdio => mcp::run_stdio(client).await?,
        Transport::Sse => mcp::run_sse(client, cli.address).await?,
        Transport::StreamableHttp => {
            mcp::run_streamable_http(client, cli.address, &cli.endpoint_path).await?;
        }
    }

    Ok(())
}
