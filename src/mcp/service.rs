//! Transport runners: stdio and HTTP, with a legacy SSE mount point.

use std::net::SocketAddr;
use std::sync::Arc;

use miette::Diagnostic;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::graphql::GraphQlClient;

use super::server::McpServer;

#[derive(Error, Diagnostic, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(swmcp::transport::io))]
    Io(#[from] std::io::Error),

    #[error("MCP service error: {0}")]
    #[diagnostic(code(swmcp::transport::service))]
    Service(String),
}

/// Serve over stdin/stdout until the client disconnects.
///
/// Logging must go to stderr in this mode; stdout carries the protocol.
pub async fn run_stdio(client: Arc<GraphQlClient>) -> Result<(), TransportError> {
    info!("starting MCP server on the stdio transport");
    let service = McpServer::new(client)
        .serve(stdio())
        .await
        .map_err(|e| TransportError::Service(e.to_string()))?;
    service
        .waiting()
        .await
        .map_err(|e| TransportError::Service(e.to_string()))?;
    Ok(())
}

/// Serve clients configured for the SSE transport.
///
/// The deprecated HTTP+SSE protocol was superseded by streamable HTTP,
/// which still streams responses over SSE; this mounts the streamable
/// service at the conventional `/sse` path.
pub async fn run_sse(client: Arc<GraphQlClient>, address: SocketAddr) -> Result<(), TransportError> {
    info!(%address, "starting MCP server on the SSE endpoint");
    run_streamable_http(client, address, "/sse").await
}

/// Create the streamable HTTP service for nesting into an axum router.
pub fn create_mcp_service(
    client: Arc<GraphQlClient>,
    cancellation_token: CancellationToken,
) -> StreamableHttpService<McpServer, LocalSessionManager> {
    // One McpServer per session; the GraphQL client pool is shared.
    let service_factory = move || -> Result<McpServer, std::io::Error> {
        Ok(McpServer::new(Arc::clone(&client)))
    };

    let mut config = StreamableHttpServerConfig::default();
    config.sse_keep_alive = None;
    config.sse_retry = None;
    config.stateful_mode = true;
    config.cancellation_token = cancellation_token;

    StreamableHttpService::new(
        service_factory,
        LocalSessionManager::default().into(),
        config,
    )
}

/// Serve over streamable HTTP at `endpoint_path` until Ctrl-C.
pub async fn run_streamable_http(
    client: Arc<GraphQlClient>,
    address: SocketAddr,
    endpoint_path: &str,
) -> Result<(), TransportError> {
    let ct = CancellationToken::new();
    let mcp_service = create_mcp_service(client, ct.clone());

    let app = axum::Router::new()
        .nest_service(endpoint_path, mcp_service)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(address).await?;
    info!("MCP server listening on http://{address}{endpoint_path}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(ct))
        .await?;
    Ok(())
}

async fn shutdown_signal(ct: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
    ct.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streamable_service_builds_from_a_shared_client() {
        let client = Arc::new(GraphQlClient::new("http://oap:12800/graphql").unwrap());
        let ct = CancellationToken::new();
        let service = create_mcp_service(client, ct.clone());
        let _app: axum::Router = axum::Router::new().nest_service("/mcp", service);
        ct.cancel();
    }
}
