//! MCP protocol surface: the tool router, prompt/resource handlers and the
//! transport runners.

pub mod server;
pub mod service;
pub mod tools;

#[cfg(test)]
mod server_test;

pub use server::McpServer;
pub use service::{TransportError, create_mcp_service, run_sse, run_stdio, run_streamable_http};
