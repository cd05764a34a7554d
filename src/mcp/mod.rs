//! MCP server entrypoints for stdio and HTTP transports.

mod auth;
pub mod catalog;
mod dispatch;
mod http;
mod rate_limit;
mod server;

use tokio_util::sync::CancellationToken;

pub use http::router as http_router;
pub use server::FaersServer;

use crate::config::HttpConfig;

/// Runs the FAERS MCP server over stdio.
///
/// # Errors
///
/// Returns an error when stdio transport setup or MCP server startup fails.
pub async fn run_stdio() -> anyhow::Result<()> {
    use rmcp::ServiceExt;

    let shutdown = CancellationToken::new();

    let cancel = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let running = FaersServer::new()?
        .serve_with_ct(rmcp::transport::stdio(), shutdown)
        .await?;
    let _reason = running.waiting().await?;
    Ok(())
}

/// Runs the FAERS MCP server over streamable HTTP.
///
/// Serves:
/// - `GET /health`: unauthenticated liveness
/// - `GET /.well-known/oauth-authorization-server`: OAuth discovery metadata
/// - `/mcp`: MCP JSON-RPC with `Mcp-Session-Id` sessions, behind bearer
///   validation (when enabled) and a per-client rate limit
///
/// # Errors
///
/// Returns an error when the configuration is invalid, or TCP bind or server
/// startup fails.
pub async fn run_http(config: HttpConfig) -> anyhow::Result<()> {
    http::serve(config).await
}
