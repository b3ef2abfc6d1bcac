/// GitLab Utils MCP Server Entry Point
///
/// Parses environment variables to determine the transport mode (STDIO or
/// HTTP) and server identity, validates the GitLab configuration, then starts
/// the appropriate server implementation.
///
/// Environment Variables:
/// - SERVER_NAME: Name of the server (default: "GitLab Utils MCP Server")
/// - SERVER_VERSION: Version string (default: "0.0.1")
/// - MCP_TRANSPORT_MODE: "stdio", "http", or "both" (default: "both")
/// - HOST: Bind address for HTTP mode (default: "0.0.0.0")
/// - PORT: Port number for HTTP mode (default: 3000)
/// - WORKER_THREADS: HTTP worker threads (default: CPU count, max 16)
/// - GITLAB_API_URL: GitLab API base URL (default: "https://gitlab.com/api/v4")
/// - GITLAB_PERSONAL_ACCESS_TOKEN: GitLab personal access token (required for STDIO)
/// - RUST_LOG: Log filter (default: "info"); logs go to stderr
/// - LOG_FORMAT: "text" or "json" (default: "text")

mod core;
mod tools;

use tracing_subscriber::EnvFilter;

use crate::core::config::{self, Config};
use crate::core::server::{self, AppState};
use crate::core::utils;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if utils::get_env_var("LOG_FORMAT", "text") == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn http_settings() -> (String, u16, usize) {
    let host = utils::get_env_var("HOST", "0.0.0.0");
    let port = utils::parse_env_var("PORT", 3000u16);
    let workers = utils::parse_env_var("WORKER_THREADS", num_cpus::get().clamp(1, 16)).max(1);
    (host, port, workers)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let state = AppState {
        server_name: utils::get_env_var("SERVER_NAME", "GitLab Utils MCP Server"),
        server_version: utils::get_env_var("SERVER_VERSION", env!("CARGO_PKG_VERSION")),
    };

    let transport = utils::get_env_var("MCP_TRANSPORT_MODE", "both");

    match transport.as_str() {
        "stdio" => {
            // The process is the connection: refuse to serve with bad configuration
            let config = match Config::from_env() {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!(error = %e, "Cannot start STDIO server");
                    std::process::exit(1);
                }
            };
            server::run_server_stdio(state, config).await
        }
        "http" => {
            let (host, port, workers) = http_settings();
            server::run_server_http(state, config::raw_from_env(), host, port, workers).await
        }
        "both" => {
            let (host, port, workers) = http_settings();

            // HTTP clients may supply configuration per request, STDIO cannot
            let stdio_handle = match Config::from_env() {
                Ok(config) => {
                    let stdio_state = state.clone();
                    Some(tokio::spawn(async move {
                        if let Err(e) = server::run_server_stdio(stdio_state, config).await {
                            tracing::error!(error = %e, "STDIO server error");
                        }
                    }))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "STDIO transport disabled");
                    None
                }
            };

            let http_result = server::run_server_http(state, config::raw_from_env(), host, port, workers).await;

            if let Some(handle) = stdio_handle {
                handle.abort();
            }

            http_result
        }
        _ => {
            tracing::error!(
                transport = %transport,
                "Invalid transport mode, must be 'stdio', 'http', or 'both'"
            );
            std::process::exit(1);
        }
    }
}
