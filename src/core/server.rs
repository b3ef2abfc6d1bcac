/// MCP Server Implementation
///
/// This module contains the core MCP server implementation including:
/// - JSON-RPC 2.0 request/response structures
/// - Tool registry bound to one connection's configuration
/// - Transport-agnostic dispatch of MCP protocol methods
/// - HTTP server setup with Actix Web
/// - STDIO server implementation for line-based communication
///
/// A "connection" is the whole process in STDIO mode and a single request in
/// HTTP mode. Configuration is validated before any method of a connection is
/// dispatched; a connection with invalid configuration never reaches a tool.

use actix_web::{
    web, App, HttpServer, HttpResponse, Result,
    middleware::{Compress, Logger, DefaultHeaders},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::core::config::{self, Config};
use crate::core::error::{ConfigValidationError, ToolInputValidationError};
use crate::tools;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

/// Server identity shared by every connection.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server name as reported in MCP initialize responses
    pub server_name: String,
    /// Server version string as reported in MCP initialize responses
    pub server_version: String,
}

/// JSON-RPC 2.0 request structure for MCP protocol.
#[derive(Deserialize, Debug)]
pub struct MCPRequest {
    /// JSON-RPC version identifier, must be "2.0"
    #[allow(dead_code)]
    jsonrpc: String,
    /// Request ID for correlating responses. None indicates a notification.
    #[serde(default)]
    id: Option<Value>,
    /// MCP method name (e.g., "initialize", "tools/list", "tools/call")
    method: String,
    /// Method-specific parameters as JSON value
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC 2.0 response structure for MCP protocol.
#[derive(Serialize, Debug)]
pub struct MCPResponse {
    jsonrpc: String,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<MCPError>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Serialize, Debug)]
pub struct MCPError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl MCPResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Option<Value>, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(MCPError { code, message, data }),
        }
    }

    /// Response for a connection whose configuration failed validation.
    ///
    /// Field issues go into `data`; no configured value is echoed back.
    pub fn invalid_config(id: Option<Value>, err: &ConfigValidationError) -> Self {
        let data = serde_json::to_value(&err.issues).ok();
        Self::failure(id, INVALID_PARAMS, err.to_string(), data)
    }
}

/// MCP tool definition structure, serialized by `tools/list`.
#[derive(Serialize, Debug, Clone)]
pub struct MCPTool {
    /// Unique tool identifier (e.g., "get_upload_file")
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema defining the tool's input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Tool handler function type definition.
///
/// Handlers take the raw JSON arguments and return the text of the single
/// content item of the result, or the validation error of the arguments.
/// The handler must be Send + Sync to work across threads in the HTTP server.
pub type ToolHandler = Box<dyn Fn(Value) -> Result<String, ToolInputValidationError> + Send + Sync>;

/// Registry of the tools available on one connection.
pub struct ToolRegistry {
    /// List of all registered tools (for tools/list method)
    pub tools: Vec<MCPTool>,
    /// Map of tool names to their handler functions (for tools/call method)
    pub handlers: HashMap<String, ToolHandler>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Register a tool definition together with its handler.
    pub fn register(&mut self, tool: MCPTool, handler: ToolHandler) {
        let name = tool.name.clone();
        self.tools.push(tool);
        self.handlers.insert(name, handler);
    }
}

/// Build the tool registry of a connection.
///
/// Every handler closes over the same validated configuration. Add new tool
/// registrations here following the pattern:
/// `tools::your_tool::register(&mut registry, config.clone());`
pub fn initialize_tools(config: Arc<Config>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    tools::upload_file::register(&mut registry, config);
    registry
}

/// Route one JSON-RPC request to its MCP method handler.
///
/// Returns `None` for notifications, which never get a response.
pub fn dispatch(state: &AppState, registry: &ToolRegistry, req: MCPRequest) -> Option<MCPResponse> {
    if req.id.is_none() {
        tracing::debug!(method = %req.method, "Notification received");
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(state, req.id),
        "ping" => MCPResponse::success(req.id, serde_json::json!({})),
        "tools/list" => handle_tools_list(registry, req.id),
        "tools/call" => handle_tools_call(registry, req.id, req.params),
        _ => MCPResponse::failure(
            req.id,
            METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
            None,
        ),
    };
    Some(response)
}

fn handle_initialize(state: &AppState, id: Option<Value>) -> MCPResponse {
    MCPResponse::success(
        id,
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": state.server_name,
                "version": state.server_version
            }
        }),
    )
}

fn handle_tools_list(registry: &ToolRegistry, id: Option<Value>) -> MCPResponse {
    MCPResponse::success(id, serde_json::json!({ "tools": registry.tools }))
}

/// Execute `params.name` with `params.arguments`.
///
/// Argument validation failures are tool-level errors (`isError: true`), not
/// protocol errors, so the client sees which field to fix.
fn handle_tools_call(registry: &ToolRegistry, id: Option<Value>, params: Option<Value>) -> MCPResponse {
    let Some(tool_params) = params else {
        return MCPResponse::failure(id, INVALID_PARAMS, "Invalid params".to_string(), None);
    };

    let tool_name = tool_params.get("name").and_then(|v| v.as_str()).unwrap_or("");
    let arguments = tool_params
        .get("arguments")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));

    let Some(handler) = registry.handlers.get(tool_name) else {
        return MCPResponse::failure(id, METHOD_NOT_FOUND, format!("Unknown tool: {}", tool_name), None);
    };

    match handler(arguments) {
        Ok(text) => MCPResponse::success(
            id,
            serde_json::json!({
                "content": [{ "type": "text", "text": text }],
                "isError": false
            }),
        ),
        Err(e) => {
            tracing::info!(tool = tool_name, error = %e, "Rejected tool call");
            MCPResponse::success(
                id,
                serde_json::json!({
                    "content": [{ "type": "text", "text": format!("Error: {}", e) }],
                    "isError": true
                }),
            )
        }
    }
}

/// Shared data of the HTTP transport.
struct HttpState {
    app: AppState,
    /// Raw configuration from the environment; query parameters override it per request.
    base_config: Value,
}

async fn health() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "gitlab-utils-mcp"
    })))
}

/// MCP JSON-RPC request handler in HTTP mode.
///
/// Each request is its own connection: configuration is assembled from the
/// environment plus query parameters and validated before dispatch.
async fn mcp_handler(
    state: web::Data<HttpState>,
    query: web::Query<HashMap<String, String>>,
    req: web::Json<MCPRequest>,
) -> Result<HttpResponse> {
    let req = req.into_inner();
    if req.id.is_none() {
        return Ok(HttpResponse::Accepted().finish());
    }

    let raw = config::with_overrides(state.base_config.clone(), &query);
    let config = match Config::validate(&raw) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting request with invalid configuration");
            return Ok(HttpResponse::Ok().json(MCPResponse::invalid_config(req.id, &e)));
        }
    };

    let registry = initialize_tools(Arc::new(config));
    match dispatch(&state.app, &registry, req) {
        Some(response) => Ok(HttpResponse::Ok().json(response)),
        None => Ok(HttpResponse::Accepted().finish()),
    }
}

/// Register the HTTP routes of the MCP transport.
fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/mcp", web::post().to(mcp_handler))
        .route("/", web::post().to(mcp_handler))
        .route("/", web::get().to(health));
}

/// Run the MCP server in HTTP mode.
///
/// # Arguments
/// * `state` - Server name and version
/// * `base_config` - Raw configuration from the environment
/// * `host` - Bind address (e.g., "0.0.0.0" for all interfaces)
/// * `port` - Port number to listen on
/// * `workers` - Number of worker threads
pub async fn run_server_http(
    state: AppState,
    base_config: Value,
    host: String,
    port: u16,
    workers: usize,
) -> std::io::Result<()> {
    use std::time::Duration;

    let bind_addr = format!("{}:{}", host, port);

    tracing::info!(
        name = %state.server_name,
        version = %state.server_version,
        bind = %bind_addr,
        workers,
        "MCP server starting (HTTP mode)"
    );

    let http_state = web::Data::new(HttpState {
        app: state,
        base_config,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(http_state.clone())
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("Cache-Control", "no-store"))
            )
            // %U logs the path only; the query string may carry the access token
            .wrap(Logger::new("%U %s %Dms"))
            .configure(routes)
    })
    .workers(workers)
    .max_connections(10000)
    .max_connection_rate(1000)
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(30))
    .client_disconnect_timeout(Duration::from_secs(2))
    .shutdown_timeout(10)
    .bind(&bind_addr)?
    .run()
    .await
}

/// Run the MCP server in STDIO mode.
///
/// The process is a single connection whose configuration has already been
/// validated by the caller. Requests are read line-by-line from stdin and
/// responses written to stdout; logging goes to stderr.
pub async fn run_server_stdio(state: AppState, config: Config) -> std::io::Result<()> {
    use tokio::io::{BufReader, BufWriter};

    tracing::info!(
        name = %state.server_name,
        version = %state.server_version,
        api_url = %config.api_base_url(),
        "MCP server starting (STDIO mode)"
    );

    let registry = initialize_tools(Arc::new(config));
    let stdin = BufReader::with_capacity(8192, tokio::io::stdin());
    let mut stdout = BufWriter::with_capacity(8192, tokio::io::stdout());

    serve_lines(stdin, &mut stdout, &state, &registry).await
}

/// Serve newline-delimited JSON-RPC from `reader` until end of input.
///
/// Each response is written on its own line and flushed immediately.
pub async fn serve_lines<R, W>(
    reader: R,
    writer: &mut W,
    state: &AppState,
    registry: &ToolRegistry,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<MCPRequest>(&line) {
            Ok(req) => match dispatch(state, registry, req) {
                Some(response) => response,
                None => continue,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Parse error");
                // Echo the id when it can still be recovered, otherwise answer with null
                let id = serde_json::from_str::<Value>(&line)
                    .ok()
                    .and_then(|partial| partial.get("id").cloned());
                MCPResponse::failure(id, PARSE_ERROR, format!("Parse error: {}", e), None)
            }
        };

        let response_json = match serde_json::to_string(&response) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Error serializing response");
                continue;
            }
        };

        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}
