/// Core Server Framework Module
///
/// - config.rs: connection configuration and its validation
/// - error.rs: field-level validation errors
/// - server.rs: MCP server implementation with HTTP and STDIO transport
/// - url.rs: GitLab URL assembly
/// - utils.rs: environment helpers

pub mod config;
pub mod error;
pub mod server;
pub mod url;
pub mod utils;
