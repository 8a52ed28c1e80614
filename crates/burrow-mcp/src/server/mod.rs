//! MCP server exposing the sandbox operations as tools.

mod config;
mod handler;

pub use config::McpServerConfig;
pub use handler::{BurrowServerHandler, ContentEncoding};
