//! burrow-mcp: expose one tenant's sandbox as an MCP server.
//!
//! The process serves a single identity, fixed when it is launched. Tool
//! payloads carry paths and content only; the kernel confines every path
//! to that identity's root.
//!
//! # Example
//!
//! ```ignore
//! use burrow_mcp::server::{BurrowServerHandler, McpServerConfig};
//! use rmcp::transport::io::stdio;
//! use rmcp::service::ServiceExt;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = McpServerConfig::load(None, "alice")?;
//!     let handler = BurrowServerHandler::from_config(config).await?;
//!     handler.serve(stdio()).await?.waiting().await?;
//!     Ok(())
//! }
//! ```

pub mod server;
