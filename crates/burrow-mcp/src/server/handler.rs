//! MCP server handler implementation.
//!
//! Each tool maps onto one sandbox operation for the identity this process
//! was launched with. Sandbox failures are tool results with `is_error`
//! set; only payloads that cannot be decoded become protocol errors.

use anyhow::Context as _;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use rmcp::ErrorData as McpError;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::ToolCallContext;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::schemars::{self, JsonSchema};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use burrow_kernel::{FsError, Sandbox};

use super::config::McpServerConfig;

/// The burrow MCP server handler.
#[derive(Clone)]
pub struct BurrowServerHandler {
    config: McpServerConfig,
    sandbox: Sandbox,
    tool_router: ToolRouter<Self>,
}

impl BurrowServerHandler {
    pub fn new(config: McpServerConfig, sandbox: Sandbox) -> Self {
        Self {
            config,
            sandbox,
            tool_router: Self::tool_router(),
        }
    }

    /// Provision the configured tenants and check that our identity is one
    /// of them before serving anything.
    pub async fn from_config(config: McpServerConfig) -> anyhow::Result<Self> {
        let sandbox = Sandbox::from_config(&config.sandbox)
            .await
            .context("Failed to provision sandbox roots")?;
        sandbox
            .registry()
            .root_for(&config.identity)
            .with_context(|| format!("Identity {:?} has no sandbox root", config.identity))?;
        Ok(Self::new(config, sandbox))
    }

    fn identity(&self) -> &str {
        &self.config.identity
    }
}

/// How file content is carried in a tool payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    /// Content is the text itself.
    #[default]
    Utf8,
    /// Content is standard base64 of the raw bytes.
    Base64,
}

impl ContentEncoding {
    fn decode(self, content: String) -> Result<Vec<u8>, McpError> {
        match self {
            ContentEncoding::Utf8 => Ok(content.into_bytes()),
            ContentEncoding::Base64 => STANDARD.decode(content.as_bytes()).map_err(|e| {
                McpError::invalid_params(format!("content is not valid base64: {e}"), None)
            }),
        }
    }

    /// Text when the bytes allow it, base64 otherwise.
    fn encode(data: Vec<u8>) -> (String, Self) {
        match String::from_utf8(data) {
            Ok(text) => (text, ContentEncoding::Utf8),
            Err(e) => (STANDARD.encode(e.into_bytes()), ContentEncoding::Base64),
        }
    }
}

/// Input for tools that act on a single path.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PathInput {
    #[schemars(description = "Path relative to your sandbox root")]
    pub path: String,
}

/// `list_tree` input.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListTreeInput {
    /// Directory to list; empty for the root.
    #[serde(default)]
    #[schemars(description = "Directory to list, relative to your sandbox root (default: the root)")]
    pub path: String,
}

/// `put_file` input.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PutFileInput {
    #[schemars(description = "Path relative to your sandbox root")]
    pub path: String,

    #[schemars(description = "File content")]
    pub content: String,

    #[serde(default)]
    #[schemars(description = "Encoding of content: utf8 (default) or base64")]
    pub encoding: ContentEncoding,
}

/// `rename` input.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RenameInput {
    #[schemars(description = "Existing path")]
    pub from: String,

    #[schemars(description = "New path; must not exist yet")]
    pub to: String,
}

/// `upload` input.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UploadInput {
    #[serde(default)]
    #[schemars(description = "Target directory (default: the root)")]
    pub dir: String,

    #[schemars(description = "File name: a single path segment, no separators")]
    pub filename: String,

    #[schemars(description = "File content")]
    pub content: String,

    #[serde(default)]
    #[schemars(description = "Encoding of content: utf8 (default) or base64")]
    pub encoding: ContentEncoding,
}

fn success(message: String) -> CallToolResult {
    CallToolResult {
        content: vec![Content::text(message)],
        structured_content: None,
        is_error: Some(false),
        meta: None,
    }
}

fn failure(err: &FsError) -> CallToolResult {
    let kind = err.kind();
    CallToolResult {
        content: vec![Content::text(err.to_string())],
        structured_content: Some(json!({
            "kind": kind,
            "message": err.to_string(),
            "retriable": kind.is_retriable(),
        })),
        is_error: Some(true),
        meta: None,
    }
}

fn outcome(result: Result<(), FsError>, message: impl FnOnce() -> String) -> CallToolResult {
    match result {
        Ok(()) => success(message()),
        Err(err) => failure(&err),
    }
}

#[tool_router]
impl BurrowServerHandler {
    #[tool(description = "Read a file from your sandbox. Returns the text, or base64 when the file is not valid UTF-8 (structured_content.encoding says which).")]
    async fn get_file(
        &self,
        Parameters(input): Parameters<PathInput>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(path = %input.path, "mcp.get_file");
        let data = match self.sandbox.get_file(self.identity(), &input.path).await {
            Ok(data) => data,
            Err(err) => return Ok(failure(&err)),
        };
        let size = data.len();
        let (text, encoding) = ContentEncoding::encode(data);
        Ok(CallToolResult {
            content: vec![Content::text(text)],
            structured_content: Some(json!({ "encoding": encoding, "size": size })),
            is_error: Some(false),
            meta: None,
        })
    }

    #[tool(description = "Create or overwrite a file. The parent directory must already exist.")]
    async fn put_file(
        &self,
        Parameters(input): Parameters<PutFileInput>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(path = %input.path, encoding = ?input.encoding, "mcp.put_file");
        let data = input.encoding.decode(input.content)?;
        let result = self.sandbox.put_file(self.identity(), &input.path, &data).await;
        Ok(outcome(result, || format!("wrote {} bytes to {}", data.len(), input.path)))
    }

    #[tool(description = "List one directory level. Each node has id (path from the root), parent (\"#\" at the top level), label, and kind (file or folder). Pass a folder's id to expand it.")]
    async fn list_tree(
        &self,
        Parameters(input): Parameters<ListTreeInput>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(path = %input.path, "mcp.list_tree");
        let nodes = match self.sandbox.list_tree(self.identity(), &input.path).await {
            Ok(nodes) => nodes,
            Err(err) => return Ok(failure(&err)),
        };
        let text = serde_json::to_string(&nodes)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(CallToolResult {
            content: vec![Content::text(text)],
            structured_content: Some(json!({ "nodes": nodes })),
            is_error: Some(false),
            meta: None,
        })
    }

    #[tool(description = "Create a directory. The parent must exist.")]
    async fn make_dir(
        &self,
        Parameters(input): Parameters<PathInput>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(path = %input.path, "mcp.make_dir");
        let result = self.sandbox.make_dir(self.identity(), &input.path).await;
        Ok(outcome(result, || format!("created directory {}", input.path)))
    }

    #[tool(description = "Create an empty file. Fails if anything already exists at the path.")]
    async fn create_empty(
        &self,
        Parameters(input): Parameters<PathInput>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(path = %input.path, "mcp.create_empty");
        let result = self.sandbox.create_empty(self.identity(), &input.path).await;
        Ok(outcome(result, || format!("created {}", input.path)))
    }

    #[tool(description = "Move or rename a file or directory. Fails if the destination exists.")]
    async fn rename(
        &self,
        Parameters(input): Parameters<RenameInput>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(from = %input.from, to = %input.to, "mcp.rename");
        let result = self
            .sandbox
            .rename(self.identity(), &input.from, &input.to)
            .await;
        Ok(outcome(result, || format!("renamed {} to {}", input.from, input.to)))
    }

    #[tool(description = "Remove a file or an empty directory. Non-empty directories are refused.")]
    async fn remove(
        &self,
        Parameters(input): Parameters<PathInput>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(path = %input.path, "mcp.remove");
        let result = self.sandbox.remove(self.identity(), &input.path).await;
        Ok(outcome(result, || format!("removed {}", input.path)))
    }

    #[tool(description = "Store an uploaded file under a directory. The filename must be a single segment; uploads never replace existing files unless the server allows it.")]
    async fn upload(
        &self,
        Parameters(input): Parameters<UploadInput>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(dir = %input.dir, filename = %input.filename, "mcp.upload");
        let data = input.encoding.decode(input.content)?;
        let result = self
            .sandbox
            .accept_upload(self.identity(), &input.dir, &input.filename, &data)
            .await;
        Ok(outcome(result, || {
            format!("uploaded {} bytes as {}", data.len(), input.filename)
        }))
    }
}

// Manual ServerHandler impl; tool calls go straight to the router.
impl rmcp::ServerHandler for BurrowServerHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "burrow: a private file area.\n\n\
                 Every path is relative to your sandbox root; `..` cannot leave it and \
                 leading `/` is ignored. Directories are listed one level at a time with \
                 list_tree.\n\n\
                 Tools:\n\
                 • get_file, put_file: read and write files (content as utf8 or base64)\n\
                 • list_tree: list a directory\n\
                 • make_dir, create_empty, rename, remove: manage entries\n\
                 • upload: store a named file in a directory"
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            meta: None,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        tracing::debug!(tool = %request.name, identity = %self.identity(), "mcp.call_tool");
        let tcc = ToolCallContext::new(self, request, context);
        self.tool_router.call(tcc).await
    }

    fn get_tool(&self, name: &str) -> Option<rmcp::model::Tool> {
        self.tool_router.get(name).cloned()
    }
}
