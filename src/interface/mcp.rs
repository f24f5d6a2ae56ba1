//! MCP Server for library-api
//!
//! MCP Protocol (stdio) <-> application::BookService
//!
//! 5 tools: book_list, book_create, book_get, book_update, book_delete

use rmcp::{
    handler::server::{tool::ToolCallContext, tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::SharedLibrary;
use crate::application::error::{AppError, ErrorKind};
use crate::application::query::{ListQuery, SortKey, SortOrder, DEFAULT_LIMIT};
use crate::domain::model::book::{CreateBookRequest, UpdateBookRequest};
use crate::domain::model::id::BookId;

// =============================================================================
// Public entry point
// =============================================================================

/// MCP Serverをstdio上で起動する。
pub async fn run(library: SharedLibrary) -> anyhow::Result<()> {
    let server = LibraryMcpServer::new(library);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

// =============================================================================
// MCP Server
// =============================================================================

#[derive(Clone)]
struct LibraryMcpServer {
    library: SharedLibrary,
    tool_router: ToolRouter<Self>,
}

impl LibraryMcpServer {
    fn new(library: SharedLibrary) -> Self {
        Self {
            library,
            tool_router: Self::tool_router(),
        }
    }

    /// 入力起因のエラーはinvalid_params、Store障害はinternal_error。
    fn to_mcp_error(e: AppError) -> McpError {
        match e.kind() {
            ErrorKind::Internal => McpError::internal_error(format!("{e}"), None),
            _ => McpError::invalid_params(format!("{e}"), None),
        }
    }
}

// =============================================================================
// ServerHandler impl
// =============================================================================

impl ServerHandler for LibraryMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "library-api".to_string(),
                title: Some("Library: in-memory book catalogue".to_string()),
                description: Some(
                    "Create, search, update and delete book records (title, author, year, read)."
                        .to_string(),
                ),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Manage a catalogue of books.\n\
                 \n\
                 Titles and authors are trimmed; the same title + author (ignoring case) \
                 cannot be added twice. Years must be within 1500-2100.\n\
                 \n\
                 Tools: `book_list` (search/sort/page) → `book_get`, \
                 `book_create`, `book_update`, `book_delete`."
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
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool_ctx = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_ctx).await
    }
}

// =============================================================================
// Request types
// =============================================================================

fn parse_sort_key(s: &str) -> Result<SortKey, McpError> {
    s.parse::<SortKey>()
        .map_err(|e| McpError::invalid_params(format!("{e}"), None))
}

fn parse_order(s: &str) -> Result<SortOrder, McpError> {
    s.parse::<SortOrder>()
        .map_err(|e| McpError::invalid_params(format!("{e}"), None))
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Failed to encode result: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpListRequest {
    #[schemars(description = "Case-insensitive substring matched against title and author")]
    pub q: Option<String>,
    #[schemars(description = "Sort key: title, author or year. Omit to keep insertion order.")]
    pub sort: Option<String>,
    #[schemars(description = "Sort order: asc (default) or desc")]
    pub order: Option<String>,
    #[schemars(description = "Number of matches to skip (default: 0)")]
    pub offset: Option<i64>,
    #[schemars(description = "Page size, 1-100 (default: 10)")]
    pub limit: Option<i64>,
}

impl McpListRequest {
    fn into_query(self) -> Result<ListQuery, McpError> {
        let order = self
            .order
            .as_deref()
            .map(parse_order)
            .transpose()?
            .unwrap_or_default();

        let mut query = ListQuery::new().order(order);
        if let Some(q) = self.q {
            query = query.search(q);
        }
        if let Some(sort) = self.sort.as_deref() {
            query = query.sort_by(parse_sort_key(sort)?, order);
        }
        query
            .with_page(
                self.offset.unwrap_or(0),
                self.limit.unwrap_or(DEFAULT_LIMIT),
            )
            .map_err(|e| McpError::invalid_params(format!("{e}"), None))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpCreateRequest {
    #[schemars(description = "Book title (required, surrounding whitespace is trimmed)")]
    pub title: String,
    #[schemars(description = "Author name (required, surrounding whitespace is trimmed)")]
    pub author: String,
    #[schemars(description = "Publication year, 1500-2100")]
    pub year: i32,
    #[schemars(description = "Whether the book has been read (default: false)")]
    pub read: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpBookIdRequest {
    #[schemars(description = "Book ID from `book_list` output")]
    pub id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpUpdateRequest {
    #[schemars(description = "Book ID from `book_list` output")]
    pub id: u64,
    #[schemars(description = "New title (omit to keep current)")]
    pub title: Option<String>,
    #[schemars(description = "New author (omit to keep current)")]
    pub author: Option<String>,
    #[schemars(description = "New publication year, 1500-2100 (omit to keep current)")]
    pub year: Option<i32>,
    #[schemars(description = "New read flag (omit to keep current)")]
    pub read: Option<bool>,
}

// =============================================================================
// Tool implementations
// =============================================================================

#[tool_router]
impl LibraryMcpServer {
    #[tool(
        name = "book_list",
        description = "List books. Optional search (q), sort (title|author|year), order (asc|desc), offset and limit. Returns the page and the total number of matches.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn book_list(
        &self,
        Parameters(req): Parameters<McpListRequest>,
    ) -> Result<CallToolResult, McpError> {
        let query = req.into_query()?;
        let page = self
            .library
            .read()
            .await
            .list(&query)
            .map_err(Self::to_mcp_error)?;
        json_result(&page)
    }

    #[tool(
        name = "book_create",
        description = "Add a book. Fails if a book with the same title and author (ignoring case and surrounding whitespace) already exists.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn book_create(
        &self,
        Parameters(req): Parameters<McpCreateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let create_req = CreateBookRequest {
            title: req.title,
            author: req.author,
            year: req.year,
            read: req.read.unwrap_or(false),
        };
        let book = self
            .library
            .write()
            .await
            .create(create_req)
            .map_err(Self::to_mcp_error)?;
        json_result(&book)
    }

    #[tool(
        name = "book_get",
        description = "Show a single book by ID.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn book_get(
        &self,
        Parameters(req): Parameters<McpBookIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let book = self
            .library
            .read()
            .await
            .get(BookId::new(req.id))
            .map_err(Self::to_mcp_error)?;
        json_result(&book)
    }

    #[tool(
        name = "book_update",
        description = "Edit a book's title, author, year or read flag. Only specified fields are changed; the ID never changes.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn book_update(
        &self,
        Parameters(req): Parameters<McpUpdateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let update_req = UpdateBookRequest {
            title: req.title,
            author: req.author,
            year: req.year,
            read: req.read,
        };
        let book = self
            .library
            .write()
            .await
            .update(BookId::new(req.id), update_req)
            .map_err(Self::to_mcp_error)?;
        json_result(&book)
    }

    #[tool(
        name = "book_delete",
        description = "Delete a book by ID. IDs are never reused.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn book_delete(
        &self,
        Parameters(req): Parameters<McpBookIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.library
            .write()
            .await
            .delete(BookId::new(req.id))
            .map_err(Self::to_mcp_error)?;
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Deleted: {}",
            req.id
        ))]))
    }
}
