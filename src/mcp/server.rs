use std::future::Future;
use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorCode, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler};
use serde_json::{Map, Value};

use crate::error::FaersError;
use crate::mcp::catalog;
use crate::mcp::dispatch::{ToolCall, dispatch};
use crate::render::json::to_pretty;
use crate::sources::api_key::ApiKeyProvider;
use crate::sources::openfda::OpenFdaClient;

const INSTRUCTIONS: &str = "Read-only access to FDA adverse event reports (FAERS), drug labels, \
and drug recalls via openFDA. Start with get_safety_summary for a quick overview of a drug, or \
get_data_info for data limitations and code meanings. FAERS reports do not establish that a \
drug caused an event.";

#[derive(Clone)]
pub struct FaersServer {
    client: Arc<OpenFdaClient>,
}

impl std::fmt::Debug for FaersServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaersServer").finish_non_exhaustive()
    }
}

impl FaersServer {
    /// Server backed by the public openFDA API, honoring `OPENFDA_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, FaersError> {
        Ok(Self {
            client: Arc::new(OpenFdaClient::new()?),
        })
    }

    /// Server pointed at an alternate openFDA base URL.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn with_openfda_base(
        base: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, FaersError> {
        Ok(Self {
            client: Arc::new(OpenFdaClient::with_base(
                base,
                ApiKeyProvider::fixed(api_key),
            )?),
        })
    }

    /// Invokes a tool by its RPC name and returns the JSON result.
    ///
    /// # Errors
    ///
    /// Returns [`FaersError::UnknownTool`] for names outside the catalog,
    /// [`FaersError::InvalidArgument`] for bad arguments, and upstream or
    /// transport errors from the openFDA request.
    pub async fn invoke(
        &self,
        name: &str,
        args: Option<Map<String, Value>>,
    ) -> Result<Value, FaersError> {
        let call = match ToolCall::parse(name, args) {
            Ok(call) => call,
            Err(err) => {
                tracing::info!(tool = name, outcome = "rejected", error = %err, "tool call");
                return Err(err);
            }
        };
        dispatch(&self.client, call).await
    }
}

fn to_call_result(result: Result<Value, FaersError>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => {
            let text = to_pretty(&value)
                .map_err(|e| McpError::internal_error(format!("Error: {e}"), None))?;
            Ok(CallToolResult::success(vec![Content::text(text)]))
        }
        Err(err @ FaersError::UnknownTool(_)) => Err(McpError::new(
            ErrorCode::METHOD_NOT_FOUND,
            err.to_string(),
            None,
        )),
        Err(err) if err.is_client_fault() => Err(McpError::invalid_params(err.to_string(), None)),
        Err(err) => Ok(CallToolResult::error(vec![Content::text(format!(
            "Error: {err}"
        ))])),
    }
}

impl ServerHandler for FaersServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "faers-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("FAERS MCP".to_string()),
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(catalog::rmcp_tools())))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let result = self.invoke(&request.name, request.arguments).await;
            to_call_result(result)
        }
    }
}
