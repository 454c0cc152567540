//! MCP Server implementation
//!
//! Implements the Model Context Protocol server over newline-delimited
//! JSON-RPC on stdio.

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{McpError, Result};
use crate::mcp::tools::Dispatcher;
use crate::mcp::types::*;

/// MCP Server info
pub const SERVER_NAME: &str = "neo4j-mcp-ecommerce";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP Server for the e-commerce graph
pub struct McpServer {
    /// Tool dispatcher
    dispatcher: Dispatcher,

    /// Whether the client sent `notifications/initialized`
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server on stdio until stdin closes
    pub async fn run_stdio(&mut self) -> Result<()> {
        tracing::info!("{} server running on stdio", SERVER_NAME);
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve requests read line by line from `reader`, writing one response
    /// line per request to `writer`.
    pub async fn serve<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(&line).await {
                let mut response_str = serde_json::to_string(&response)?;
                response_str.push('\n');
                writer.write_all(response_str.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        tracing::info!("Input closed");
        Ok(())
    }

    /// Handle an incoming JSON-RPC message.
    ///
    /// Returns `None` for notifications.
    pub async fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(error = %e, "Unparsable message");
                return Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        let id = request.id.clone();
        let is_notification = id.is_none();

        let response = match request.method.as_str() {
            methods::INITIALIZE => JsonRpcResponse::success(id, self.handle_initialize()),
            methods::INITIALIZED => {
                self.initialized = true;
                tracing::debug!("Client initialized");
                return None;
            }
            methods::PING => JsonRpcResponse::success(id, json!({})),
            methods::LIST_TOOLS => JsonRpcResponse::success(id, self.handle_list_tools()),
            methods::CALL_TOOL => {
                let result = self.handle_call_tool(&request).await;
                JsonRpcResponse::success(id, to_value_or_error(&result))
            }
            _ => JsonRpcResponse::error(id, JsonRpcError::method_not_found(&request.method)),
        };

        if is_notification {
            None
        } else {
            Some(response)
        }
    }

    fn handle_initialize(&self) -> Value {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
            },
        };

        to_value_or_error(&result)
    }

    fn handle_list_tools(&self) -> Value {
        let result = ListToolsResult {
            tools: self.dispatcher.list_tools(),
        };

        to_value_or_error(&result)
    }

    async fn handle_call_tool(&self, request: &JsonRpcRequest) -> CallToolResult {
        let params: CallToolParams = match request.params.as_ref() {
            Some(p) => match serde_json::from_value(p.clone()) {
                Ok(params) => params,
                Err(e) => {
                    return CallToolResult::error(
                        McpError::InvalidParams {
                            message: e.to_string(),
                        }
                        .to_string(),
                    )
                }
            },
            None => return CallToolResult::error(McpError::MissingParams.to_string()),
        };

        self.dispatcher
            .call_tool(&params.name, params.arguments)
            .await
    }
}

fn to_value_or_error<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        json!({
            "content": [{"type": "text", "text": format!("Error: {}", e)}],
            "isError": true
        })
    })
}
