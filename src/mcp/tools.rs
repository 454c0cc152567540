//! MCP tool dispatch
//!
//! Looks tools up in the catalog, validates their arguments, runs their query
//! and wraps the outcome in a [`CallToolResult`].

use std::sync::Arc;

use serde_json::Value;

use crate::catalog::Catalog;
use crate::error::{McpError, Result};
use crate::graph::{run_in_session, ConnectionManager};
use crate::mcp::types::{CallToolResult, Tool};

/// Tool dispatcher
pub struct Dispatcher {
    catalog: Arc<Catalog>,
    connections: Arc<ConnectionManager>,
}

impl Dispatcher {
    /// Create a new dispatcher
    pub fn new(catalog: Arc<Catalog>, connections: Arc<ConnectionManager>) -> Self {
        Self {
            catalog,
            connections,
        }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        list_tools(&self.catalog)
    }

    /// Call a tool by name.
    ///
    /// Never fails: errors come back as an envelope with `is_error` set.
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        tracing::debug!(tool = name, "Tool call received");

        let records = match self.execute(name, args).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool call failed");
                return CallToolResult::error(e.to_string());
            }
        };

        match serde_json::to_string_pretty(&records) {
            Ok(text) => {
                tracing::debug!(tool = name, records = records.len(), "Tool call succeeded");
                CallToolResult::text(text)
            }
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }

    async fn execute(&self, name: &str, args: Value) -> Result<Vec<Value>> {
        let operation = self.catalog.get(name).ok_or_else(|| McpError::UnknownTool {
            name: name.to_string(),
        })?;

        let params = operation.input_schema.coerce(&args)?;
        let query = operation.build_query(params);

        let store = self.connections.client().await?;
        let rows = run_in_session(store.as_ref(), &query).await?;
        tracing::debug!(tool = name, rows = rows.len(), "Query executed");

        Ok(operation.shape(rows)?)
    }
}

/// Tool definitions for every catalog entry
pub fn list_tools(catalog: &Catalog) -> Vec<Tool> {
    catalog
        .iter()
        .map(|op| Tool {
            name: op.name.to_string(),
            description: Some(op.description.to_string()),
            input_schema: op.input_schema.to_json_schema(),
        })
        .collect()
}
