//! Error types for the Neo4j MCP Server
//!
//! This module defines the error hierarchy for all operations in the server.
//! Every variant that can occur during a tool call is caught by the dispatcher
//! and turned into an error envelope.

use thiserror::Error;

/// Main error type for the Neo4j MCP Server
#[derive(Error, Debug)]
pub enum ServerError {
    /// Connection settings errors
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Tool argument errors
    #[error("Invalid arguments: {0}")]
    Argument(#[from] ArgumentError),

    /// Graph store errors
    #[error("{0}")]
    Graph(#[from] GraphError),

    /// Result projection errors
    #[error("Unexpected query result: {0}")]
    Shape(#[from] ShapeError),

    /// MCP protocol errors
    #[error("{0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Connection settings errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {var} is required")]
    MissingEnvVar { var: String },

    #[error("Could not load {path}: {message}")]
    EnvFile { path: String, message: String },
}

/// Errors raised while coercing raw tool arguments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("arguments must be a JSON object")]
    NotAnObject,

    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("field {field} must be {expected}")]
    InvalidType { field: String, expected: &'static str },
}

/// Graph store errors
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("{0}")]
    Connection(String),

    /// Driver error, message forwarded verbatim
    #[error("{0}")]
    Query(String),

    #[error("query parameter ${name} is not bound")]
    UnboundParameter { name: String },

    #[error("column {column} could not be decoded: {message}")]
    Row { column: String, message: String },
}

impl From<neo4rs::Error> for GraphError {
    fn from(err: neo4rs::Error) -> Self {
        GraphError::Query(err.to_string())
    }
}

/// Errors raised while projecting result rows into output records
#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("row has no column {column}")]
    MissingColumn { column: String },

    #[error("column {column} does not match the output record: {source}")]
    Mismatch {
        column: String,
        #[source]
        source: serde_json::Error,
    },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid tool parameters: {message}")]
    InvalidParams { message: String },

    #[error("Missing tool parameters")]
    MissingParams,
}

/// Result type alias for Neo4j MCP operations
pub type Result<T> = std::result::Result<T, ServerError>;
