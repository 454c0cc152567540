//! Neo4j MCP Server Library
//!
//! A Model Context Protocol (MCP) server over a Neo4j e-commerce graph.
//! Provides tools for searching customers and recommending products from
//! co-purchase behavior.

pub mod catalog;
pub mod config;
pub mod error;
pub mod graph;
pub mod mcp;

pub use catalog::Catalog;
pub use config::{ConnectionSettings, SettingsOverrides};
pub use error::{Result, ServerError};
pub use graph::ConnectionManager;
pub use mcp::{Dispatcher, McpServer};
