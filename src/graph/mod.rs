//! Graph store access
//!
//! The store traits, the `neo4rs` implementation, and the connection manager
//! that owns the process-wide client handle.

pub mod connection;
pub mod neo4j;
pub mod store;

pub use connection::ConnectionManager;
pub use neo4j::{Neo4jConnector, Neo4jStore};
pub use store::{run_in_session, Connector, GraphSession, GraphStore, ParamValue, ResultRow, StoreQuery};
