//! Neo4j implementation of the graph store, built on `neo4rs`.

use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query};
use serde_json::Value;

use crate::config::ConnectionSettings;
use crate::error::GraphError;
use crate::graph::store::{Connector, GraphSession, GraphStore, ParamValue, ResultRow, StoreQuery};

/// Creates [`Neo4jStore`] handles
#[derive(Debug, Clone, Default)]
pub struct Neo4jConnector;

#[async_trait]
impl Connector for Neo4jConnector {
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Arc<dyn GraphStore>, GraphError> {
        let store = Neo4jStore::connect(settings).await?;
        Ok(Arc::new(store))
    }
}

/// Neo4j client handle.
///
/// Clone is cheap; the driver pool is shared.
#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
    database: Option<String>,
}

impl Neo4jStore {
    /// Build the driver from settings.
    ///
    /// Connections are pooled and checked out per query, so an unreachable
    /// server surfaces as a query error rather than here.
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self, GraphError> {
        let config = ConfigBuilder::default()
            .uri(&settings.uri)
            .user(&settings.username)
            .password(&settings.password)
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %settings.uri, database = ?settings.database, "Neo4j client created");
        Ok(Self {
            graph,
            database: settings.database.clone(),
        })
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn open_session(&self) -> Result<Box<dyn GraphSession>, GraphError> {
        Ok(Box::new(Neo4jSession {
            graph: self.graph.clone(),
            database: self.database.clone(),
        }))
    }

    // Pooled connections are released when the last clone of `graph` drops,
    // which happens once the connection manager lets go of this store.
    async fn close(&self) {
        tracing::info!("Neo4j client closed");
    }
}

/// A session bound to one database
struct Neo4jSession {
    graph: Graph,
    database: Option<String>,
}

#[async_trait]
impl GraphSession for Neo4jSession {
    async fn run(&mut self, query: &StoreQuery) -> Result<Vec<ResultRow>, GraphError> {
        let q = to_bolt_query(query);

        let mut stream = match self.database.as_deref() {
            Some(db) => self.graph.execute_on(db, q).await?,
            None => self.graph.execute(q).await?,
        };

        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            let mut out = ResultRow::new();
            for column in query.columns() {
                let value: Value = row.get(column).map_err(|e| GraphError::Row {
                    column: column.clone(),
                    message: e.to_string(),
                })?;
                out.insert(column.clone(), value);
            }
            rows.push(out);
        }
        Ok(rows)
    }

    async fn close(self: Box<Self>) {
        tracing::trace!(database = ?self.database, "Session released");
    }
}

fn to_bolt_query(query: &StoreQuery) -> Query {
    query
        .bound_params()
        .iter()
        .fold(neo4rs::query(query.text()), |q, (name, value)| match value {
            ParamValue::String(s) => q.param(name, s.clone()),
            ParamValue::Integer(i) => q.param(name, *i),
        })
}
