//! Connection manager
//!
//! Creates the graph client on first use and hands out the same handle to
//! every later caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::{layered_source, SettingsOverrides, SettingsSource};
use crate::error::Result;
use crate::graph::neo4j::Neo4jConnector;
use crate::graph::store::{Connector, GraphStore};

/// Owns the process-wide graph client
pub struct ConnectionManager {
    /// Consulted once, when the client is first created
    source: SettingsSource,

    connector: Arc<dyn Connector>,

    /// Held across creation so concurrent first callers share one client
    client: Mutex<Option<Arc<dyn GraphStore>>>,

    /// Number of `client()` calls, for diagnostics
    requests: AtomicUsize,
}

impl ConnectionManager {
    /// Create a manager with an explicit settings source and connector
    pub fn new(source: SettingsSource, connector: Arc<dyn Connector>) -> Self {
        Self {
            source,
            connector,
            client: Mutex::new(None),
            requests: AtomicUsize::new(0),
        }
    }

    /// Create a Neo4j manager reading overrides first, then the environment
    pub fn neo4j(overrides: SettingsOverrides) -> Self {
        Self::new(layered_source(overrides), Arc::new(Neo4jConnector))
    }

    /// Get the client, creating it on first use.
    ///
    /// A failed attempt leaves nothing behind, so the next call reads the
    /// settings again.
    pub async fn client(&self) -> Result<Arc<dyn GraphStore>> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let settings = (self.source)()?;
        tracing::debug!(?settings, "Creating graph client");
        let client = self.connector.connect(&settings).await?;
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Release the client if one was created.
    ///
    /// Must not be called while a query is in flight. The next `client()`
    /// call builds a fresh client from freshly read settings.
    pub async fn close(&self) {
        let client = self.client.lock().await.take();
        if let Some(client) = client {
            client.close().await;
        }
    }

    /// Whether a client currently exists
    pub async fn is_connected(&self) -> bool {
        self.client.lock().await.is_some()
    }

    /// How many times `client()` has been called
    pub fn client_requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}
