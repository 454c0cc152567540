//! Graph store abstraction
//!
//! A store hands out short-lived sessions; a session runs parameterized
//! Cypher and returns rows as JSON maps keyed by column alias.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::config::ConnectionSettings;
use crate::error::GraphError;

/// One result row: column alias to value
pub type ResultRow = Map<String, Value>;

/// A typed query parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    String(String),
    Integer(i64),
}

impl ParamValue {
    /// JSON rendering, used for schema defaults and logging
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::Integer(i) => Value::from(*i),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

/// A Cypher statement with its bound parameters and the columns to read back
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    text: String,
    params: BTreeMap<String, ParamValue>,
    columns: Vec<String>,
}

impl StoreQuery {
    /// Create a query with no parameters
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: BTreeMap::new(),
            columns: Vec::new(),
        }
    }

    /// Bind a parameter
    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Bind every parameter in `params`
    pub fn params(mut self, params: BTreeMap<String, ParamValue>) -> Self {
        self.params.extend(params);
        self
    }

    /// Declare a column the caller will read from each row
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bound_params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Names of the `$placeholders` referenced by the query text, in order of
    /// first appearance.
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut chars = self.text.char_indices().peekable();

        while let Some((_, c)) = chars.next() {
            if c != '$' {
                continue;
            }
            let mut name = String::new();
            while let Some(&(_, next)) = chars.peek() {
                let valid = next == '_'
                    || next.is_ascii_alphabetic()
                    || (!name.is_empty() && next.is_ascii_digit());
                if !valid {
                    break;
                }
                name.push(next);
                chars.next();
            }
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }

        names
    }

    /// Fail if any placeholder has no bound value
    pub fn ensure_bound(&self) -> Result<(), GraphError> {
        match self
            .placeholders()
            .into_iter()
            .find(|name| !self.params.contains_key(name))
        {
            Some(name) => Err(GraphError::UnboundParameter { name }),
            None => Ok(()),
        }
    }
}

/// A scoped execution context against one database
#[async_trait]
pub trait GraphSession: Send {
    /// Run one query and collect its rows in store order
    async fn run(&mut self, query: &StoreQuery) -> Result<Vec<ResultRow>, GraphError>;

    /// Release the session
    async fn close(self: Box<Self>);
}

/// A long-lived client handle able to open sessions
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Open a session on the configured database, or the store default
    async fn open_session(&self) -> Result<Box<dyn GraphSession>, GraphError>;

    /// Release the underlying driver resources
    async fn close(&self);
}

/// Builds a store from connection settings
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Arc<dyn GraphStore>, GraphError>;
}

/// Run a single query in a fresh session.
///
/// The session is closed before returning, whether or not the query succeeded.
pub async fn run_in_session(
    store: &dyn GraphStore,
    query: &StoreQuery,
) -> Result<Vec<ResultRow>, GraphError> {
    query.ensure_bound()?;

    let mut session = store.open_session().await?;
    let outcome = session.run(query).await;
    session.close().await;

    if let Err(e) = &outcome {
        tracing::debug!(error = %e, "Query failed, session released");
    }
    outcome
}
