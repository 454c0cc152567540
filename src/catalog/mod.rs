//! Query catalog
//!
//! The fixed set of tools the server exposes. Each [`OperationDescriptor`]
//! pairs an input schema with a Cypher template and the rule for turning the
//! returned rows into output records.

pub mod ecommerce;
pub mod schema;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ShapeError;
use crate::graph::{ParamValue, ResultRow, StoreQuery};

pub use ecommerce::{Customer, ProductId, ProductRecommendation};
pub use schema::{FieldKind, FieldSpec, InputSchema};

/// Converts one payload value into an output record
pub type Projection = fn(Value) -> Result<Value, serde_json::Error>;

/// Project a payload through the typed record `T`, keeping only its fields.
pub fn project_as<T>(payload: Value) -> Result<Value, serde_json::Error>
where
    T: DeserializeOwned + Serialize,
{
    let record: T = serde_json::from_value(payload)?;
    serde_json::to_value(record)
}

/// Static definition of one tool
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: InputSchema,
    pub query_template: &'static str,
    /// Column each row carries its record in
    pub payload_column: &'static str,
    pub project: Projection,
}

impl OperationDescriptor {
    /// Bind coerced arguments to the template
    pub fn build_query(&self, params: BTreeMap<String, ParamValue>) -> StoreQuery {
        StoreQuery::new(self.query_template)
            .params(params)
            .column(self.payload_column)
    }

    /// Turn rows into output records, preserving row order
    pub fn shape(&self, rows: Vec<ResultRow>) -> Result<Vec<Value>, ShapeError> {
        rows.into_iter()
            .map(|mut row| {
                let payload =
                    row.remove(self.payload_column)
                        .ok_or_else(|| ShapeError::MissingColumn {
                            column: self.payload_column.to_string(),
                        })?;
                (self.project)(payload).map_err(|source| ShapeError::Mismatch {
                    column: self.payload_column.to_string(),
                    source,
                })
            })
            .collect()
    }
}

/// The set of tools, looked up by name
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    operations: Vec<OperationDescriptor>,
}

impl Catalog {
    /// Build a catalog. Later descriptors with an already used name are dropped.
    pub fn new(operations: Vec<OperationDescriptor>) -> Self {
        let mut unique: Vec<OperationDescriptor> = Vec::with_capacity(operations.len());
        for op in operations {
            if unique.iter().any(|existing| existing.name == op.name) {
                tracing::warn!(tool = op.name, "Duplicate tool name ignored");
                continue;
            }
            unique.push(op);
        }
        Self { operations: unique }
    }

    /// The customer search and product recommendation tools
    pub fn ecommerce() -> Self {
        Self::new(vec![ecommerce::search_customer(), ecommerce::recommend_product()])
    }

    pub fn get(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
