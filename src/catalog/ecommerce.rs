//! E-commerce tools over the Customer / Order / LineItem / Product graph.
//!
//! Graph shape:
//! `(:Customer)-[:PURCHASED]->(:Order)-[:CONTAINS]->(:LineItem)-[:PRODUCT]->(:Product)`

use serde::{Deserialize, Serialize};

use crate::catalog::schema::{FieldSpec, InputSchema};
use crate::catalog::{project_as, OperationDescriptor};

/// Recommendations returned when `limit` is not given
pub const DEFAULT_RECOMMENDATIONS: i64 = 5;

const SEARCH_CUSTOMER_QUERY: &str = "
MATCH (c:Customer)
WHERE toLower(c.name) CONTAINS toLower($q)
   OR toLower(c.email) CONTAINS toLower($q)
RETURN {
  id: id(c),
  nodeId: elementId(c),
  name: c.name,
  email: c.email
} AS customer
LIMIT 25
";

// Score is the raw number of co-purchase paths reaching the product.
// productId breaks ties so equal scores come back in a stable order.
const RECOMMEND_PRODUCT_QUERY: &str = "
MATCH (c:Customer {id: $customer_id})-[:PURCHASED]->(:Order)-[:CONTAINS]->(:LineItem)-[:PRODUCT]->(p:Product)
WITH DISTINCT c, p
MATCH (p)<-[:PRODUCT]-(:LineItem)<-[:CONTAINS]-(:Order)<-[:PURCHASED]-(other:Customer)
WHERE other <> c
MATCH (other)-[:PURCHASED]->(:Order)-[:CONTAINS]->(:LineItem)-[:PRODUCT]->(rec:Product)
WHERE NOT (c)-[:PURCHASED]->(:Order)-[:CONTAINS]->(:LineItem)-[:PRODUCT]->(rec)
RETURN {
  productId: rec.id,
  title: rec.title,
  score: count(*)
} AS recommendation
ORDER BY recommendation.score DESC, recommendation.productId ASC
LIMIT $limit
";

/// A customer matched by `search_customer`.
///
/// Node properties may be absent; they come back as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Internal numeric node id
    pub id: i64,

    /// Opaque element id
    pub node_id: String,

    pub name: Option<String>,

    pub email: Option<String>,
}

/// Product `id` property, passed through as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Text(String),
    Number(i64),
}

/// A product suggested by `recommend_product`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecommendation {
    pub product_id: Option<ProductId>,

    pub title: Option<String>,

    /// Number of co-purchase paths leading to the product
    pub score: i64,
}

pub fn search_customer() -> OperationDescriptor {
    OperationDescriptor {
        name: "search_customer",
        description: "Search for customers by name or email substring (case-insensitive)",
        input_schema: InputSchema::new(vec![FieldSpec::string(
            "q",
            "Search term to match against name or email",
        )]),
        query_template: SEARCH_CUSTOMER_QUERY,
        payload_column: "customer",
        project: project_as::<Customer>,
    }
}

pub fn recommend_product() -> OperationDescriptor {
    OperationDescriptor {
        name: "recommend_product",
        description: "Recommend products for a customer based on co-purchase behavior",
        input_schema: InputSchema::new(vec![
            FieldSpec::string(
                "customer_id",
                "The customer id property value (e.g., domain id), not elementId",
            ),
            FieldSpec::integer("limit", "Max number of recommendations")
                .with_default(DEFAULT_RECOMMENDATIONS)
                .with_minimum(1),
        ]),
        query_template: RECOMMEND_PRODUCT_QUERY,
        payload_column: "recommendation",
        project: project_as::<ProductRecommendation>,
    }
}
