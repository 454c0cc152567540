//! Integration tests for the Neo4j MCP Server
//!
//! These tests drive the MCP protocol end to end against an in-memory graph
//! that answers the catalog's two queries. No Neo4j instance is needed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use neo4j_mcp_ecommerce::catalog::Catalog;
use neo4j_mcp_ecommerce::config::{ConnectionSettings, SettingsSource};
use neo4j_mcp_ecommerce::error::{ConfigError, GraphError};
use neo4j_mcp_ecommerce::graph::{
    ConnectionManager, Connector, GraphSession, GraphStore, ParamValue, ResultRow, StoreQuery,
};
use neo4j_mcp_ecommerce::mcp::{Dispatcher, McpServer};

/// Helper to create a JSON-RPC request
fn make_request(id: i64, method: &str, params: Option<Value>) -> String {
    let mut request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if let Some(p) = params {
        request["params"] = p;
    }
    request.to_string()
}

fn call_tool_request(id: i64, name: &str, arguments: Value) -> String {
    make_request(
        id,
        "tools/call",
        Some(json!({"name": name, "arguments": arguments})),
    )
}

// ==================== In-memory graph ====================

struct CustomerNode {
    node: i64,
    id: String,
    name: String,
    email: String,
}

/// Customers plus one purchase event per (customer, order line item, product)
#[derive(Default)]
struct ShopGraph {
    customers: Vec<CustomerNode>,
    products: BTreeMap<String, String>,
    purchases: Vec<(String, String)>,
}

impl ShopGraph {
    fn customer(mut self, id: &str, name: &str, email: &str) -> Self {
        let node = self.customers.len() as i64;
        self.customers.push(CustomerNode {
            node,
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
        });
        self
    }

    fn product(mut self, id: &str, title: &str) -> Self {
        self.products.insert(id.to_string(), title.to_string());
        self
    }

    fn bought(mut self, customer: &str, products: &[&str]) -> Self {
        for p in products {
            self.purchases.push((customer.to_string(), p.to_string()));
        }
        self
    }

    fn search(&self, q: &str) -> Vec<ResultRow> {
        let q = q.to_lowercase();
        self.customers
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&q) || c.email.to_lowercase().contains(&q))
            .take(25)
            .map(|c| {
                row(
                    "customer",
                    json!({
                        "id": c.node,
                        "nodeId": format!("4:shop:{}", c.node),
                        "name": c.name,
                        "email": c.email
                    }),
                )
            })
            .collect()
    }

    fn recommend(&self, customer_id: &str, limit: i64) -> Vec<ResultRow> {
        if !self.customers.iter().any(|c| c.id == customer_id) {
            return Vec::new();
        }

        let bought_by = |customer: &str| -> Vec<&String> {
            self.purchases
                .iter()
                .filter(|(c, _)| c == customer)
                .map(|(_, p)| p)
                .collect()
        };

        let owned: BTreeSet<&String> = bought_by(customer_id).into_iter().collect();
        let mut scores: BTreeMap<&String, i64> = BTreeMap::new();

        for product in &owned {
            for (other, _) in self
                .purchases
                .iter()
                .filter(|(c, p)| p == *product && c != customer_id)
            {
                for rec in bought_by(other.as_str()) {
                    if !owned.contains(rec) {
                        *scores.entry(rec).or_default() += 1;
                    }
                }
            }
        }

        let mut ranked: Vec<(&String, i64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(id, score)| {
                row(
                    "recommendation",
                    json!({"productId": id, "title": self.products[id], "score": score}),
                )
            })
            .collect()
    }
}

fn row(column: &str, value: Value) -> ResultRow {
    let mut row = ResultRow::new();
    row.insert(column.to_string(), value);
    row
}

fn string_param(query: &StoreQuery, name: &str) -> String {
    match &query.bound_params()[name] {
        ParamValue::String(s) => s.clone(),
        other => panic!("{} should be a string, got {:?}", name, other),
    }
}

fn integer_param(query: &StoreQuery, name: &str) -> i64 {
    match &query.bound_params()[name] {
        ParamValue::Integer(i) => *i,
        other => panic!("{} should be an integer, got {:?}", name, other),
    }
}

struct MemoryStore {
    graph: ShopGraph,
    fail_queries: AtomicBool,
    queries: Mutex<Vec<StoreQuery>>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl MemoryStore {
    fn new(graph: ShopGraph) -> Arc<Self> {
        Arc::new(Self {
            graph,
            fail_queries: AtomicBool::new(false),
            queries: Mutex::new(Vec::new()),
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
        })
    }
}

struct MemorySession {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl GraphSession for MemorySession {
    async fn run(&mut self, query: &StoreQuery) -> Result<Vec<ResultRow>, GraphError> {
        self.store.queries.lock().unwrap().push(query.clone());
        if self.store.fail_queries.load(Ordering::SeqCst) {
            return Err(GraphError::Query(
                "Neo.TransientError.General.DatabaseUnavailable".to_string(),
            ));
        }

        let graph = &self.store.graph;
        match query.columns().first().map(String::as_str) {
            Some("customer") => Ok(graph.search(&string_param(query, "q"))),
            Some("recommendation") => Ok(graph.recommend(
                &string_param(query, "customer_id"),
                integer_param(query, "limit"),
            )),
            other => Err(GraphError::Query(format!("unexpected columns {:?}", other))),
        }
    }

    async fn close(self: Box<Self>) {
        self.store.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct MemoryHandle(Arc<MemoryStore>);

#[async_trait]
impl GraphStore for MemoryHandle {
    async fn open_session(&self) -> Result<Box<dyn GraphSession>, GraphError> {
        self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            store: self.0.clone(),
        }))
    }

    async fn close(&self) {}
}

struct MemoryConnector(Arc<MemoryStore>);

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _settings: &ConnectionSettings) -> Result<Arc<dyn GraphStore>, GraphError> {
        Ok(Arc::new(MemoryHandle(self.0.clone())))
    }
}

fn settings() -> ConnectionSettings {
    ConnectionSettings {
        uri: "neo4j://localhost:7687".to_string(),
        username: "neo4j".to_string(),
        password: "secret".to_string(),
        database: None,
    }
}

fn configured() -> SettingsSource {
    Arc::new(|| Ok(settings()))
}

struct Harness {
    server: McpServer,
    store: Arc<MemoryStore>,
    connections: Arc<ConnectionManager>,
}

fn harness_with_source(graph: ShopGraph, source: SettingsSource) -> Harness {
    let store = MemoryStore::new(graph);
    let connections = Arc::new(ConnectionManager::new(
        source,
        Arc::new(MemoryConnector(store.clone())),
    ));
    let dispatcher = Dispatcher::new(Arc::new(Catalog::ecommerce()), connections.clone());
    Harness {
        server: McpServer::new(dispatcher),
        store,
        connections,
    }
}

fn harness(graph: ShopGraph) -> Harness {
    harness_with_source(graph, configured())
}

/// Customers c1..c4 and their purchases
fn shop() -> ShopGraph {
    ShopGraph::default()
        .customer("c1", "Ada Lovelace", "ada@example.com")
        .customer("c2", "Alan Turing", "alan@bletchley.org")
        .customer("c3", "Grace Hopper", "grace@navy.mil")
        .customer("c4", "Edsger Dijkstra", "EWD@utexas.edu")
        .product("p1", "Tea")
        .product("p2", "Mug")
        .product("p3", "Kettle")
        .product("p4", "Biscuits")
        .product("p5", "Teapot")
        .bought("c1", &["p1", "p2"])
        .bought("c2", &["p1", "p3", "p4"])
        .bought("c3", &["p1", "p2", "p3", "p5"])
        .bought("c4", &["p4"])
}

impl Harness {
    async fn send(&mut self, message: String) -> Value {
        let response = self
            .server
            .handle_message(&message)
            .await
            .expect("request should get a response");
        serde_json::to_value(response).unwrap()
    }

    /// Call a tool and return (records or error text, isError)
    async fn call(&mut self, name: &str, arguments: Value) -> (Value, bool) {
        let response = self.send(call_tool_request(1, name, arguments)).await;
        let result = &response["result"];
        let is_error = result["isError"].as_bool().unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        let payload = if is_error {
            Value::String(text.to_string())
        } else {
            serde_json::from_str(text).unwrap()
        };
        (payload, is_error)
    }
}

mod mcp_protocol_tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize() {
        let mut h = harness(shop());
        let response = h
            .send(make_request(
                1,
                "initialize",
                Some(json!({
                    "protocolVersion": "2024-11-05",
                    "clientInfo": {"name": "test-client", "version": "1.0.0"},
                    "capabilities": {}
                })),
            ))
            .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["serverInfo"]["name"], "neo4j-mcp-ecommerce");
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_initialized_notification_has_no_response() {
        let mut h = harness(shop());
        let response = h
            .server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;

        assert!(response.is_none());
        assert!(h.server.is_initialized());
    }

    #[tokio::test]
    async fn test_list_tools() {
        let mut h = harness(shop());
        let response = h.send(make_request(2, "tools/list", None)).await;
        let tools = response["result"]["tools"].as_array().unwrap();

        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["name"], "search_customer");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["q"]));
        assert_eq!(tools[1]["name"], "recommend_product");
        assert_eq!(tools[1]["inputSchema"]["properties"]["limit"]["default"], 5);
        assert_eq!(h.connections.client_requests(), 0);
    }

    #[tokio::test]
    async fn test_ping() {
        let mut h = harness(shop());
        let response = h.send(make_request(3, "ping", None)).await;
        assert_eq!(response["result"], json!({}));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let mut h = harness(shop());
        let response = h.send(make_request(4, "resources/list", None)).await;
        assert_eq!(response["error"]["code"], -32601);
        assert!(response["result"].is_null());
    }

    #[tokio::test]
    async fn test_parse_error() {
        let mut h = harness(shop());
        let response = h.send("{not json".to_string()).await;
        assert_eq!(response["error"]["code"], -32700);
        assert!(response["id"].is_null());
    }

    #[tokio::test]
    async fn test_call_without_params() {
        let mut h = harness(shop());
        let response = h.send(make_request(5, "tools/call", None)).await;
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(response["result"]["content"][0]["text"], "Error: Missing tool parameters");
    }

    #[tokio::test]
    async fn test_serve_over_byte_streams() {
        let mut h = harness(shop());
        let input = format!(
            "{}\n\n{}\n{}\n",
            make_request(1, "initialize", Some(json!({}))),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            call_tool_request(2, "search_customer", json!({"q": "grace"})),
        );
        let mut output: Vec<u8> = Vec::new();

        h.server.serve(input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["id"], 2);
        let text = lines[1]["result"]["content"][0]["text"].as_str().unwrap();
        let customers: Value = serde_json::from_str(text).unwrap();
        assert_eq!(customers[0]["name"], "Grace Hopper");
    }
}

mod search_customer_tests {
    use super::*;

    #[tokio::test]
    async fn test_matches_are_case_insensitive_substrings() {
        let mut h = harness(shop());
        let (customers, is_error) = h.call("search_customer", json!({"q": "AL"})).await;

        assert!(!is_error);
        let customers = customers.as_array().unwrap();
        assert!(!customers.is_empty());
        for c in customers {
            let name = c["name"].as_str().unwrap().to_lowercase();
            let email = c["email"].as_str().unwrap().to_lowercase();
            assert!(name.contains("al") || email.contains("al"));
        }
    }

    #[tokio::test]
    async fn test_output_fields() {
        let mut h = harness(shop());
        let (customers, _) = h.call("search_customer", json!({"q": "ewd@"})).await;

        assert_eq!(
            customers,
            json!([{
                "id": 3,
                "nodeId": "4:shop:3",
                "name": "Edsger Dijkstra",
                "email": "EWD@utexas.edu"
            }])
        );
    }

    #[tokio::test]
    async fn test_empty_term_returns_at_most_25() {
        let mut graph = ShopGraph::default();
        for i in 0..30 {
            graph = graph.customer(&format!("c{}", i), &format!("Customer {}", i), &format!("c{}@example.com", i));
        }
        let mut h = harness(graph);

        let (customers, is_error) = h.call("search_customer", json!({"q": ""})).await;

        assert!(!is_error);
        assert_eq!(customers.as_array().unwrap().len(), 25);
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let mut h = harness(shop());
        let (customers, is_error) = h.call("search_customer", json!({"q": "zzz-nobody"})).await;

        assert!(!is_error);
        assert_eq!(customers, json!([]));
    }

    #[tokio::test]
    async fn test_missing_q_is_argument_error() {
        let mut h = harness(shop());
        let (message, is_error) = h.call("search_customer", json!({})).await;

        assert!(is_error);
        assert_eq!(message, "Error: Invalid arguments: missing required field: q");
        assert_eq!(h.connections.client_requests(), 0);
    }
}

mod recommend_product_tests {
    use super::*;

    fn product_ids(records: &Value) -> Vec<String> {
        records
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["productId"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_never_recommends_owned_products() {
        let mut h = harness(shop());
        let (recs, is_error) = h
            .call("recommend_product", json!({"customer_id": "c1", "limit": 10}))
            .await;

        assert!(!is_error);
        let ids = product_ids(&recs);
        assert!(!ids.is_empty());
        assert!(!ids.contains(&"p1".to_string()));
        assert!(!ids.contains(&"p2".to_string()));
    }

    #[tokio::test]
    async fn test_scores_descending() {
        let mut h = harness(shop());
        let (recs, _) = h
            .call("recommend_product", json!({"customer_id": "c1", "limit": 10}))
            .await;

        // c2 and c3 reach p3 via p1, c3 again via p2: 3 paths
        assert_eq!(recs[0], json!({"productId": "p3", "title": "Kettle", "score": 3}));
        let scores: Vec<i64> = recs
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["score"].as_i64().unwrap())
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn test_limit_defaults_to_five_and_truncates() {
        let mut h = harness(shop());
        h.call("recommend_product", json!({"customer_id": "c1"})).await;
        {
            let queries = h.store.queries.lock().unwrap();
            assert_eq!(queries[0].bound_params()["limit"], ParamValue::Integer(5));
        }

        let (recs, _) = h
            .call("recommend_product", json!({"customer_id": "c1", "limit": 1}))
            .await;
        assert_eq!(recs.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_positive_limit_is_clamped() {
        let mut h = harness(shop());
        let (recs, is_error) = h
            .call("recommend_product", json!({"customer_id": "c1", "limit": 0}))
            .await;

        assert!(!is_error);
        assert_eq!(recs.as_array().unwrap().len(), 1);
        let queries = h.store.queries.lock().unwrap();
        assert_eq!(queries[0].bound_params()["limit"], ParamValue::Integer(1));
    }

    #[tokio::test]
    async fn test_unknown_customer_is_empty() {
        let mut h = harness(shop());
        let (recs, is_error) = h
            .call("recommend_product", json!({"customer_id": "c999"}))
            .await;

        assert!(!is_error);
        assert_eq!(recs, json!([]));
    }

    #[tokio::test]
    async fn test_wrong_argument_type() {
        let mut h = harness(shop());
        let (message, is_error) = h
            .call("recommend_product", json!({"customer_id": "c1", "limit": "ten"}))
            .await;

        assert!(is_error);
        assert_eq!(message, "Error: Invalid arguments: field limit must be an integer");
    }
}

mod dispatch_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_tool_never_reaches_connection_manager() {
        let mut h = harness(shop());
        let (message, is_error) = h.call("delete_everything", json!({})).await;

        assert!(is_error);
        assert_eq!(message, "Error: Unknown tool: delete_everything");
        assert_eq!(h.connections.client_requests(), 0);
        assert!(!h.connections.is_connected().await);
    }

    #[tokio::test]
    async fn test_every_session_is_closed() {
        let mut h = harness(shop());
        h.call("search_customer", json!({"q": "a"})).await;
        h.call("recommend_product", json!({"customer_id": "c2"})).await;

        h.store.fail_queries.store(true, Ordering::SeqCst);
        let (message, is_error) = h.call("search_customer", json!({"q": "a"})).await;
        assert!(is_error);
        assert_eq!(message, "Error: Neo.TransientError.General.DatabaseUnavailable");

        assert_eq!(h.store.opened.load(Ordering::SeqCst), 3);
        assert_eq!(h.store.closed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_created_once_across_calls() {
        let mut h = harness(shop());
        h.call("search_customer", json!({"q": "a"})).await;
        h.call("search_customer", json!({"q": "b"})).await;

        assert_eq!(h.connections.client_requests(), 2);
        assert!(h.connections.is_connected().await);
    }

    #[tokio::test]
    async fn test_missing_configuration_then_recovery() {
        let configured = Arc::new(AtomicBool::new(false));
        let flag = configured.clone();
        let source: SettingsSource = Arc::new(move || {
            if flag.load(Ordering::SeqCst) {
                Ok(settings())
            } else {
                Err(ConfigError::MissingEnvVar {
                    var: "NEO4J_PASSWORD".to_string(),
                })
            }
        });
        let mut h = harness_with_source(shop(), source);

        let (message, is_error) = h.call("search_customer", json!({"q": "ada"})).await;
        assert!(is_error);
        assert_eq!(message, "Error: Environment variable NEO4J_PASSWORD is required");
        assert_eq!(h.store.opened.load(Ordering::SeqCst), 0);

        configured.store(true, Ordering::SeqCst);
        h.connections.close().await;

        let (customers, is_error) = h.call("search_customer", json!({"q": "ada"})).await;
        assert!(!is_error);
        assert_eq!(customers[0]["name"], "Ada Lovelace");
    }
}
