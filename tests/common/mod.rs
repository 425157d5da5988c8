// Mock of the sqlresource web tier used by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use sqlbind::ConsoleConfig;

pub const BASE_PATH: &str = "/splice_web/webresources";

#[derive(Default)]
pub struct MockCluster {
    /// Decoded `query` parameters, in arrival order.
    pub queries: Mutex<Vec<String>>,
    /// Raw query strings, exactly as sent.
    pub raw_queries: Mutex<Vec<String>>,
    pub traced_requests: Mutex<Vec<String>>,
    /// Replies for the readiness sentinel; `[]` once drained.
    pub sentinel_replies: Mutex<VecDeque<Value>>,
    pub history: Mutex<Value>,
    pub statement_sql: Mutex<HashMap<String, String>>,
    pub plans: Mutex<HashMap<String, Value>>,
    pub region_stats: Mutex<Value>,
    /// When set, every request answers with this status.
    pub fail_with: Mutex<Option<u16>>,
}

impl MockCluster {
    pub fn new() -> Arc<Self> {
        let cluster = MockCluster::default();
        *cluster.history.lock().unwrap() = json!([]);
        *cluster.region_stats.lock().unwrap() = json!([]);
        Arc::new(cluster)
    }

    pub fn query_count_matching(&self, needle: &str) -> usize {
        self.queries.lock().unwrap().iter().filter(|q| q.contains(needle)).count()
    }

    pub fn request_count(&self) -> usize {
        self.queries.lock().unwrap().len() + self.traced_requests.lock().unwrap().len()
    }
}

fn forced_failure(cluster: &MockCluster) -> Option<axum::response::Response> {
    let status = (*cluster.fail_with.lock().unwrap())?;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Some((status, "mock failure").into_response())
}

async fn query2js(
    State(cluster): State<Arc<MockCluster>>,
    RawQuery(raw): RawQuery,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let sql = params.get("query").cloned().unwrap_or_default();
    cluster.queries.lock().unwrap().push(sql.clone());
    cluster.raw_queries.lock().unwrap().push(raw.unwrap_or_default());

    if let Some(response) = forced_failure(&cluster) {
        return response;
    }

    if sql.contains("SYS.SYSCONGLOMERATES") {
        let reply = cluster.sentinel_replies.lock().unwrap().pop_front().unwrap_or_else(|| json!([]));
        return Json(reply).into_response();
    }
    if sql.contains("SYSCS_GET_REGION_SERVER_STATS_INFO") {
        return Json(cluster.region_stats.lock().unwrap().clone()).into_response();
    }
    if let Some((_, id)) = sql.split_once("where STATEMENTID=") {
        let rows = match cluster.statement_sql.lock().unwrap().get(id) {
            Some(text) => json!([{ "STATEMENTSQL": text }]),
            None => json!([]),
        };
        return Json(rows).into_response();
    }
    if sql.contains("SYS.SYSSTATEMENTHISTORY") {
        return Json(cluster.history.lock().unwrap().clone()).into_response();
    }
    if sql == "select 'not json'" {
        return (StatusCode::OK, "<html>oops</html>").into_response();
    }

    (StatusCode::BAD_REQUEST, format!("unsupported query: {}", sql)).into_response()
}

async fn traced_statement(
    State(cluster): State<Arc<MockCluster>>,
    Path(statement_id): Path<String>,
) -> axum::response::Response {
    cluster.traced_requests.lock().unwrap().push(statement_id.clone());

    if let Some(response) = forced_failure(&cluster) {
        return response;
    }

    match cluster.plans.lock().unwrap().get(&statement_id) {
        Some(plan) => Json(plan.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "no such statement").into_response(),
    }
}

/// Starts the mock on an ephemeral port and returns its base URL.
pub async fn spawn(cluster: Arc<MockCluster>) -> String {
    let app = Router::new()
        .route(&format!("{}/sqlresource/query2js", BASE_PATH), get(query2js))
        .route(
            &format!("{}/sqlresource/tracedStatements/:statement_id", BASE_PATH),
            get(traced_statement),
        )
        .with_state(cluster);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn config_for(base_url: &str) -> ConsoleConfig {
    let mut config = ConsoleConfig::default();
    config.server.base_url = base_url.to_string();
    config.server.base_path = BASE_PATH.to_string();
    config.server.request_timeout_ms = 5_000;
    config.server.connect_timeout_ms = 1_000;
    config
}
