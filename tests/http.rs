//! Router tests against an in-memory statement executor.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use openape::config::{parse_openapi, resolve_openapi};
use openape::sql::QueryBuf;
use openape::{app_router, AppError, AppState, StatementExecutor};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const API_DOC: &str = r#"
openapi: 3.0.0
paths:
  /pets:
    get: {}
    post: {}
  /pets/{id}:
    get: {}
    delete: {}
components:
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        name:
          type: string
        age:
          type: integer
"#;

/// Records every statement; selects return `rows`, everything else reports `affected`.
struct MemoryExecutor {
    statements: Mutex<Vec<QueryBuf>>,
    rows: Vec<Value>,
    affected: u64,
}

impl MemoryExecutor {
    fn new(rows: Vec<Value>, affected: u64) -> Arc<Self> {
        Arc::new(Self {
            statements: Mutex::new(Vec::new()),
            rows,
            affected,
        })
    }

    fn sql(&self) -> Vec<String> {
        self.statements.lock().unwrap().iter().map(|q| q.sql.clone()).collect()
    }
}

#[async_trait]
impl StatementExecutor for MemoryExecutor {
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        self.statements.lock().unwrap().push(q.clone());
        if q.sql.starts_with("SELECT users.api_key") {
            return Ok(if q.params == vec![json!("secret")] {
                vec![json!({"api_key": "secret"})]
            } else {
                vec![]
            });
        }
        Ok(self.rows.clone())
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        self.statements.lock().unwrap().push(q.clone());
        Ok(self.affected)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

fn app(executor: Arc<MemoryExecutor>, auth: bool) -> Router {
    let catalog = resolve_openapi(&parse_openapi(API_DOC, false).unwrap()).unwrap();
    let state = AppState::new(executor, catalog).with_auth(auth);
    app_router(state, "/api/v1")
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_and_ready() {
    let exec = MemoryExecutor::new(vec![], 0);
    let (status, body) = send(app(exec.clone(), false), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
    let (status, body) = send(app(exec, false), get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models"], json!(1));
}

#[tokio::test]
async fn list_compiles_filters_and_limit() {
    let exec = MemoryExecutor::new(vec![json!({"id": "p1", "name": "Rex"})], 0);
    let (status, body) = send(app(exec.clone(), false), get("/api/v1/pets?age=3&limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["count"], json!(1));
    assert_eq!(body["data"][0]["name"], json!("Rex"));
    assert_eq!(
        exec.sql(),
        vec!["SELECT * FROM pet WHERE age = $1::integer LIMIT 2;".to_string()]
    );
}

#[tokio::test]
async fn unknown_path_and_filter() {
    let exec = MemoryExecutor::new(vec![], 0);
    let (status, _) = send(app(exec.clone(), false), get("/api/v1/owners")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(app(exec.clone(), false), get("/api/v1/pets?color=brown")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("validation_error"));
    assert!(exec.sql().is_empty());
}

#[tokio::test]
async fn create_inserts_then_reads_back() {
    let exec = MemoryExecutor::new(vec![json!({"id": "generated", "name": "Rex"})], 1);
    let (status, body) = send(
        app(exec.clone(), false),
        json_request("POST", "/api/v1/pets", json!({"name": "Rex", "age": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], json!("Rex"));
    let stmts = exec.statements.lock().unwrap().clone();
    assert_eq!(stmts.len(), 2);
    assert_eq!(
        stmts[0].sql,
        "INSERT INTO pet (id, age, name, created_at, updated_at) VALUES ($1::varchar, $2::integer, $3::varchar, NOW(), NOW());"
    );
    let id = stmts[0].params[0].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
    assert_eq!(stmts[1].params, vec![json!(id)]);
}

#[tokio::test]
async fn create_requires_declared_properties() {
    let exec = MemoryExecutor::new(vec![], 1);
    let (status, body) = send(
        app(exec.clone(), false),
        json_request("POST", "/api/v1/pets", json!({"age": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["message"], json!("validation: name is required"));
    assert!(exec.sql().is_empty());
}

#[tokio::test]
async fn delete_missing_row_is_not_found() {
    let exec = MemoryExecutor::new(vec![], 0);
    let (status, _) = send(
        app(exec.clone(), false),
        Request::builder()
            .method("DELETE")
            .uri("/api/v1/pets/p-9")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(exec.sql(), vec!["DELETE FROM pet WHERE id = $1::varchar;".to_string()]);

    let exec = MemoryExecutor::new(vec![], 1);
    let (status, body) = send(
        app(exec, false),
        Request::builder()
            .method("DELETE")
            .uri("/api/v1/pets/p-1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn query_document_compile_and_execute() {
    let doc = json!({
        "select": {"query": [{"table": "pet", "fields": ["name"]}]},
        "where": [{"field": "name", "op": "e", "val": "O'Brien"}]
    });
    let exec = MemoryExecutor::new(vec![json!({"name": "O'Brien"})], 0);

    let (status, body) = send(app(exec.clone(), false), json_request("POST", "/api/v1/query/sql", doc.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({"sql": "SELECT pet.name FROM pet WHERE name = $1::varchar;", "params": ["O'Brien"]})
    );

    let (_, body) = send(
        app(exec.clone(), false),
        json_request("POST", "/api/v1/query/sql?inline=true", doc.clone()),
    )
    .await;
    assert_eq!(body["data"]["sql"], json!("SELECT pet.name FROM pet WHERE name = 'O''Brien';"));
    assert!(exec.sql().is_empty());

    let (status, body) = send(app(exec.clone(), false), json_request("POST", "/api/v1/query", doc)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([{"name": "O'Brien"}]));

    let exec = MemoryExecutor::new(vec![], 3);
    let (status, body) = send(
        app(exec, false),
        json_request("POST", "/api/v1/query", json!({"delete": {"table": "pet"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"affected": 3}));
}

#[tokio::test]
async fn query_errors_are_bad_requests() {
    let exec = MemoryExecutor::new(vec![], 0);
    let (status, body) = send(
        app(exec.clone(), false),
        json_request("POST", "/api/v1/query", json!({"delete": {"table": "owners"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("query_error"));
    assert_eq!(body["error"]["details"], json!({"kind": "unknown_table", "field": "owners"}));

    let (status, body) = send(
        app(exec.clone(), false),
        json_request(
            "POST",
            "/api/v1/query",
            json!({"select": {"query": [{"table": "pet"}]}, "delete": {"table": "pet"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["kind"], json!("ambiguous_operation_variant"));
    assert!(exec.sql().is_empty());
}

#[tokio::test]
async fn raw_values_in_query_documents_are_refused() {
    let doc = json!({
        "delete": {"table": "pet"},
        "where": [{"field": "name", "op": "e", "val": "'x' OR 1=1", "type": "raw"}]
    });
    let exec = MemoryExecutor::new(vec![], 5);
    for uri in ["/api/v1/query", "/api/v1/query/sql?inline=true"] {
        let (status, body) = send(app(exec.clone(), false), json_request("POST", uri, doc.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"], json!({"kind": "raw_literal", "field": "name"}));
    }
    assert!(exec.sql().is_empty());

    let (status, _) = send(
        app(exec.clone(), false),
        json_request(
            "POST",
            "/api/v1/query",
            json!({"delete": {"table": "pet"}, "where": [{"field": "age", "op": "e", "val": null}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(exec.sql(), vec!["DELETE FROM pet WHERE age = NULL;".to_string()]);

    let catalog = resolve_openapi(&parse_openapi(API_DOC, false).unwrap()).unwrap();
    let opted_in = app_router(AppState::new(exec.clone(), catalog).with_raw_literals(true), "/api/v1");
    let (status, body) = send(opted_in, json_request("POST", "/api/v1/query/sql?inline=true", doc)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sql"], json!("DELETE FROM pet WHERE name = 'x' OR 1=1;"));
}

#[tokio::test]
async fn membership_operators_need_a_list() {
    let exec = MemoryExecutor::new(vec![], 0);
    let (status, body) = send(
        app(exec.clone(), false),
        json_request(
            "POST",
            "/api/v1/query",
            json!({"delete": {"table": "pet"}, "where": [{"field": "age", "op": "i", "val": 5}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"], json!({"kind": "operand_mismatch", "field": "age"}));
    assert!(exec.sql().is_empty());
}

#[tokio::test]
async fn api_key_required_when_enabled() {
    let exec = MemoryExecutor::new(vec![], 0);
    let (status, _) = send(app(exec.clone(), true), get("/api/v1/pets")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(exec.sql().is_empty());

    let req = Request::builder()
        .uri("/api/v1/pets")
        .header("X-API-KEY", "wrong")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(exec.clone(), true), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], json!("forbidden"));

    let req = Request::builder()
        .uri("/api/v1/pets")
        .header("X-API-KEY", "secret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(exec.clone(), true), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        exec.sql().first().map(String::as_str),
        Some("SELECT users.api_key FROM users WHERE api_key = $1 LIMIT 1;")
    );

    let (status, _) = send(app(exec, true), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}
