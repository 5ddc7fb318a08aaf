use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use marginalia_server::analysis::{AnalysisError, AnalysisKind, AnalysisService};
use marginalia_server::anchors::{AnchorStore, SqliteAnchorStore, StoreError, TextAnchor};
use marginalia_server::db::create_pool;
use marginalia_server::routes;
use marginalia_server::state::AppState;

/// Analysis service that answers from memory, or fails every call
struct StubAnalysis {
    fail: bool,
}

#[async_trait]
impl AnalysisService for StubAnalysis {
    async fn analyze(&self, kind: AnalysisKind, content: &str) -> Result<Value, AnalysisError> {
        if self.fail {
            return Err(AnalysisError::Request("connection refused".to_string()));
        }
        Ok(json!({ "kind": kind.as_str(), "words": content.split_whitespace().count() }))
    }
}

async fn server_with(analysis: StubAnalysis) -> TestServer {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    let state = AppState::new(Arc::new(SqliteAnchorStore::new(pool)), Arc::new(analysis));
    TestServer::new(routes::app(state)).unwrap()
}

/// Store whose backend is gone
struct OfflineStore;

#[async_trait]
impl AnchorStore for OfflineStore {
    async fn save(&self, _anchor: &TextAnchor) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database is locked".to_string()))
    }

    async fn get(&self, _id: &str) -> Result<Option<TextAnchor>, StoreError> {
        Err(StoreError::Unavailable("database is locked".to_string()))
    }

    async fn list_by_document(&self, _document_id: &str) -> Result<Vec<TextAnchor>, StoreError> {
        Err(StoreError::Unavailable("database is locked".to_string()))
    }

    async fn delete(&self, _id: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("database is locked".to_string()))
    }
}

async fn server() -> TestServer {
    server_with(StubAnalysis { fail: false }).await
}

const PAGE: [&str; 3] = ["Intro. ", "The quick brown fox jumps.", " Conclusion."];

async fn create(server: &TestServer, text: &str, page: u32) -> Value {
    let response = server
        .post("/api/v1/anchors")
        .json(&json!({
            "documentId": "doc-1",
            "pageNumber": page,
            "selectedText": text,
            "startOffset": 4,
            "endOffset": 19,
            "boundingRect": {"x": 10.0, "y": 20.0, "width": 90.0, "height": 12.0},
            "annotationType": "highlight",
            "color": "#ffeb3b"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["anchor"].clone()
}

#[tokio::test]
async fn test_health() {
    let server = server().await;

    for path in ["/health", "/api/v1/health"] {
        let response = server.get(path).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "healthy");
    }
}

#[tokio::test]
async fn test_create_get_and_restore() {
    let server = server().await;
    let anchor = create(&server, "quick brown fox", 2).await;
    let id = anchor["id"].as_str().unwrap();

    assert_eq!(anchor["documentId"], "doc-1");
    assert_eq!(anchor["pageNumber"], 2);

    let fetched = server.get(&format!("/api/v1/anchors/{}", id)).await;
    fetched.assert_status_ok();
    assert_eq!(fetched.json::<Value>()["anchor"]["selectedText"], "quick brown fox");

    let restored = server
        .post(&format!("/api/v1/anchors/{}/restore", id))
        .json(&json!({ "nodes": PAGE }))
        .await;
    restored.assert_status_ok();
    assert_eq!(
        restored.json::<Value>(),
        json!({"status": "matched", "node": 1, "localStart": 4, "localLength": 15})
    );

    let missing = server
        .post(&format!("/api/v1/anchors/{}/restore", id))
        .json(&json!({ "nodes": ["Something else entirely."] }))
        .await;
    missing.assert_status_ok();
    assert_eq!(missing.json::<Value>(), json!({"status": "notFound"}));
}

#[tokio::test]
async fn test_create_rejects_invalid_capture() {
    let server = server().await;

    let blank = server
        .post("/api/v1/anchors")
        .json(&json!({
            "documentId": "doc-1",
            "pageNumber": 1,
            "selectedText": "   ",
            "annotationType": "highlight"
        }))
        .expect_failure()
        .await;
    blank.assert_status(StatusCode::BAD_REQUEST);

    let page_zero = server
        .post("/api/v1/anchors")
        .json(&json!({
            "documentId": "doc-1",
            "pageNumber": 0,
            "selectedText": "text",
            "annotationType": "highlight"
        }))
        .expect_failure()
        .await;
    page_zero.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_list_and_delete() {
    let server = server().await;
    let first = create(&server, "quick brown fox", 2).await;
    create(&server, "Conclusion", 3).await;
    let id = first["id"].as_str().unwrap();

    let updated = server
        .patch(&format!("/api/v1/anchors/{}", id))
        .json(&json!({ "note": "check this" }))
        .await;
    updated.assert_status_ok();
    let updated = updated.json::<Value>()["anchor"].clone();
    assert_eq!(updated["note"], "check this");
    assert_eq!(updated["color"], "#ffeb3b");
    assert_eq!(updated["selectedText"], first["selectedText"]);

    let all = server.get("/api/v1/anchors/document/doc-1").await.json::<Value>();
    assert_eq!(all["total"], 2);

    let page = server
        .get("/api/v1/anchors/document/doc-1/page/3")
        .await
        .json::<Value>();
    assert_eq!(page["total"], 1);
    assert_eq!(page["anchors"][0]["selectedText"], "Conclusion");

    server
        .delete(&format!("/api/v1/anchors/{}", id))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .delete(&format!("/api/v1/anchors/{}", id))
        .expect_failure()
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get(&format!("/api/v1/anchors/{}", id))
        .expect_failure()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_page_restore_with_markup() {
    let server = server().await;
    create(&server, "quick brown fox", 2).await;
    create(&server, "not on this page", 2).await;

    let response = server
        .post("/api/v1/anchors/document/doc-1/page/2/restore")
        .json(&json!({ "nodes": PAGE, "render": true }))
        .await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["restoredCount"], 1);
    assert_eq!(body["failedAnnotations"].as_array().unwrap().len(), 1);
    assert_eq!(body["spans"][0]["node"], 1);
    assert_eq!(body["spans"][0]["localStart"], 4);

    let html = body["html"].as_str().unwrap();
    assert!(html.contains("quick brown fox</span>"));
    assert!(html.contains("mg-highlight"));
}

#[tokio::test]
async fn test_import_partial_failure() {
    let server = server().await;

    let response = server
        .post("/api/v1/anchors/import")
        .json(&json!({
            "documentId": "doc-9",
            "anchors": [
                {"id": "a1", "content": "x", "type": "note"},
                {"id": "", "content": "y", "type": "note"},
                {"id": "a3", "content": "z", "type": "highlight"}
            ]
        }))
        .await;
    response.assert_status(StatusCode::MULTI_STATUS);

    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(
        body["data"],
        json!({
            "documentId": "doc-9",
            "totalAnnotations": 3,
            "successCount": 2,
            "errorCount": 1,
            "results": [
                {"id": "a1", "success": true},
                {"id": "unknown", "success": false, "error": "Invalid annotation structure"},
                {"id": "a3", "success": true}
            ]
        })
    );

    let stored = server.get("/api/v1/anchors/document/doc-9").await.json::<Value>();
    assert_eq!(stored["total"], 2);
}

#[tokio::test]
async fn test_import_all_succeed() {
    let server = server().await;

    let response = server
        .post("/api/v1/anchors/import")
        .json(&json!({
            "documentId": "doc-9",
            "anchors": [{"id": "a1", "selectedText": "x", "annotationType": "note", "pageNumber": 4}]
        }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["success"], true);
}

#[tokio::test]
async fn test_import_rejects_malformed_request() {
    let server = server().await;

    for body in [
        json!({"anchors": []}),
        json!({"documentId": "", "anchors": []}),
        json!({"documentId": "doc", "anchors": "nope"}),
    ] {
        server
            .post("/api/v1/anchors/import")
            .json(&body)
            .expect_failure()
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_analysis() {
    let server = server().await;

    let response = server
        .post("/api/v1/analysis")
        .json(&json!({"content": "one two three", "analysisType": "summarize"}))
        .await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["analysisType"], "summarize");
    assert_eq!(body["data"]["result"], json!({"kind": "summarize", "words": 3}));
}

#[tokio::test]
async fn test_analysis_rejects_bad_input() {
    let server = server().await;

    for body in [
        json!({"analysisType": "summarize"}),
        json!({"content": "text"}),
        json!({"content": "text", "analysisType": "translate"}),
        json!(["not", "an", "object"]),
    ] {
        server
            .post("/api/v1/analysis")
            .json(&body)
            .expect_failure()
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_analysis_failure_is_generic() {
    let server = server_with(StubAnalysis { fail: true }).await;

    let response = server
        .post("/api/v1/analysis")
        .json(&json!({"content": "text", "analysisType": "extract-concepts"}))
        .expect_failure()
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body = response.json::<Value>();
    assert_eq!(body["error"], "analysis_error");
    assert_eq!(body["message"], "Analysis service error");
}

#[tokio::test]
async fn test_storage_outage_is_surfaced() {
    let state = AppState::new(Arc::new(OfflineStore), Arc::new(StubAnalysis { fail: false }));
    let server = TestServer::new(routes::app(state)).unwrap();

    let response = server
        .get("/api/v1/anchors/some-id")
        .expect_failure()
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["error"], "storage_unavailable");

    server
        .get("/api/v1/anchors/document/doc-1/page/2")
        .expect_failure()
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
