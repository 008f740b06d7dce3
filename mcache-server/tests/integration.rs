use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use http_body_util::BodyExt;
use mcache_server::{routes::build_router, AppState, ServerConfig};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

async fn test_state() -> (TempDir, Arc<AppState>) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cfg = ServerConfig {
        data_dir: tmp.path().to_path_buf(),
        ..Default::default()
    };
    let state = Arc::new(AppState::new(cfg).await.expect("AppState::new"));
    (tmp, state)
}

async fn json_body(resp: axum::http::Response<Body>) -> (StatusCode, JsonValue) {
    let status = resp.status();
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    let json: JsonValue = serde_json::from_slice(&bytes).expect("valid JSON response");
    (status, json)
}

fn request(method: &str, uri: &str, body: Option<JsonValue>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn health_check_ok() {
    let (_tmp, state) = test_state().await;
    let app = build_router(state);

    let resp = app.oneshot(request("GET", "/health", None)).await.unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.get("status").and_then(|v| v.as_str()), Some("ok"));
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn create_index_conflicts_on_duplicate() {
    let (_tmp, state) = test_state().await;
    let app = build_router(state);

    let resp = app
        .clone()
        .oneshot(request("POST", "/i/dev", None))
        .await
        .unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json.get("id").and_then(|v| v.as_str()), Some("dev"));

    let resp = app.oneshot(request("POST", "/i/dev", None)).await.unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn update_and_query_roundtrip() {
    let (_tmp, state) = test_state().await;
    let app = build_router(state);

    let resp = app
        .clone()
        .oneshot(request("POST", "/i/dev", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Manifest body {"a": {}, "b": {}} base64-encoded, plus two documents.
    let manifest_body = "eyJhIjoge30sICJiIjoge319";
    let docs = json!([
        {"id": "m:a&b", "updatedAt": 100, "body": manifest_body},
        {"id": "a", "updatedAt": 200},
        {"id": "c", "updatedAt": 200}
    ]);
    let resp = app
        .clone()
        .oneshot(request("PUT", "/i/dev", Some(docs)))
        .await
        .unwrap();
    let (status, written) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert!(written.get("a").is_some());
    assert!(written.get("m:a&b").is_some());

    let resp = app
        .clone()
        .oneshot(request("GET", "/i/dev/m/m:a&b/@/150", None))
        .await
        .unwrap();
    let (status, results) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    // a changed after the bound; b has no document; c is outside the
    // manifest; the manifest itself sits below the bound.
    assert!(results.get("a").is_some());
    assert!(results.get("b").is_none());
    assert!(results.get("c").is_none());
    assert!(results.get("m:a&b").is_none());
}

#[tokio::test]
async fn update_unknown_index_is_not_found() {
    let (_tmp, state) = test_state().await;
    let app = build_router(state);

    let resp = app
        .oneshot(request("PUT", "/i/nope", Some(json!([{"id": "a"}]))))
        .await
        .unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn soft_delete_installs_tombstones() {
    let (_tmp, state) = test_state().await;
    let app = build_router(state);

    app.clone()
        .oneshot(request("POST", "/i/dev", None))
        .await
        .unwrap();
    let resp = app
        .oneshot(request("DELETE", "/i/dev", Some(json!(["a"]))))
        .await
        .unwrap();
    let (status, written) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(written["a"]["deleted"], true);
}

#[tokio::test]
async fn subscription_requires_token() {
    let (_tmp, state) = test_state().await;
    let app = build_router(state);

    let resp = app
        .clone()
        .oneshot(request("GET", "/docs/0", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/docs/0")
                .header("authorization", "no-colon-here")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn subscription_streams_initial_snapshot() {
    let (_tmp, state) = test_state().await;
    let app = build_router(state);

    app.clone()
        .oneshot(request("POST", "/i/dev", None))
        .await
        .unwrap();
    let manifest_body = "eyJhIjoge319"; // {"a": {}}
    let docs = json!([
        {"id": "m", "updatedAt": 100, "body": manifest_body},
        {"id": "a", "updatedAt": 200}
    ]);
    app.clone()
        .oneshot(request("PUT", "/i/dev", Some(docs)))
        .await
        .unwrap();

    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/docs/0")
                .header("authorization", "Bearer dev:m")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );

    let mut body = resp.into_body().into_data_stream();
    let frame = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .expect("first frame within timeout")
        .expect("stream not ended")
        .expect("frame ok");
    let text = String::from_utf8(frame.to_vec()).unwrap();
    assert!(text.starts_with("data: "), "unexpected frame: {text}");
    let payload: JsonValue = serde_json::from_str(text.trim_start_matches("data: ").trim()).unwrap();
    assert!(payload.get("a").is_some());
    assert!(payload.get("m").is_some());
}
