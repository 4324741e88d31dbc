use std::path::PathBuf;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use qrshort_gateway::auth::AuthToken;
use qrshort_gateway::{App, AppState};
use qrshort_storage::{Backend, MemoryStore};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const TOKEN: &str = "s3cret";

struct TestApp {
    state: AppState,
    router: Router,
}

impl TestApp {
    fn new(count_hits: bool) -> Self {
        Self::with_dirs(count_hits, None, None)
    }

    fn with_dirs(count_hits: bool, data_dir: Option<PathBuf>, www_dir: Option<PathBuf>) -> Self {
        let backend = Backend::Memory(MemoryStore::new().with_hit_counting(count_hits));
        let state = AppState::new(backend, AuthToken::new(TOKEN), data_dir);
        let router = App::router(state.clone(), www_dir.as_deref());
        Self { state, router }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn get_authed(&self, uri: &str) -> Response {
        self.send(
            Request::get(uri)
                .header("X-Qr-Auth", TOKEN)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn shorten(&self, url: &str) -> String {
        let response = self
            .get_authed(&format!("/enc?url={}", encode(url)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_text(response).await
    }
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Percent-encodes everything except ASCII alphanumerics.
fn encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() {
                (b as char).to_string()
            } else {
                format!("%{b:02X}")
            }
        })
        .collect()
}

#[tokio::test]
async fn encode_requires_auth() {
    let app = TestApp::new(false);

    let response = app.get("/enc?url=http%3A%2F%2Fexample.com").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .get("/enc?url=http%3A%2F%2Fexample.com&auth_key=wrong")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn encode_then_decode() {
    let app = TestApp::new(false);

    assert_eq!(app.shorten("http://example.com/a").await, "1");

    let response = app.get("/dec/1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "http://example.com/a");

    let response = app.get("/dec?id=1").await;
    assert_eq!(body_text(response).await, "http://example.com/a");
}

#[tokio::test]
async fn decode_failures_use_legacy_status() {
    let app = TestApp::new(false);

    assert_eq!(
        app.get("/dec/zz").await.status(),
        StatusCode::EXPECTATION_FAILED
    );
    assert_eq!(
        app.get("/dec/NOT-A-CODE").await.status(),
        StatusCode::EXPECTATION_FAILED
    );
    assert_eq!(app.get("/dec").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn encode_rejects_bad_input() {
    let app = TestApp::new(false);

    assert_eq!(app.get_authed("/enc").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        app.get_authed("/enc?url=not-a-url").await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn update_with_cookie_auth() {
    let app = TestApp::new(false);
    app.shorten("http://old.example").await;

    let request = Request::post("/upd")
        .header(header::COOKIE, format!("Qr-Auth={TOKEN}"))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("url={}&id=1", encode("http://new.example"))))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "1");

    let response = app.get("/dec/1").await;
    assert_eq!(body_text(response).await, "http://new.example");
}

#[tokio::test]
async fn redirect_appends_query() {
    let app = TestApp::new(false);
    app.shorten("https://example.com/page?a=1").await;

    let response = app.get("/q/1?utm=qr").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://example.com/page?a=1&utm=qr"
    );
    assert_eq!(response.headers()["x-qr-short"], "Redirected By");

    assert_eq!(app.get("/q/9").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/q/Bad").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_shows_hit_counts() {
    let app = TestApp::new(true);
    app.shorten("http://one.example").await;
    app.shorten("http://two.example").await;

    for _ in 0..3 {
        app.get("/q/1").await;
    }
    app.state.links.flush_hits().await;

    let response = app.get_authed("/list?beg=1&end=last").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!([
            { "Id": "1", "URL": "http://one.example", "Count": 3 },
            { "Id": "2", "URL": "http://two.example", "Count": 0 },
        ])
    );
}

#[tokio::test]
async fn list_validates_range_and_auth() {
    let app = TestApp::new(false);

    assert_eq!(
        app.get("/list?beg=1&end=5").await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.get_authed("/list?beg=5&end=2").await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.get_authed("/list?beg=x&end=2").await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.get_authed("/list?beg=1").await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn bulk_load_json_body() {
    let app = TestApp::new(false);

    let body = json!({ "data": [
        { "url": "http://x", "Id": "5" },
        { "url": "http://y", "Id": "z" },
    ]});
    let request = Request::post("/bulkLoad")
        .header("X-Qr-Auth", TOKEN)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!([
            { "Id": "5", "msg": "success/insert", "Pos": 0 },
            { "Id": "z", "msg": "success/insert", "Pos": 1 },
        ])
    );
    assert_eq!(app.shorten("http://next").await, "10");
}

#[tokio::test]
async fn bulk_load_update_variable() {
    let app = TestApp::new(false);
    app.shorten("http://first").await;

    let update = r#"{"Data":[{"url":"http://replaced","Id":"1"},{"url":"http://x","Id":"UPPER"}]}"#;
    let request = Request::post("/bulkLoad")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "auth_key={TOKEN}&update={}",
            encode(update)
        )))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let items = body_json(response).await;
    assert_eq!(items[0]["msg"], "success/update");
    assert!(items[1]["msg"].as_str().unwrap().starts_with("fail:"));
    assert_eq!(items[1]["Pos"], 1);
}

#[tokio::test]
async fn bulk_load_rejects_malformed_json() {
    let app = TestApp::new(false);

    let request = Request::post("/bulkLoad")
        .header("X-Qr-Auth", TOKEN)
        .body(Body::from("{not json"))
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unsupported_method_is_a_teapot() {
    let app = TestApp::new(false);

    let request = Request::patch("/enc?url=http%3A%2F%2Fx")
        .header("X-Qr-Auth", TOKEN)
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::IM_A_TEAPOT);
}

#[tokio::test]
async fn data_side_file_is_written() {
    let data_dir = TempDir::new().unwrap();
    let app = TestApp::with_dirs(false, Some(data_dir.path().to_path_buf()), None);

    let response = app
        .get_authed("/enc?url=http%3A%2F%2Fexample.com&data=hello")
        .await;
    assert_eq!(body_text(response).await, "1");

    let written = std::fs::read_to_string(data_dir.path().join("1")).unwrap();
    assert_eq!(written, "hello\n");
}

#[tokio::test]
async fn static_files_fallback() {
    let www = TempDir::new().unwrap();
    std::fs::write(www.path().join("index.html"), "<h1>qr</h1>").unwrap();
    let app = TestApp::with_dirs(false, None, Some(www.path().to_path_buf()));

    let response = app.get("/index.html").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "<h1>qr</h1>");
}

#[tokio::test]
async fn status_reports_requests() {
    let app = TestApp::new(false);
    app.get("/dec/1").await;

    let response = app.get("/api/v1/status").await;
    assert_eq!(response.status(), StatusCode::OK);

    let status = body_json(response).await;
    assert_eq!(status["status"], "ok");
    assert_eq!(status["backend"], "memory");
    assert_eq!(status["requests"], 2);
    assert!(status["started_at"].is_string());
}

#[tokio::test]
async fn exit_server_requests_shutdown() {
    let app = TestApp::new(false);

    let denied = Request::post("/api/v1/exit-server")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(denied).await.status(), StatusCode::UNAUTHORIZED);

    let request = Request::post("/api/v1/exit-server")
        .header("X-Qr-Auth", TOKEN)
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(body_json(response).await, json!({ "status": "success" }));

    tokio::time::timeout(Duration::from_secs(1), app.state.shutdown_requested())
        .await
        .expect("shutdown was not requested");
}
