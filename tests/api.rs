use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use portfolio_services::config::Config;
use portfolio_services::contact::{ContactMessage, Delivery, MailError, Mailer};
use portfolio_services::create_router;
use portfolio_services::open_source::{OpenSourceData, OpenSourceUpstream, UpstreamError};
use portfolio_services::state::AppState;
use portfolio_services::store::{MemoryStore, SharedStore, Store};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

#[derive(Default)]
struct CountingUpstream {
    calls: AtomicUsize,
}

#[async_trait]
impl OpenSourceUpstream for CountingUpstream {
    async fn fetch(&self, _username: &str) -> Result<OpenSourceData, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(UpstreamError::Status(500))
    }
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<ContactMessage>>,
    failing: AtomicBool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &ContactMessage) -> Result<Delivery, MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Status(500));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(Delivery::Sent)
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    store: Arc<MemoryStore>,
    upstream: Arc<CountingUpstream>,
    mailer: Arc<RecordingMailer>,
}

impl TestApp {
    fn new() -> Self {
        Self::build(true, Config::default())
    }

    fn without_store() -> Self {
        Self::build(false, Config::default())
    }

    fn behind_proxy() -> Self {
        let mut config = Config::default();
        config.contact.trust_proxy_headers = true;
        Self::build(true, config)
    }

    fn build(with_store: bool, config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let upstream = Arc::new(CountingUpstream::default());
        let mailer = Arc::new(RecordingMailer::default());
        let shared: Option<SharedStore> = if with_store {
            Some(store.clone())
        } else {
            None
        };
        let state = AppState::new(&config, shared, upstream.clone(), mailer.clone());
        Self {
            router: create_router(state.clone()),
            state,
            store,
            upstream,
            mailer,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_from(uri, body, "203.0.113.1").await
    }

    async fn post_from(&self, uri: &str, body: Value, client: &str) -> (StatusCode, Value) {
        self.post_with_header(uri, body, client, None).await
    }

    /// Posts as the peer `client`, optionally with an `X-Forwarded-For` header.
    async fn post_with_header(
        &self,
        uri: &str,
        body: Value,
        client: &str,
        forwarded_for: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(forwarded_for) = forwarded_for {
            builder = builder.header("x-forwarded-for", forwarded_for);
        }
        let mut request = builder.body(Body::from(body.to_string())).unwrap();
        let peer: SocketAddr = format!("{client}:40000").parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        let (status, _, body) = self.send(request).await;
        (status, body)
    }
}

#[tokio::test]
async fn shorten_redirect_and_stats() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/api/tools/shorten", json!({ "url": " https://Example.com/docs/ " }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["originalUrl"], "https://example.com/docs");
    let code = body["shortCode"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);

    let (status, headers, _) = app.get(&format!("/s/{code}")).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "https://example.com/docs");

    let (status, _, body) = app.get(&format!("/api/tools/shorten/{code}/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["shortCode"], code.as_str());
    assert_eq!(body["clicks"], 1);
    assert!(body["createdAt"].is_string());
}

#[tokio::test]
async fn shortening_counts_tool_usage_and_never_deduplicates() {
    let app = TestApp::new();
    let (_, first) = app.post("/api/tools/shorten", json!({ "url": "https://example.com" })).await;
    let (_, second) = app.post("/api/tools/shorten", json!({ "url": "https://example.com" })).await;
    assert_ne!(first["shortCode"], second["shortCode"]);
    assert_eq!(app.store.link_count(), 2);

    let (_, _, body) = app.get("/api/tools").await;
    assert_eq!(body["tools"][0]["id"], "url-shortener");
    assert_eq!(body["tools"][0]["usageCount"], 2);
}

#[tokio::test]
async fn shorten_rejects_invalid_submissions() {
    let app = TestApp::new();

    let (status, body) = app.post("/api/tools/shorten", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "url is required.");

    let (status, body) = app
        .post("/api/tools/shorten", json!({ "url": "ftp://example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only HTTP and HTTPS URLs are allowed.");

    let (status, body) = app
        .post("/api/tools/shorten", json!({ "url": "https://sub.merckel.dev/x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "URLs pointing to merckel.dev are not allowed.");

    let request = Request::post("/api/tools/shorten")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON.");
    assert_eq!(app.store.link_count(), 0);
}

#[tokio::test]
async fn shorten_without_store_is_unavailable() {
    let app = TestApp::without_store();
    let (status, body) = app
        .post("/api/tools/shorten", json!({ "url": "https://example.com" }))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_or_malformed_codes_are_not_found() {
    let app = TestApp::new();
    assert_eq!(app.get("/s/zzzzzz").await.0, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/s/abcdefghjkmnpq").await.0, StatusCode::NOT_FOUND);
    assert_eq!(
        app.get("/api/tools/shorten/zzzzzz/stats").await.0,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn contact_reports_field_errors() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/contact", json!({ "name": "", "email": "bad", "message": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Please provide valid contact details.");
    assert_eq!(body["errors"]["name"], "Name is required.");
    assert_eq!(body["errors"]["email"], "Email must be valid.");
    assert_eq!(body["errors"]["message"], "Message is required.");
}

#[tokio::test]
async fn contact_is_rate_limited_per_client() {
    let app = TestApp::new();
    let form = json!({ "name": "Ada", "email": "ada@example.com", "message": "Hello" });

    let (status, body) = app.post_from("/api/contact", form.clone(), "198.51.100.4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app.post_from("/api/contact", form.clone(), "198.51.100.4").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);

    let (status, _) = app.post_from("/api/contact", form.clone(), "198.51.100.5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.mailer.sent.lock().unwrap().len(), 2);

    app.state.reset();
    let (status, _) = app.post_from("/api/contact", form, "198.51.100.4").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn contact_rate_limit_ignores_forwarded_headers_by_default() {
    let app = TestApp::new();
    let form = json!({ "name": "Ada", "email": "ada@example.com", "message": "Hello" });

    let (status, _) = app
        .post_with_header("/api/contact", form.clone(), "192.0.2.50", Some("10.0.0.1"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post_with_header("/api/contact", form, "192.0.2.50", Some("10.0.0.2"))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
    assert_eq!(app.mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn contact_rate_limit_uses_forwarded_address_behind_proxy() {
    let app = TestApp::behind_proxy();
    let form = json!({ "name": "Ada", "email": "ada@example.com", "message": "Hello" });

    let (status, _) = app
        .post_with_header("/api/contact", form.clone(), "10.0.0.254", Some("203.0.113.9"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post_with_header("/api/contact", form.clone(), "10.0.0.254", Some("203.0.113.10"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post_with_header("/api/contact", form, "10.0.0.254", Some("203.0.113.9, 10.0.0.254"))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn contact_accepts_json_without_content_type() {
    let app = TestApp::new();
    let form = json!({ "name": "Ada", "email": "ada@example.com", "message": "Hello" });
    let request = Request::post("/api/contact")
        .body(Body::from(form.to_string()))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let request = Request::post("/api/tools/shorten")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(json!({ "url": "https://example.com" }).to_string()))
        .unwrap();
    assert_eq!(app.send(request).await.0, StatusCode::CREATED);
}

#[tokio::test]
async fn contact_rejects_malformed_body() {
    let app = TestApp::new();
    let request = Request::post("/api/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("name=Ada"))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Request body must be valid JSON.");
}

#[tokio::test]
async fn contact_relay_failure_is_bad_gateway() {
    let app = TestApp::new();
    app.mailer.failing.store(true, Ordering::SeqCst);
    let (status, body) = app
        .post(
            "/api/contact",
            json!({ "name": "Ada", "email": "ada@example.com", "message": "Hello" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body["message"],
        "Unable to send message right now. Please try again later."
    );
}

#[tokio::test]
async fn usage_endpoint_validates_tool_ids() {
    let app = TestApp::new();

    let (status, body) = app.post("/api/tools/usage", json!({ "toolId": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "toolId is required.");

    let (status, _) = app.post("/api/tools/usage", json!({ "toolId": "nmap" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.post("/api/tools/usage", json!({ "toolId": "qr-generator" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, _, body) = app.get("/api/tools/top?limit=1").await;
    assert_eq!(body["tools"].as_array().unwrap().len(), 1);
    assert_eq!(body["tools"][0]["id"], "qr-generator");
    assert_eq!(body["tools"][0]["usageCount"], 1);
}

#[tokio::test]
async fn malformed_query_strings_use_the_error_envelope() {
    let app = TestApp::new();
    let (status, _, body) = app.get("/api/tools/top?limit=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid query string"));
    assert_eq!(body["error"], body["message"]);
}

#[tokio::test]
async fn open_source_falls_back_and_caches_in_process() {
    let app = TestApp::new();

    let (status, _, body) = app.get("/api/open-source").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fallback");
    assert!(!body["contributions"].as_array().unwrap().is_empty());

    app.get("/api/open-source").await;
    assert_eq!(app.upstream.calls.load(Ordering::SeqCst), 1);
    let key = app.state.open_source.cache_key();
    assert!(app.store.read_cache(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn palette_filters_and_executes() {
    let app = TestApp::new();
    let (status, _, body) = app.get("/api/palette?q=matrix").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["commands"][0]["id"], "matrix");
    assert_eq!(body["result"]["message"], "Wake up, Neo. The portfolio has you.");

    let (_, _, body) = app.get("/api/palette").await;
    assert!(body["result"].is_null());
    assert_eq!(body["commands"][0]["type"], "navigate");
}

#[tokio::test]
async fn health_reports_store_status() {
    let app = TestApp::new();
    let (status, _, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "connected");

    app.store.set_offline(true);
    assert_eq!(app.get("/api/health").await.2["db"], "error");

    let app = TestApp::without_store();
    assert_eq!(app.get("/api/health").await.2["db"], "disconnected");
}
