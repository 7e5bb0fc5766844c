use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use tabula_api::config::ServerConfig;
use tabula_api::router::build_app_router;
use tabula_api::state::AppState;
use tabula_api::ws::WsManager;
use tabula_events::EventHub;
use tabula_jobs::{JobRegistry, JobService, PassthroughEngine};

/// Boundary used by [`multipart_request`].
pub const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

/// The app plus direct handles on its shared state, so tests can seed or
/// inspect jobs without going through the HTTP surface.
pub struct TestApp {
    pub app: Router,
    pub registry: Arc<JobRegistry>,
    pub hub: Arc<EventHub>,
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_upload_bytes: 25 * 1024 * 1024,
        job_retention_minutes: 60,
        event_buffer_capacity: 256,
    }
}

/// Build the full application router with all middleware layers, backed by
/// the passthrough engine.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack that production uses.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let registry = Arc::new(JobRegistry::new());
    let hub = Arc::new(EventHub::new(config.event_buffer_capacity));
    let service = Arc::new(JobService::new(
        Arc::clone(&registry),
        Arc::clone(&hub),
        Arc::new(PassthroughEngine),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        registry: Arc::clone(&registry),
        hub: Arc::clone(&hub),
        service,
        ws_manager: Arc::new(WsManager::new()),
    };

    TestApp {
        app: build_app_router(state, &config),
        registry,
        hub,
    }
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request should build"),
    )
    .await
    .expect("request should not fail at the transport level")
}

/// Decode a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// One field of a multipart form: name, optional filename, content.
pub struct FormField<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content: &'a [u8],
}

impl<'a> FormField<'a> {
    pub fn text(name: &'a str, content: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content: content.as_bytes(),
        }
    }

    pub fn file(name: &'a str, filename: &'a str, content: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            content,
        }
    }
}

/// Build a multipart POST request the way a browser form submit would.
pub fn multipart_request(uri: &str, fields: &[FormField<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for field in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match field.filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{filename}\"\r\n",
                        field.name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(field.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request should build")
}
