use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use fizica_core::testutil::MockProvider;
use fizica_core::throttle::{RequestThrottle, ThrottleConfig};
use fizica_core::tutor::TutorService;
use fizica_server::routes::{self, DEFAULT_MAX_BODY_BYTES};
use fizica_server::state::AppState;

pub struct TestApp {
    pub router: Router,
    pub provider: MockProvider,
}

/// Fast throttle so retry tests finish quickly.
fn test_throttle(max_retries: u32) -> RequestThrottle {
    RequestThrottle::new(
        ThrottleConfig::new(Duration::ZERO)
            .with_max_retries(max_retries)
            .with_base_delay(Duration::from_millis(5)),
    )
}

pub fn setup_test_app(provider: MockProvider) -> TestApp {
    setup_test_app_with(provider, 2, DEFAULT_MAX_BODY_BYTES)
}

pub fn setup_test_app_with(
    provider: MockProvider,
    max_retries: u32,
    max_body_bytes: usize,
) -> TestApp {
    let tutor = TutorService::new(provider.clone(), test_throttle(max_retries));
    let state = Arc::new(AppState::new(tutor));
    TestApp {
        router: routes::router(state, max_body_bytes),
        provider,
    }
}

pub fn json_post(uri: &str, body: &serde_json::Value) -> Request<Body> {
    let bytes = serde_json::to_vec(body).unwrap();
    Request::post(uri)
        .header("content-type", "application/json")
        .header("content-length", bytes.len())
        .body(Body::from(bytes))
        .unwrap()
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}
