use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use fizica_core::error::AppError;
use fizica_core::testutil::MockProvider;

use crate::integration::common::{json_post, send, setup_test_app, setup_test_app_with};

const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app(MockProvider::default());

    let (status, json) = send(
        app.router,
        Request::get("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["queued"], 0);
}

#[tokio::test]
async fn openapi_document_lists_tutor_routes() {
    let app = setup_test_app(MockProvider::default());

    let (status, json) = send(
        app.router,
        Request::get("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/v1/solve"].is_object());
    assert!(json["paths"]["/v1/analyze"].is_object());
}

#[tokio::test]
async fn solve_returns_worked_solution() {
    let reply = r#"```json
{"problemSummary": "Cădere liberă", "solutionSummary": "v = sqrt(2gh)", "solution": "Pasul 1 ...", "explanation": "Explicații detaliate pentru fiecare pas", "formulas": ["$$v^2 = 2gh$$"], "finalAnswer": "v ≈ 19.8 m/s"}
```"#;
    let app = setup_test_app(MockProvider::new(reply));

    let (status, json) = send(
        app.router,
        json_post(
            "/v1/solve",
            &json!({"problemText": "Un corp cade liber de la 20 m.", "problemPhotoDataUri": PNG}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["problemSummary"], "Cădere liberă");
    assert_eq!(json["formulas"][0], "$$v^2 = 2gh$$");
    assert_eq!(json["finalAnswer"], "v ≈ 19.8 m/s");
    // Template filler is replaced with the solution text.
    assert_eq!(json["explanation"], "Pasul 1 ...");
    assert_eq!(app.provider.call_count(), 1);
}

#[tokio::test]
async fn solve_without_problem_returns_400() {
    let app = setup_test_app(MockProvider::default());

    let (status, json) = send(
        app.router,
        json_post("/v1/solve", &json!({"problemText": "   "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
    assert_eq!(
        json["message"],
        "Trebuie furnizat cel puțin textul problemei sau o imagine a problemei."
    );
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn solve_with_invalid_photo_returns_400() {
    let app = setup_test_app(MockProvider::default());

    let (status, json) = send(
        app.router,
        json_post("/v1/solve", &json!({"problemPhotoDataUri": "data:image/png,raw"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn analyze_returns_feedback() {
    let reply = r#"Iată evaluarea: {"solution": "v = 19.8 m/s", "errorAnalysis": "Unitatea de măsură lipsește.", "rating": "8/10 puncte"}"#;
    let app = setup_test_app(MockProvider::new(reply));

    let (status, json) = send(
        app.router,
        json_post(
            "/v1/analyze",
            &json!({
                "problemText": "Un corp cade liber de la 20 m.",
                "solutionPhotoDataUris": [PNG, PNG],
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["solution"], "v = 19.8 m/s");
    assert_eq!(json["errorAnalysis"], "Unitatea de măsură lipsește.");
    assert_eq!(json["rating"], "8/10 puncte");
}

#[tokio::test]
async fn analyze_with_prose_reply_degrades_gracefully() {
    let app = setup_test_app(MockProvider::new("Sorry, I cannot compute this."));

    let (status, json) = send(
        app.router,
        json_post(
            "/v1/analyze",
            &json!({"problemText": "P", "solutionText": "v = 20 m/s"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["solution"], "Sorry, I cannot compute this.");
    assert_eq!(json["rating"], "—/10");
}

#[tokio::test]
async fn analyze_without_solution_returns_400() {
    let app = setup_test_app(MockProvider::default());

    let (status, json) = send(
        app.router,
        json_post("/v1/analyze", &json!({"problemText": "P"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["message"],
        "Este necesară soluția ta: text sau cel puțin o imagine."
    );
}

#[tokio::test]
async fn provider_failure_returns_502_with_flow_prefix() {
    let provider = MockProvider::with_error(AppError::LlmError {
        message: "invalid api key".into(),
        status_code: 401,
    });
    let app = setup_test_app(provider);

    let (status, json) = send(
        app.router,
        json_post("/v1/solve", &json!({"problemText": "P"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "upstream_error");
    let message = json["message"].as_str().unwrap();
    assert!(message.starts_with("A apărut o eroare la rezolvare: "), "{message}");
    assert!(message.contains("invalid api key"));
}

#[tokio::test]
async fn transient_failure_is_retried_before_responding() {
    let provider = MockProvider::with_responses(vec![
        Err(AppError::NetworkError("ECONNRESET".into())),
        Ok(r#"{"solution": "a", "errorAnalysis": "b", "rating": "9/10 puncte"}"#.into()),
    ]);
    let app = setup_test_app(provider);

    let (status, json) = send(
        app.router,
        json_post("/v1/analyze", &json!({"problemText": "P", "solutionText": "S"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rating"], "9/10 puncte");
    assert_eq!(app.provider.call_count(), 2);
}

#[tokio::test]
async fn exhausted_rate_limit_returns_429() {
    let provider = MockProvider::with_responses(vec![
        Err(AppError::RateLimitExceeded("quota".into())),
        Err(AppError::RateLimitExceeded("quota".into())),
    ]);
    let app = setup_test_app_with(provider, 1, 1024 * 1024);

    let (status, json) = send(
        app.router,
        json_post("/v1/analyze", &json!({"problemText": "P", "solutionText": "S"})),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let message = json["message"].as_str().unwrap();
    assert!(message.starts_with("A apărut o eroare la analiză: "), "{message}");
    assert_eq!(app.provider.call_count(), 2);
}

#[tokio::test]
async fn oversized_body_returns_413() {
    let app = setup_test_app_with(MockProvider::default(), 0, 1024);

    let big = "x".repeat(4096);
    let response = send(
        app.router,
        json_post("/v1/solve", &json!({"problemText": big})),
    )
    .await;

    assert_eq!(response.0, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.provider.call_count(), 0);
}
