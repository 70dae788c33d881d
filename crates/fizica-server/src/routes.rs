use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use fizica_core::models::{AnalyzeRequest, SolveRequest};

use crate::dto::{AnalyzeBody, AnalyzeResponse, HealthResponse, SolveBody, SolveResponse};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Inline base64 photos make bodies large.
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let api = Router::new()
        .route("/v1/solve", post(solve))
        .route("/v1/analyze", post(analyze))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Tutor
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/solve",
    request_body = SolveBody,
    responses(
        (status = 200, description = "Worked solution", body = SolveResponse),
        (status = 400, description = "Missing problem or invalid photo", body = crate::dto::ErrorResponse),
        (status = 429, description = "Model provider rate limit persisted", body = crate::dto::ErrorResponse),
        (status = 502, description = "Model provider failed", body = crate::dto::ErrorResponse),
    ),
    tag = "tutor"
)]
pub async fn solve(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<SolveBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = SolveRequest::try_from(body)?;
    let solution = state
        .tutor
        .solve(&request)
        .await
        .map_err(ApiError::during("rezolvare"))?;

    Ok(axum::Json(SolveResponse::from(solution)))
}

#[utoipa::path(
    post,
    path = "/v1/analyze",
    request_body = AnalyzeBody,
    responses(
        (status = 200, description = "Graded feedback", body = AnalyzeResponse),
        (status = 400, description = "Missing problem or solution, or invalid photo", body = crate::dto::ErrorResponse),
        (status = 429, description = "Model provider rate limit persisted", body = crate::dto::ErrorResponse),
        (status = 502, description = "Model provider failed", body = crate::dto::ErrorResponse),
    ),
    tag = "tutor"
)]
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<AnalyzeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = AnalyzeRequest::try_from(body)?;
    let feedback = state
        .tutor
        .analyze(&request)
        .await
        .map_err(ApiError::during("analiză"))?;

    Ok(axum::Json(AnalyzeResponse::from(feedback)))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    axum::Json(HealthResponse {
        status: "healthy",
        queued: state.tutor.queued(),
    })
}
