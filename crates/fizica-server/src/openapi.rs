use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fizica API",
        version = "0.3.0",
        description = "Physics tutor: worked solutions and graded feedback from a chat-completion model."
    ),
    paths(
        crate::routes::solve,
        crate::routes::analyze,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::SolveBody,
        crate::dto::SolveResponse,
        crate::dto::AnalyzeBody,
        crate::dto::AnalyzeResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "tutor", description = "Solve problems and grade solutions"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
