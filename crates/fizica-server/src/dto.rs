use serde::{Deserialize, Serialize};

use fizica_core::error::AppError;
use fizica_core::models::{
    AnalysisFeedback, AnalyzeRequest, ImageRef, SolveRequest, WorkedSolution,
};

/// Blank strings count as "not provided".
fn optional_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn optional_image(value: Option<String>) -> Result<Option<ImageRef>, AppError> {
    optional_text(value).map(|raw| ImageRef::parse(&raw)).transpose()
}

// ---------------------------------------------------------------------------
// Solve
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SolveBody {
    /// Problem statement (optional when a photo is given)
    pub problem_text: Option<String>,
    /// Photo of the problem as `data:<mimetype>;base64,<data>` or an http(s) URL
    pub problem_photo_data_uri: Option<String>,
    /// Extra instructions, e.g. which exercise to solve
    pub additional_context: Option<String>,
}

impl TryFrom<SolveBody> for SolveRequest {
    type Error = AppError;

    fn try_from(body: SolveBody) -> Result<Self, AppError> {
        Ok(SolveRequest {
            problem_text: optional_text(body.problem_text),
            problem_image: optional_image(body.problem_photo_data_uri)?,
            additional_context: optional_text(body.additional_context),
        })
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SolveResponse {
    pub problem_summary: String,
    pub solution_summary: String,
    pub solution: String,
    pub explanation: String,
    pub formulas: Vec<String>,
    pub final_answer: String,
}

impl From<WorkedSolution> for SolveResponse {
    fn from(s: WorkedSolution) -> Self {
        Self {
            problem_summary: s.problem_summary,
            solution_summary: s.solution_summary,
            solution: s.solution,
            explanation: s.explanation,
            formulas: s.formulas,
            final_answer: s.final_answer,
        }
    }
}

// ---------------------------------------------------------------------------
// Analyze
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeBody {
    pub problem_text: Option<String>,
    pub problem_photo_data_uri: Option<String>,
    /// The student's solution as text
    pub solution_text: Option<String>,
    /// Photos of the student's solution, in page order
    #[serde(default)]
    pub solution_photo_data_uris: Vec<String>,
}

impl TryFrom<AnalyzeBody> for AnalyzeRequest {
    type Error = AppError;

    fn try_from(body: AnalyzeBody) -> Result<Self, AppError> {
        let solution_images = body
            .solution_photo_data_uris
            .into_iter()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| ImageRef::parse(&raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AnalyzeRequest {
            problem_text: optional_text(body.problem_text),
            problem_image: optional_image(body.problem_photo_data_uri)?,
            solution_text: optional_text(body.solution_text),
            solution_images,
        })
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub solution: String,
    pub error_analysis: String,
    /// Score, e.g. "7/10 puncte"
    pub rating: String,
}

impl From<AnalysisFeedback> for AnalyzeResponse {
    fn from(f: AnalysisFeedback) -> Self {
        Self {
            solution: f.solution,
            error_analysis: f.error_analysis,
            rating: f.rating,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Model calls waiting in (or running through) the request throttle
    pub queued: usize,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
