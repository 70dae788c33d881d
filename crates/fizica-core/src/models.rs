use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;
use crate::extract::ParsedResult;

// ---------------------------------------------------------------------------
// Chat payload
// ---------------------------------------------------------------------------

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// An image attached to a message: inline `data:` URI or a remote `http(s)` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    /// Validate a raw image reference.
    ///
    /// Inline images must be base64 data URIs (`data:<mime>;base64,<payload>`).
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        let url = Url::parse(trimmed)
            .map_err(|e| AppError::ValidationError(format!("Invalid image reference: {e}")))?;

        match url.scheme() {
            "data" => {
                let (meta, payload) = url.path().split_once(',').ok_or_else(|| {
                    AppError::ValidationError("Data URI is missing its payload".into())
                })?;
                if !meta.ends_with(";base64") || payload.is_empty() {
                    return Err(AppError::ValidationError(
                        "Data URI must be base64-encoded: data:<mimetype>;base64,<data>".into(),
                    ));
                }
            }
            "http" | "https" => {}
            other => {
                return Err(AppError::ValidationError(format!(
                    "Unsupported image URL scheme '{other}'"
                )));
            }
        }

        Ok(Self(trimmed.to_string()))
    }

    /// True for inline `data:` URIs.
    pub fn is_inline(&self) -> bool {
        self.0
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One part of a multi-part message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image(ImageRef),
}

/// A role-tagged message sent to the chat-completion provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    pub fn new(role: Role, content: Vec<ContentPart>) -> Self {
        Self { role, content }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentPart::Text(text.into())])
    }
}

/// Generation parameters for a single completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    /// Overrides the provider's default model when set.
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A problem to be solved from scratch.
#[derive(Debug, Clone, Default)]
pub struct SolveRequest {
    pub problem_text: Option<String>,
    pub problem_image: Option<ImageRef>,
    /// Free-form hint, e.g. which exercise to solve when the photo has several.
    pub additional_context: Option<String>,
}

/// A problem together with the student's attempt, to be graded.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    pub problem_text: Option<String>,
    pub problem_image: Option<ImageRef>,
    pub solution_text: Option<String>,
    pub solution_images: Vec<ImageRef>,
}

/// Returns the trimmed text if it has any content.
pub(crate) fn non_blank(text: &Option<String>) -> Option<&str> {
    text.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

impl SolveRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if non_blank(&self.problem_text).is_none() && self.problem_image.is_none() {
            return Err(AppError::ValidationError(
                "Trebuie furnizat cel puțin textul problemei sau o imagine a problemei.".into(),
            ));
        }
        Ok(())
    }
}

impl AnalyzeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if non_blank(&self.problem_text).is_none() && self.problem_image.is_none() {
            return Err(AppError::ValidationError(
                "Trebuie furnizat cel puțin textul problemei sau o imagine a problemei.".into(),
            ));
        }
        if non_blank(&self.solution_text).is_none() && self.solution_images.is_empty() {
            return Err(AppError::ValidationError(
                "Este necesară soluția ta: text sau cel puțin o imagine.".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Graded feedback on a student's solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisFeedback {
    /// The correct solution.
    pub solution: String,
    /// Mistakes found in the student's attempt.
    pub error_analysis: String,
    /// Score, e.g. "7/10 puncte".
    pub rating: String,
}

impl From<&ParsedResult> for AnalysisFeedback {
    fn from(parsed: &ParsedResult) -> Self {
        Self {
            solution: parsed.text("solution").to_string(),
            error_analysis: parsed.text("errorAnalysis").to_string(),
            rating: parsed.text("rating").to_string(),
        }
    }
}

/// A worked solution produced by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkedSolution {
    pub problem_summary: String,
    pub solution_summary: String,
    pub solution: String,
    pub explanation: String,
    pub formulas: Vec<String>,
    pub final_answer: String,
}

impl From<&ParsedResult> for WorkedSolution {
    fn from(parsed: &ParsedResult) -> Self {
        Self {
            problem_summary: parsed.text("problemSummary").to_string(),
            solution_summary: parsed.text("solutionSummary").to_string(),
            solution: parsed.text("solution").to_string(),
            explanation: parsed.text("explanation").to_string(),
            formulas: parsed.list("formulas").to_vec(),
            final_answer: parsed.text("finalAnswer").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn image_ref_accepts_data_uri_and_urls() {
        let inline = ImageRef::parse(PNG).unwrap();
        assert!(inline.is_inline());
        assert_eq!(inline.as_str(), PNG);

        let remote = ImageRef::parse(" https://example.com/problema.jpg ").unwrap();
        assert!(!remote.is_inline());
        assert_eq!(remote.as_str(), "https://example.com/problema.jpg");
    }

    #[test]
    fn image_ref_rejects_bad_input() {
        assert!(matches!(
            ImageRef::parse("not an image"),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            ImageRef::parse("ftp://example.com/a.png"),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            ImageRef::parse("data:image/png,raw-bytes"),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            ImageRef::parse("data:image/png;base64,"),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn solve_request_needs_text_or_image() {
        assert!(SolveRequest::default().validate().is_err());
        assert!(
            SolveRequest {
                problem_text: Some("   ".into()),
                ..Default::default()
            }
            .validate()
            .is_err()
        );
        assert!(
            SolveRequest {
                problem_text: Some("Un corp cade liber de la 20 m.".into()),
                ..Default::default()
            }
            .validate()
            .is_ok()
        );
        assert!(
            SolveRequest {
                problem_image: Some(ImageRef::parse(PNG).unwrap()),
                ..Default::default()
            }
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn analyze_request_needs_problem_and_solution() {
        let missing_solution = AnalyzeRequest {
            problem_text: Some("Problema".into()),
            ..Default::default()
        };
        assert!(missing_solution.validate().is_err());

        let missing_problem = AnalyzeRequest {
            solution_text: Some("v = 20 m/s".into()),
            ..Default::default()
        };
        assert!(missing_problem.validate().is_err());

        let complete = AnalyzeRequest {
            problem_text: Some("Problema".into()),
            solution_images: vec![ImageRef::parse(PNG).unwrap()],
            ..Default::default()
        };
        assert!(complete.validate().is_ok());
    }

    #[test]
    fn outcomes_serialize_in_camel_case() {
        let feedback = AnalysisFeedback {
            solution: "s".into(),
            error_analysis: "e".into(),
            rating: "7/10 puncte".into(),
        };
        let json = serde_json::to_value(&feedback).unwrap();
        assert_eq!(json["errorAnalysis"], "e");
        assert_eq!(json["rating"], "7/10 puncte");
    }
}
