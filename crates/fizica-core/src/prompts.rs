//! Romanian prompt construction for the solve and analyze flows.

use crate::models::{AnalyzeRequest, ChatMessage, ContentPart, Role, SolveRequest, non_blank};

pub const SOLVE_SYSTEM_PROMPT: &str = "\
Ești un profesor de fizică experimentat. Rezolvă problema primită (text, imagine sau ambele) \
pas cu pas și răspunde exclusiv în limba română.

Răspunde DOAR cu un obiect JSON, fără text înainte sau după, cu exact aceste chei:
{
  \"problemSummary\": \"enunțul problemei, reformulat pe scurt\",
  \"solutionSummary\": \"ideea rezolvării în una sau două propoziții\",
  \"solution\": \"rezolvarea completă, pas cu pas\",
  \"explanation\": \"de ce se aplică fiecare lege sau formulă folosită\",
  \"formulas\": [\"formulă 1\", \"formulă 2\"],
  \"finalAnswer\": \"rezultatul final, cu unitatea de măsură\"
}

Toate valorile sunt șiruri de caractere, cu excepția lui formulas, care este o listă de șiruri. \
Scrie formulele în LaTeX între $$ ... $$.";

pub const ANALYZE_SYSTEM_PROMPT: &str = "\
Ești un profesor de fizică și un evaluator corect. Primești o problemă de fizică și soluția \
încercată de un elev (text, imagini sau ambele). Răspunde exclusiv în limba română.

Compară soluția elevului cu un barem intern de 10 puncte, distribuite pe pașii rezolvării: \
identificarea datelor, alegerea legilor și formulelor, calculul numeric, unitatea de măsură.

Răspunde DOAR cu un obiect JSON, fără text înainte sau după, cu exact aceste chei:
{
  \"solution\": \"soluția corectă, pas cu pas, cu rezultatul final\",
  \"errorAnalysis\": \"greșelile din soluția elevului și de ce sunt greșeli\",
  \"rating\": \"X/10 puncte\"
}

Dacă soluția elevului este complet corectă, scrie în errorAnalysis: \
\"Soluția prezentată este corectă. Nu au fost detectate erori.\"";

const JSON_ONLY_REMINDER: &str = "Răspunde doar cu obiectul JSON cerut.";

/// System and user messages for solving a problem.
pub fn solve_messages(request: &SolveRequest) -> Vec<ChatMessage> {
    let mut parts = Vec::new();

    if let Some(text) = non_blank(&request.problem_text) {
        parts.push(ContentPart::Text(format!("Textul problemei:\n{text}")));
    }
    if let Some(image) = &request.problem_image {
        parts.push(ContentPart::Text("Imaginea problemei:".into()));
        parts.push(ContentPart::Image(image.clone()));
    }
    if let Some(context) = non_blank(&request.additional_context) {
        parts.push(ContentPart::Text(format!("Context suplimentar:\n{context}")));
    }
    parts.push(ContentPart::Text(JSON_ONLY_REMINDER.into()));

    vec![
        ChatMessage::system(SOLVE_SYSTEM_PROMPT),
        ChatMessage::new(Role::User, parts),
    ]
}

/// System and user messages for grading a student's solution.
pub fn analyze_messages(request: &AnalyzeRequest) -> Vec<ChatMessage> {
    let mut parts = Vec::new();

    if let Some(text) = non_blank(&request.problem_text) {
        parts.push(ContentPart::Text(format!("Textul problemei:\n{text}")));
    }
    if let Some(image) = &request.problem_image {
        parts.push(ContentPart::Text("Imaginea problemei:".into()));
        parts.push(ContentPart::Image(image.clone()));
    }
    if let Some(solution) = non_blank(&request.solution_text) {
        parts.push(ContentPart::Text(format!("Soluția elevului:\n{solution}")));
    }
    if !request.solution_images.is_empty() {
        parts.push(ContentPart::Text("Imagini cu soluția elevului:".into()));
        for (index, image) in request.solution_images.iter().enumerate() {
            parts.push(ContentPart::Text(format!("Imagine (Index {index}):")));
            parts.push(ContentPart::Image(image.clone()));
        }
    }
    parts.push(ContentPart::Text(JSON_ONLY_REMINDER.into()));

    vec![
        ChatMessage::system(ANALYZE_SYSTEM_PROMPT),
        ChatMessage::new(Role::User, parts),
    ]
}
