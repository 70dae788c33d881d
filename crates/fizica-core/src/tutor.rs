use crate::error::AppError;
use crate::extract::{ResponseExtractor, ResponseSchema};
use crate::models::{
    AnalysisFeedback, AnalyzeRequest, ChatMessage, ChatOptions, SolveRequest, WorkedSolution,
};
use crate::prompts;
use crate::throttle::RequestThrottle;
use crate::traits::ChatProvider;

/// Orchestrates the two tutor flows: validate → prompt → throttled call → extract.
///
/// Generic over the chat provider so tests can inject a mock. Every provider
/// call goes through the injected [`RequestThrottle`]; share one throttle
/// between all services in a process.
#[derive(Clone)]
pub struct TutorService<P: ChatProvider> {
    provider: P,
    throttle: RequestThrottle,
    options: ChatOptions,
    solve_extractor: ResponseExtractor,
    analyze_extractor: ResponseExtractor,
}

impl<P: ChatProvider> TutorService<P> {
    pub fn new(provider: P, throttle: RequestThrottle) -> Self {
        Self {
            provider,
            throttle,
            options: ChatOptions::default(),
            solve_extractor: ResponseExtractor::new(ResponseSchema::worked_solution()),
            analyze_extractor: ResponseExtractor::new(ResponseSchema::analysis()),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn throttle(&self) -> &RequestThrottle {
        &self.throttle
    }

    fn model(&self) -> &str {
        self.options
            .model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Produce a worked solution for a problem given as text, image, or both.
    pub async fn solve(&self, request: &SolveRequest) -> Result<WorkedSolution, AppError> {
        request.validate()?;

        let messages = prompts::solve_messages(request);
        tracing::info!(
            model = %self.model(),
            has_text = request.problem_text.is_some(),
            has_image = request.problem_image.is_some(),
            "Solving problem"
        );

        let raw = self.complete(&messages).await?;
        let parsed = self.solve_extractor.extract(&raw);
        tracing::info!(recovery = ?parsed.recovery(), "Solution extracted");

        Ok(WorkedSolution::from(&parsed))
    }

    /// Grade a student's attempt against the problem.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisFeedback, AppError> {
        request.validate()?;

        let messages = prompts::analyze_messages(request);
        tracing::info!(
            model = %self.model(),
            solution_images = request.solution_images.len(),
            "Analyzing solution"
        );

        let raw = self.complete(&messages).await?;
        let parsed = self.analyze_extractor.extract(&raw);
        tracing::info!(recovery = ?parsed.recovery(), "Analysis extracted");

        Ok(AnalysisFeedback::from(&parsed))
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AppError> {
        self.throttle
            .run(|| self.provider.complete(messages, &self.options))
            .await
    }
}
