use futures::FutureExt;
use futures::future::BoxFuture;

use fizica_core::error::AppError;
use fizica_core::models::{AnalysisFeedback, AnalyzeRequest, SolveRequest, WorkedSolution};
use fizica_core::traits::ChatProvider;
use fizica_core::tutor::TutorService;

/// Object-safe view of [`TutorService`] so route handlers stay non-generic.
pub trait Tutor: Send + Sync {
    fn solve<'a>(
        &'a self,
        request: &'a SolveRequest,
    ) -> BoxFuture<'a, Result<WorkedSolution, AppError>>;

    fn analyze<'a>(
        &'a self,
        request: &'a AnalyzeRequest,
    ) -> BoxFuture<'a, Result<AnalysisFeedback, AppError>>;

    /// Model calls admitted to the throttle and not yet finished.
    fn queued(&self) -> usize;
}

impl<P: ChatProvider + 'static> Tutor for TutorService<P> {
    fn solve<'a>(
        &'a self,
        request: &'a SolveRequest,
    ) -> BoxFuture<'a, Result<WorkedSolution, AppError>> {
        TutorService::solve(self, request).boxed()
    }

    fn analyze<'a>(
        &'a self,
        request: &'a AnalyzeRequest,
    ) -> BoxFuture<'a, Result<AnalysisFeedback, AppError>> {
        TutorService::analyze(self, request).boxed()
    }

    fn queued(&self) -> usize {
        self.throttle().pending()
    }
}

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub tutor: Box<dyn Tutor>,
}

impl AppState {
    pub fn new<P: ChatProvider + 'static>(tutor: TutorService<P>) -> Self {
        Self {
            tutor: Box::new(tutor),
        }
    }
}
