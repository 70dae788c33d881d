pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod prompts;
pub mod throttle;
pub mod traits;
pub mod tutor;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use error::{AppError, Classify, ErrorClass};
pub use extract::{ParsedResult, ResponseExtractor, ResponseSchema};
pub use models::{AnalysisFeedback, AnalyzeRequest, ImageRef, SolveRequest, WorkedSolution};
pub use throttle::{RequestThrottle, ThrottleConfig, run_throttled};
pub use traits::ChatProvider;
pub use tutor::TutorService;
