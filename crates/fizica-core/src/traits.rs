use std::future::Future;

use crate::error::AppError;
use crate::models::{ChatMessage, ChatOptions};

/// Sends a conversation to a chat-completion model and returns its text reply.
///
/// Implementations translate transport failures into the [`AppError`]
/// variants the request throttle classifies (`RateLimitExceeded`,
/// `NetworkError`, `Timeout`), so retries work without message sniffing.
pub trait ChatProvider: Send + Sync + Clone {
    fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Model used when [`ChatOptions::model`] is unset.
    fn default_model(&self) -> &str;
}
