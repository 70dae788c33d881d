//! Test utilities: a scripted [`ChatProvider`].
//!
//! Handwritten mock for dependency injection in unit and integration tests.
//! Uses `Arc<Mutex<_>>` for interior mutability so tests can assert on the
//! recorded calls.

use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::{ChatMessage, ChatOptions};
use crate::traits::ChatProvider;

/// Reply returned once the scripted queue is exhausted.
pub const DEFAULT_REPLY: &str = r#"{"solution": "default"}"#;

/// Mock provider that pops scripted replies and records every call.
#[derive(Clone, Default)]
pub struct MockProvider {
    /// Queue of replies. Each call pops the first element.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    pub calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl MockProvider {
    pub fn new(reply: &str) -> Self {
        Self::with_responses(vec![Ok(reply.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ChatProvider for MockProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &ChatOptions,
    ) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(DEFAULT_REPLY.to_string())
        } else {
            responses.remove(0)
        }
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }
}
