use std::sync::LazyLock;
use std::time::Duration;

use fizica_core::error::AppError;
use fizica_core::models::{ChatMessage, ChatOptions, ContentPart, ImageRef};
use fizica_core::traits::ChatProvider;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Per text part, before it is sent.
const MAX_PART_CHARS: usize = 4000;
/// Per flattened message, for text-only models.
const MAX_FLAT_MESSAGE_CHARS: usize = 8000;

static VISION_MODEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(vision|vl|llava|multimodal|scout)").expect("valid vision model regex")
});

/// OpenAI-compatible chat-completion client (Groq by default).
///
/// Vision-capable models receive multi-part content with the images
/// attached. Text-only models receive one flattened string per message,
/// with images replaced by a short hint.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl ChatClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self, AppError> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Result<Self, AppError> {
        Self::build(api_key, model, base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(self, timeout: Duration) -> Result<Self, AppError> {
        Self::build(&self.api_key, &self.model, &self.base_url, timeout)
    }

    fn build(
        api_key: &str,
        model: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::ConfigError("chat API key is not set".into()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

// ---- Chat Completions API types ----

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: WireContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent {
    Flat(String),
    Parts(Vec<WirePart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ---- Message shaping ----

pub fn is_vision_model(model: &str) -> bool {
    VISION_MODEL.is_match(model)
}

/// Cut `text` to `max` characters, marking the cut with an ellipsis.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => format!("{}…", &text[..byte_index]),
        None => text.to_string(),
    }
}

fn image_hint(part: &ImageRef) -> String {
    if part.is_inline() {
        "Imagine atașată (omisă pentru model text-only)".to_string()
    } else {
        format!("Imagine atașată: {}", part.as_str())
    }
}

fn vision_message(message: &ChatMessage) -> WireMessage {
    let parts = message
        .content
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => WirePart::Text {
                text: truncate_chars(text, MAX_PART_CHARS),
            },
            ContentPart::Image(image) => WirePart::ImageUrl {
                image_url: ImageUrl {
                    url: image.as_str().to_string(),
                },
            },
        })
        .collect();

    WireMessage {
        role: message.role.as_str(),
        content: WireContent::Parts(parts),
    }
}

fn text_only_message(message: &ChatMessage) -> WireMessage {
    let flat = message
        .content
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => truncate_chars(text, MAX_PART_CHARS),
            ContentPart::Image(image) => image_hint(image),
        })
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    WireMessage {
        role: message.role.as_str(),
        content: WireContent::Flat(flat.chars().take(MAX_FLAT_MESSAGE_CHARS).collect()),
    }
}

fn wire_messages(messages: &[ChatMessage], vision: bool) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| {
            if vision {
                vision_message(m)
            } else {
                text_only_message(m)
            }
        })
        .collect()
}

fn status_error(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    if status == StatusCode::TOO_MANY_REQUESTS {
        AppError::RateLimitExceeded(message)
    } else {
        AppError::LlmError {
            message,
            status_code: status.as_u16(),
        }
    }
}

impl ChatProvider for ChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        let model = options.model.as_deref().unwrap_or(&self.model);
        let vision = is_vision_model(model);

        let request = ChatRequest {
            model,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            messages: wire_messages(messages, vision),
        };
        tracing::debug!(model, vision, messages = messages.len(), "Sending chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {}", e))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse chat response: {}", e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AppError::LlmError {
                message: "Chat API returned no content".into(),
                status_code: status.as_u16(),
            })
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}
