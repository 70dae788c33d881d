pub mod chat;

pub use chat::{ChatClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
