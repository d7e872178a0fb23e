//! Error types for the conversational engine.

use std::time::Duration;

/// Errors from the chat engine.
///
/// None of these terminate a session: [`crate::ChatSession`] turns each one
/// into an apology reply with category `error`.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("generation backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("generation error: {0}")]
    Generation(String),
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            ChatError::BackendUnavailable(err.to_string())
        } else {
            ChatError::Generation(err.to_string())
        }
    }
}
