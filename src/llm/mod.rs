//! LLM capability
//!
//! The planner needs exactly one thing from a model: turn a prompt into text.

mod openai;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::ChatCompletionsClient;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM returned an empty completion")]
    EmptyCompletion,

    #[error("No API key configured for {0}")]
    MissingApiKey(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete a prompt into free-form text
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier for logging
    fn model(&self) -> &str;
}
