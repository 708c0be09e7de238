use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown form field '{0}'")]
    UnknownField(String),
    #[error("invalid studying answer '{0}', expected yes or no")]
    InvalidStudyingAnswer(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Transport,
    Status,
    MalformedBody,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{category:?}: {message}")]
pub struct SubmissionFailure {
    pub category: FailureCategory,
    pub message: String,
}

impl SubmissionFailure {
    pub fn new(category: FailureCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self.category {
            FailureCategory::Transport => {
                format!("Could not reach the server; check your network and retry. ({})", self.message)
            }
            FailureCategory::Status => format!("The server rejected the form: {}", self.message),
            FailureCategory::MalformedBody => {
                "The server sent a response that could not be read.".to_string()
            }
            FailureCategory::Timeout => "The server took too long to answer; retry.".to_string(),
        }
    }
}
