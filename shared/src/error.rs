use serde::{Serialize, Deserialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    #[error("Invalid input provided")]
    InvalidInput,
    #[error("Voter not found")]
    NotFound,
    #[error("Voter already exists")]
    AlreadyExists,
    #[error("Poll not found in voter history")]
    PollNotFound,
    #[error("Voter history already exists for that poll")]
    DuplicatePoll,
    #[error("Storage unavailable")]
    StorageUnavailable,
    #[error("Internal system error")]
    SystemError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<ErrorCode>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into(), code: None }
    }

    pub fn with_code(code: ErrorCode, error: impl Into<String>) -> Self {
        Self { error: error.into(), code: Some(code) }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{}: {}", code, self.error),
            None => write!(f, "{}", self.error),
        }
    }
}
