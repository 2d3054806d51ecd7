use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LenderError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("validation failed: {} field error(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LenderError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Unauthenticated(_) => 401,
            Self::Forbidden(_) => 403,
            Self::Conflict(_) => 409,
            Self::InvalidInput(_) => 400,
            Self::Validation(_) => 422,
            Self::Internal(_) => 500,
        }
    }

    /// Message safe to hand back to a client. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::NotFound(m)
            | Self::Unauthenticated(m)
            | Self::Forbidden(m)
            | Self::Conflict(m)
            | Self::InvalidInput(m) => m.clone(),
            Self::Validation(_) => "Validation failed".into(),
            Self::Internal(_) => "Internal Server Error".into(),
        }
    }
}

/// One rejected request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub type Result<T> = std::result::Result<T, LenderError>;
