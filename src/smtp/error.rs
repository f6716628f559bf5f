//! Error types for the SMTP layer

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unrecognized command: {0}")]
    ProtocolViolation(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Invalid base64 payload")]
    InvalidBase64,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Maps SMTP errors to appropriate response codes
impl SmtpError {
    pub fn to_response_code(&self) -> &'static str {
        match self {
            SmtpError::Io(_) => "421",
            SmtpError::ProtocolViolation(_) => "500",
            SmtpError::AuthRequired => "535",
            SmtpError::InvalidBase64 => "501",
            SmtpError::Store(_) => "451",
        }
    }

    pub fn to_response_message(&self) -> String {
        match self {
            SmtpError::Io(_) => "Service not available".to_string(),
            SmtpError::ProtocolViolation(_) => "Syntax error, command unrecognized".to_string(),
            SmtpError::AuthRequired => "Incorrect authentication data".to_string(),
            SmtpError::InvalidBase64 => "Cannot decode response".to_string(),
            SmtpError::Store(_) => "Requested action aborted: local error".to_string(),
        }
    }
}
