//! API error type

use serde_json::Value;
use taskline_session::BackendError;
use thiserror::Error;

/// Result type alias for API calls
pub type Result<T> = std::result::Result<T, ApiError>;

/// Message used when the server cannot be reached
pub const NETWORK_ERROR_MESSAGE: &str = "Network error: Unable to reach the server";

/// Error returned by the Taskline API
///
/// `code` is the HTTP status (or the code from a standardized error body);
/// `0` means the request never got a response.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    pub code: u16,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details from the error body
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// The server could not be reached
    pub fn network() -> Self {
        Self::new(0, NETWORK_ERROR_MESSAGE)
    }

    /// A response arrived but could not be understood
    pub fn unexpected() -> Self {
        Self::new(0, "An unexpected error occurred")
    }

    pub fn is_status(&self, status: u16) -> bool {
        self.code == status
    }

    /// 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.code)
    }

    /// 5xx
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.code)
    }

    pub fn is_network_error(&self) -> bool {
        self.code == 0
    }

    /// Friendly text for well-known codes, else the server's message
    pub fn user_message(&self) -> &str {
        match self.code {
            0 => "Unable to connect to the server. Please check your internet connection.",
            400 => "The request was invalid. Please check your input and try again.",
            401 => "You need to log in to access this resource.",
            403 => "You don't have permission to access this resource.",
            404 => "The requested resource could not be found.",
            409 => "This action conflicts with existing data.",
            500 => "An error occurred on the server. Please try again later.",
            502 => "The server is temporarily unavailable. Please try again later.",
            503 => "The service is temporarily unavailable. Please try again later.",
            _ => &self.message,
        }
    }
}

impl From<ApiError> for BackendError {
    fn from(e: ApiError) -> Self {
        BackendError::new(e.message)
    }
}
