//! Error types for the Daraja client

use hostel_core::HostelError;
use thiserror::Error;

/// Errors that can occur when talking to the Daraja API
#[derive(Debug, Error)]
pub enum MpesaError {
    /// HTTP request failed before a response arrived
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// No response within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Response body could not be parsed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Consumer key/secret were refused
    #[error("Failed to generate access token: {0}")]
    TokenRejected(String),

    /// API returned an error; `message` is Daraja's own `errorMessage` when present
    #[error("{message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },

    /// The STK push was answered with a non-zero `ResponseCode`
    #[error("{description}")]
    Declined {
        /// `ResponseCode`
        code: String,
        /// `ResponseDescription`
        description: String,
    },

    /// Callback body did not have the expected shape
    #[error("Malformed callback: {0}")]
    MalformedCallback(String),
}

impl From<reqwest::Error> for MpesaError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::RequestFailed(e.to_string())
        }
    }
}

impl From<MpesaError> for HostelError {
    fn from(e: MpesaError) -> Self {
        Self::Gateway(e.to_string())
    }
}
