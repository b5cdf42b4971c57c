//! Error taxonomy shared by every layer of the hostel service.
//!
//! Handlers translate these into HTTP responses at the request boundary;
//! nothing below that boundary retries on any of them.

use thiserror::Error;

/// Result alias used throughout the domain and storage layers.
pub type Result<T> = std::result::Result<T, HostelError>;

/// Errors produced by domain operations, stores and gateways.
#[derive(Error, Debug)]
pub enum HostelError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Kind of entity (e.g. "Booking").
        entity: &'static str,
        /// Identifier that failed to resolve.
        id: String,
    },

    /// The operation is not valid for the entity's current status.
    #[error("{0}")]
    InvalidState(String),

    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Conflict(String),

    /// The external payment gateway rejected or failed the request.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to perform the operation.
    #[error("{0}")]
    Forbidden(String),

    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Anything else unexpected.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HostelError {
    /// Shorthand for [`HostelError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for [`HostelError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`HostelError::InvalidState`].
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Shorthand for [`HostelError::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Shorthand for [`HostelError::Gateway`].
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Gateway(message.into())
    }

    /// Shorthand for [`HostelError::Storage`].
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = HostelError::not_found("Booking", "abc");
        assert_eq!(err.to_string(), "Booking with id abc not found");
    }

    #[test]
    fn test_gateway_message_passes_through() {
        let err = HostelError::gateway("Invalid PhoneNumber");
        assert_eq!(err.to_string(), "Payment gateway error: Invalid PhoneNumber");
    }
}
