//! Shared Error Types
//!
//! Errors raised while checking inbound payloads against the wire types in
//! `shared`.
//!
//! # Usage
//!
//! ```rust
//! use clawswarm::shared::error::SharedError;
//!
//! let error = SharedError::validation("content", "message too long");
//! assert!(error.to_string().contains("content"));
//! ```
use thiserror::Error;

/// Errors raised by shared types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let SharedError::ValidationError { field, message } = SharedError::validation("name", "must not be empty");
        assert_eq!(field, "name");
        assert_eq!(message, "must not be empty");
    }

    #[test]
    fn test_error_display() {
        let error = SharedError::validation("content", "message too long");
        let display = error.to_string();
        assert!(display.contains("Validation error"));
        assert!(display.contains("'content'"));
        assert!(display.contains("message too long"));
    }
}
