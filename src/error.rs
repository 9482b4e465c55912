//! Error types for xsd-check
//!
//! These errors cover load-level failures only: a resolver that cannot be
//! read, text that is not well-formed XML, a document whose root is not a
//! schema. Rule violations found while validating a loaded document set are
//! never returned as errors; they are collected as problems in the
//! [`ValidationContext`](crate::validators::ValidationContext).

use std::fmt;
use thiserror::Error;

/// Result type alias using xsd-check Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xsd-check operations
#[derive(Error, Debug)]
pub enum Error {
    /// Schema document could not be turned into an object tree
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Value error (text that does not convert to the expected value)
    #[error("value error: {0}")]
    Value(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// A value was requested from a state that does not carry one
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Schema document parsing error
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Location in the schema file
    pub location: Option<String>,
    /// Identifier of the document being read
    pub document: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            document: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the document identifier
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref doc) = self.document {
            write!(f, "\n\nDocument: {}", doc)?;
        }

        if let Some(ref loc) = self.location {
            write!(f, "\n\nLocation: {}", loc)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("Expected xs:schema root element, got html")
            .with_location("3:1")
            .with_document("file:///tmp/a.xsd");

        let msg = format!("{}", err);
        assert!(msg.contains("Expected xs:schema root element"));
        assert!(msg.contains("Location: 3:1"));
        assert!(msg.contains("Document: file:///tmp/a.xsd"));
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ParseError::new("test").into();
        assert!(matches!(err, Error::Parse(_)));

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_invalid_state_message() {
        let err = Error::InvalidState("count is unbounded".to_string());
        assert_eq!(err.to_string(), "invalid state: count is unbounded");
    }
}
