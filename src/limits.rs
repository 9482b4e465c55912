//! Limits for loading schema document sets
//!
//! A schema set is pulled in through includes and imports that the caller
//! does not control, so loading is bounded by these limits.

use crate::error::{Error, Result};

/// Load limits configuration
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum schema text size in bytes
    pub max_schema_size: usize,

    /// Maximum number of documents loaded by one `load` call
    pub max_documents: usize,

    /// Maximum number of components in one document
    pub max_components: usize,

    /// Maximum element nesting depth in one document
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_schema_size: 16 * 1024 * 1024, // 16 MB
            max_documents: 1000,
            max_components: 100000,
            max_depth: 256,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_schema_size: 1024 * 1024, // 1 MB
            max_documents: 64,
            max_components: 10000,
            max_depth: 64,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_schema_size: 256 * 1024 * 1024, // 256 MB
            max_documents: 100000,
            max_components: 10000000,
            max_depth: 4096,
        }
    }

    /// Check if schema text size is within limits
    pub fn check_schema_size(&self, size: usize) -> Result<()> {
        if size > self.max_schema_size {
            Err(Error::LimitExceeded(format!(
                "schema size {} bytes exceeds maximum {} bytes",
                size, self.max_schema_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of loaded documents is within limits
    pub fn check_documents(&self, count: usize) -> Result<()> {
        if count > self.max_documents {
            Err(Error::LimitExceeded(format!(
                "document count {} exceeds maximum {}",
                count, self.max_documents
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the number of components in a document is within limits
    pub fn check_components(&self, count: usize) -> Result<()> {
        if count > self.max_components {
            Err(Error::LimitExceeded(format!(
                "component count {} exceeds maximum {}",
                count, self.max_components
            )))
        } else {
            Ok(())
        }
    }

    /// Check if element nesting depth is within limits
    pub fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            Err(Error::LimitExceeded(format!(
                "nesting depth {} exceeds maximum {}",
                depth, self.max_depth
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_documents, 1000);
        assert!(limits.check_documents(500).is_ok());
        assert!(limits.check_documents(1500).is_err());
    }

    #[test]
    fn test_strict_limits() {
        let limits = Limits::strict();
        assert!(limits.max_schema_size < Limits::default().max_schema_size);
        assert!(limits.check_schema_size(2 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_permissive_limits() {
        let limits = Limits::permissive();
        assert!(limits.max_depth > Limits::default().max_depth);
        assert!(limits.check_depth(1000).is_ok());
    }

    #[test]
    fn test_check_components() {
        let limits = Limits::strict();
        assert!(limits.check_components(10000).is_ok());
        assert!(matches!(
            limits.check_components(10001),
            Err(Error::LimitExceeded(_))
        ));
    }
}
