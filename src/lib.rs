//! # xsd-check
//!
//! Structural validation of XML Schema (XSD 1.0) document sets.
//!
//! A set of schema documents, possibly spread over several files that
//! include and import each other, some sharing a namespace and some without
//! one, is read into an arena object model and checked for:
//!
//! - unique global names per namespace and symbol space
//! - legal occurrence bounds and enumerated attribute values
//! - consistent namespace qualification, including chameleon inclusion
//! - resolvable references across the whole document set
//!
//! Problems are collected rather than returned as errors, so one broken
//! document never hides the diagnostics of the others.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use xsd_check::validators::{load, validate_schemas, MemoryLibrary, ValidationContext};
//!
//! let library = Arc::new(MemoryLibrary::new().with(
//!     "order.xsd",
//!     r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
//!                  xmlns:o="urn:order" targetNamespace="urn:order">
//!          <xs:element name="order" type="o:Order"/>
//!          <xs:complexType name="Order"/>
//!        </xs:schema>"#,
//! ));
//!
//! let mut ctx = ValidationContext::new();
//! let documents = load(&library.resolvers(), None, &mut ctx)?;
//! validate_schemas(&documents, &mut ctx);
//! assert_eq!(ctx.error_count(), 0);
//! # Ok::<(), xsd_check::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;

pub mod namespaces;
pub mod names;
pub mod locations;

pub mod documents;
pub mod resolvers;

pub mod model;
pub mod validators;

pub use error::{Error, ParseError, Result};
pub use limits::Limits;
pub use validators::{load, validate_schemas, SchemaLoader, ValidationContext};

/// Version of the xsd-check library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
