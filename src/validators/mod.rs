//! Schema set validation
//!
//! A document set is loaded into a [`ValidationContext`] and checked by four
//! passes run in a fixed order, each a [`SchemaVisitor`] driven by the
//! [`TreeWalker`]:
//!
//! 1. prevalidation: per-component rules and attribute conversions
//! 2. registration: global definitions into per-document name registers
//! 3. merge: names made visible across includes and imports
//! 4. validation: cross-references and directive targets
//!
//! Findings are [`ValidationProblem`]s collected in the context and drained
//! through a [`ProblemHandler`].

pub mod builtins;
pub mod context;
pub mod handlers;
pub mod loader;
pub mod prevalidation;
pub mod problems;
pub mod registers;
pub mod registration;
pub mod validation;
pub mod walker;

pub use builtins::{builtin_type, is_xml_attribute, BuiltinKind};
pub use context::ValidationContext;
pub use handlers::{CompositeHandler, ConsoleHandler, ProblemHandler, RecordingHandler};
pub use loader::{load, validate_schemas, SchemaLoader, WRAPPER_PREFIX};
pub use prevalidation::prevalidate_pass;
pub use problems::{ProblemLocation, ProblemRecord, ProblemSubject, Severity, ValidationProblem};
pub use registers::{CategoryTables, NameCategory, NameConflict, NameRegister};
pub use registration::{merge_pass, register_pass};
pub use validation::validate_pass;
pub use walker::{SchemaVisitor, TreeWalker};

pub use crate::resolvers::{FileResolver, MemoryLibrary, MemoryResolver, SchemaResolver};
