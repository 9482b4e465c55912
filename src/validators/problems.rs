//! Validation problems
//!
//! Rule violations found while validating a document set are collected as
//! [`ValidationProblem`]s rather than returned as errors, so one document's
//! mistakes never hide the diagnostics of the rest of the set.

use std::fmt;

use serde::Serialize;

use crate::documents::TextPosition;
use crate::model::ComponentId;

use super::context::ValidationContext;

/// Problem severity, ordered by blocking effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Recognized but unsupported construct
    Unimplemented,
    /// Suspicious but legal
    Warning,
    /// Definite rule violation
    Error,
    /// Violation that makes the subtree meaningless to analyze further
    Fatal,
}

impl Severity {
    /// Every severity, lowest first
    pub const ALL: [Severity; 4] = [
        Severity::Unimplemented,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    /// Upper-case label used in console output
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Unimplemented => "UNIMPLEMENTED",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Check if problems of this severity fail a validation run
    pub fn is_blocking(&self) -> bool {
        *self >= Severity::Error
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Place in a schema document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemLocation {
    /// Identifier of the document
    pub document: Option<String>,
    /// Position in the document text
    pub position: Option<TextPosition>,
}

impl ProblemLocation {
    /// Create a location
    pub fn new(document: impl Into<String>, position: Option<TextPosition>) -> Self {
        Self {
            document: Some(document.into()),
            position,
        }
    }
}

impl fmt::Display for ProblemLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.document, &self.position) {
            (Some(doc), Some(pos)) => write!(f, "{}:{}", doc, pos),
            (Some(doc), None) => write!(f, "{}", doc),
            (None, Some(pos)) => write!(f, "{}", pos),
            (None, None) => write!(f, "<unknown>"),
        }
    }
}

/// What a problem is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProblemSubject {
    /// A component of a loaded document
    Component(ComponentId),
    /// A place where no component could be built
    Location(ProblemLocation),
}

impl ProblemSubject {
    /// Component, unless this is a location placeholder
    pub fn component(&self) -> Option<ComponentId> {
        match self {
            ProblemSubject::Component(id) => Some(*id),
            ProblemSubject::Location(_) => None,
        }
    }
}

impl From<ComponentId> for ProblemSubject {
    fn from(id: ComponentId) -> Self {
        ProblemSubject::Component(id)
    }
}

impl From<ProblemLocation> for ProblemSubject {
    fn from(location: ProblemLocation) -> Self {
        ProblemSubject::Location(location)
    }
}

/// One finding of a validation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationProblem {
    /// Severity
    pub severity: Severity,
    /// What is wrong
    pub message: String,
    /// Offending component or location placeholder
    pub subject: ProblemSubject,
    /// Where the subject is, captured when the problem was created
    pub location: ProblemLocation,
    /// Short description of the offending component
    pub component: Option<String>,
}

impl ValidationProblem {
    /// Human-readable description
    pub fn description(&self) -> String {
        match &self.component {
            Some(component) => format!("{}: {}: {}", self.location, component, self.message),
            None => format!("{}: {}", self.location, self.message),
        }
    }

    /// Serializable form
    pub fn record(&self) -> ProblemRecord {
        ProblemRecord {
            severity: self.severity,
            message: self.message.clone(),
            component: self.component.clone(),
            document: self.location.document.clone(),
            line: self.location.position.map(|p| p.line),
            column: self.location.position.map(|p| p.column),
        }
    }
}

impl fmt::Display for ValidationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.description())
    }
}

/// Flat, serializable problem record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemRecord {
    /// Severity
    pub severity: Severity,
    /// Message
    pub message: String,
    /// Offending component
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Document identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    /// Line number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Column number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

/// Problems gathered while checking one component, applied afterwards
///
/// Checks borrow the context immutably; the findings are recorded once the
/// borrow ends.
#[derive(Debug, Default)]
pub(crate) struct Findings {
    items: Vec<(Severity, String)>,
}

impl Findings {
    pub(crate) fn unimplemented(&mut self, message: impl Into<String>) {
        self.items.push((Severity::Unimplemented, message.into()));
    }

    pub(crate) fn warning(&mut self, message: impl Into<String>) {
        self.items.push((Severity::Warning, message.into()));
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.items.push((Severity::Error, message.into()));
    }

    pub(crate) fn fatal(&mut self, message: impl Into<String>) {
        self.items.push((Severity::Fatal, message.into()));
    }

    /// Record every finding against a component
    pub(crate) fn apply(self, ctx: &mut ValidationContext, id: ComponentId) {
        for (severity, message) in self.items {
            match severity {
                Severity::Unimplemented => ctx.add_unimplemented(id, message),
                Severity::Warning => ctx.add_warning(id, message),
                Severity::Error => {
                    ctx.add_error(id, message);
                }
                Severity::Fatal => ctx.add_fatal(id, message),
            }
        }
    }
}
