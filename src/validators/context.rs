//! Validation context
//!
//! The [`ValidationContext`] owns everything a validation run produces: the
//! component and document arenas, the namespace bookkeeping, the problem
//! list with per-severity counters, the skip set of pruned subtrees and the
//! traversal marks of the current pass. It is passed explicitly to every
//! pass and cleared with [`ValidationContext::reset`] between runs.

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{Component, ComponentId, ComponentKind, DocumentId, SchemaDocument};
use crate::namespaces::QName;

use super::handlers::ProblemHandler;
use super::problems::{ProblemLocation, ProblemSubject, Severity, ValidationProblem};
use super::registers::NameCategory;

/// Arena sizes and counters at some point of a run
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    documents: usize,
    components: usize,
    problems: usize,
    counts: [usize; 4],
}

/// State of one validation run
#[derive(Default)]
pub struct ValidationContext {
    components: Vec<Component>,
    documents: Vec<SchemaDocument>,
    identifiers: IndexMap<String, DocumentId>,
    namespaces: HashMap<String, DocumentId>,
    duplicate_namespaces: HashSet<String>,
    problems: Vec<ValidationProblem>,
    counts: [usize; 4],
    skip: HashSet<ComponentId>,
    traversed: HashSet<ComponentId>,
    handler: Option<Box<dyn ProblemHandler>>,
}

impl ValidationContext {
    /// Create an empty context with no handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with an installed handler
    pub fn with_handler(handler: impl ProblemHandler + 'static) -> Self {
        let mut ctx = Self::new();
        ctx.set_handler(Box::new(handler));
        ctx
    }

    /// Install the handler used by [`report`](Self::report) and
    /// [`report_to_handler`](Self::report_to_handler)
    pub fn set_handler(&mut self, handler: Box<dyn ProblemHandler>) {
        self.handler = Some(handler);
    }

    /// Check for an installed handler
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Clear all run state, keeping the installed handler
    pub fn reset(&mut self) {
        let handler = self.handler.take();
        *self = Self {
            handler,
            ..Self::default()
        };
        debug!("validation context reset");
    }

    // Documents and components

    /// Append a document and its components to the arenas
    ///
    /// The components must have been built with ids starting at the current
    /// component count and owned by the next document id.
    pub fn add_document(
        &mut self,
        document: SchemaDocument,
        components: Vec<Component>,
    ) -> Result<DocumentId> {
        if self.identifiers.contains_key(&document.identifier) {
            return Err(Error::InvalidState(format!(
                "document '{}' is already loaded",
                document.identifier
            )));
        }
        if document.root.index() != self.components.len() {
            return Err(Error::InvalidState(format!(
                "document '{}' was built for arena offset {}, arena holds {} components",
                document.identifier,
                document.root.index(),
                self.components.len()
            )));
        }

        let id = DocumentId(self.documents.len());
        if let Some(namespace) = &document.target_namespace {
            self.register_namespace(namespace.clone(), id);
        }
        self.identifiers.insert(document.identifier.clone(), id);
        self.components.extend(components);
        self.documents.push(document);
        Ok(id)
    }

    fn register_namespace(&mut self, namespace: String, id: DocumentId) {
        if self.duplicate_namespaces.contains(&namespace) {
            return;
        }
        if self.namespaces.remove(&namespace).is_some() {
            debug!(namespace = %namespace, "namespace is declared by several documents");
            self.duplicate_namespaces.insert(namespace);
        } else {
            self.namespaces.insert(namespace, id);
        }
    }

    /// Record the arena sizes and problem counters
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            documents: self.documents.len(),
            components: self.components.len(),
            problems: self.problems.len(),
            counts: self.counts,
        }
    }

    /// Drop everything added since a checkpoint
    ///
    /// Used when a load fails halfway, so the context keeps only what it
    /// held before the load started.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        let Checkpoint {
            documents,
            components,
            problems,
            counts,
        } = checkpoint;
        debug!(
            dropped = self.documents.len().saturating_sub(documents),
            "rolling back partially loaded documents"
        );
        self.documents.truncate(documents);
        self.components.truncate(components);
        self.problems.truncate(problems);
        self.counts = counts;
        self.identifiers.retain(|_, id| id.0 < documents);
        self.skip.retain(|id| id.0 < components);
        self.traversed.retain(|id| id.0 < components);

        self.namespaces.clear();
        self.duplicate_namespaces.clear();
        let declared: Vec<(String, DocumentId)> = self
            .documents()
            .filter_map(|(id, d)| d.target_namespace.clone().map(|ns| (ns, id)))
            .collect();
        for (namespace, id) in declared {
            self.register_namespace(namespace, id);
        }
    }

    /// Id the next added document will get
    pub fn next_document_id(&self) -> DocumentId {
        DocumentId(self.documents.len())
    }

    /// Number of loaded documents
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Number of components across all documents
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Get a document
    pub fn document(&self, id: DocumentId) -> &SchemaDocument {
        &self.documents[id.0]
    }

    /// Get a document mutably
    pub fn document_mut(&mut self, id: DocumentId) -> &mut SchemaDocument {
        &mut self.documents[id.0]
    }

    /// Documents in load order
    pub fn documents(&self) -> impl Iterator<Item = (DocumentId, &SchemaDocument)> + '_ {
        self.documents
            .iter()
            .enumerate()
            .map(|(i, d)| (DocumentId(i), d))
    }

    /// Find a document by resolver identifier
    pub fn document_by_identifier(&self, identifier: &str) -> Option<DocumentId> {
        self.identifiers.get(identifier).copied()
    }

    /// Find the only document declaring a target namespace
    ///
    /// Namespaces declared by more than one document are never returned.
    pub fn document_for_namespace(&self, namespace: &str) -> Option<DocumentId> {
        self.namespaces.get(namespace).copied()
    }

    /// Check if a namespace is declared by more than one document
    pub fn is_duplicate_namespace(&self, namespace: &str) -> bool {
        self.duplicate_namespaces.contains(namespace)
    }

    /// Get a component
    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.0]
    }

    /// Get a component, if the id is in range
    pub fn get_component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id.0)
    }

    /// Get a component mutably
    pub fn component_mut(&mut self, id: ComponentId) -> &mut Component {
        &mut self.components[id.0]
    }

    /// Document owning a component
    pub fn owner(&self, id: ComponentId) -> &SchemaDocument {
        self.document(self.component(id).document)
    }

    /// Check if a component sits directly under its document's schema root
    pub fn is_global(&self, id: ComponentId) -> bool {
        self.component(id)
            .parent
            .map(|p| matches!(self.component(p).kind, ComponentKind::Schema(_)))
            .unwrap_or(false)
    }

    /// Resolve a name in the register of a document
    pub fn lookup(
        &self,
        document: DocumentId,
        category: NameCategory,
        name: &QName,
    ) -> Option<ComponentId> {
        self.document(document).register.lookup(category, name)
    }

    /// Location of a component, for messages
    pub fn location_of(&self, id: ComponentId) -> ProblemLocation {
        let component = self.component(id);
        ProblemLocation {
            document: Some(self.document(component.document).identifier.clone()),
            position: component.position,
        }
    }

    // Traversal state

    /// Forget which components the current pass has visited
    pub fn clear_traversed(&mut self) {
        self.traversed.clear();
    }

    /// Mark a component visited; returns false if it already was
    pub fn mark_traversed(&mut self, id: ComponentId) -> bool {
        self.traversed.insert(id)
    }

    /// Check if the current pass visited a component
    pub fn is_traversed(&self, id: ComponentId) -> bool {
        self.traversed.contains(&id)
    }

    /// Check if a component's subtree is excluded from traversal
    pub fn is_skipped(&self, id: ComponentId) -> bool {
        self.skip.contains(&id)
    }

    /// Number of pruned subtrees
    pub fn skipped_count(&self) -> usize {
        self.skip.len()
    }

    // Problems

    /// Record a recognized but unsupported construct
    pub fn add_unimplemented(
        &mut self,
        subject: impl Into<ProblemSubject>,
        message: impl Into<String>,
    ) {
        self.add(Severity::Unimplemented, subject.into(), message.into());
    }

    /// Record a warning
    pub fn add_warning(&mut self, subject: impl Into<ProblemSubject>, message: impl Into<String>) {
        self.add(Severity::Warning, subject.into(), message.into());
    }

    /// Record an error; always returns true so callers can keep going
    pub fn add_error(
        &mut self,
        subject: impl Into<ProblemSubject>,
        message: impl Into<String>,
    ) -> bool {
        self.add(Severity::Error, subject.into(), message.into());
        true
    }

    /// Record a fatal problem, pruning the component's subtree
    pub fn add_fatal(&mut self, subject: impl Into<ProblemSubject>, message: impl Into<String>) {
        self.add(Severity::Fatal, subject.into(), message.into());
    }

    fn add(&mut self, severity: Severity, subject: ProblemSubject, message: String) {
        let (location, component) = match &subject {
            ProblemSubject::Component(id) => match self.get_component(*id) {
                Some(c) => (self.location_of(*id), Some(c.describe())),
                None => (ProblemLocation::default(), None),
            },
            ProblemSubject::Location(location) => (location.clone(), None),
        };
        self.add_problem(ValidationProblem {
            severity,
            message,
            subject,
            location,
            component,
        });
    }

    /// Append a problem, count it, and prune the subtree of a fatal component
    pub fn add_problem(&mut self, problem: ValidationProblem) {
        self.counts[problem.severity.slot()] += 1;
        if problem.severity == Severity::Fatal {
            if let Some(id) = problem.subject.component() {
                debug!(component = id.index(), "pruning subtree after fatal problem");
                self.skip.insert(id);
            }
        }
        self.problems.push(problem);
    }

    /// Problems not yet reported
    pub fn problems(&self) -> &[ValidationProblem] {
        &self.problems
    }

    /// Problems recorded at a severity since the last reset
    pub fn count(&self, severity: Severity) -> usize {
        self.counts[severity.slot()]
    }

    /// Error and fatal problems recorded since the last reset
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error) + self.count(Severity::Fatal)
    }

    /// Drain the problem list through a handler
    ///
    /// Returns whether any error or fatal problem was drained. The list is
    /// empty afterwards; the counters are kept.
    pub fn report_problems(&mut self, handler: &mut dyn ProblemHandler) -> bool {
        let mut blocking = false;
        for problem in self.problems.drain(..) {
            blocking |= problem.severity.is_blocking();
            handler.handle(&problem);
        }
        blocking
    }

    /// Drain the problem list through the installed handler
    ///
    /// Without a handler the problems are dropped unreported.
    pub fn report_to_handler(&mut self) -> bool {
        match self.handler.take() {
            Some(mut handler) => {
                let blocking = self.report_problems(handler.as_mut());
                self.handler = Some(handler);
                blocking
            }
            None => {
                let blocking = self.problems.iter().any(|p| p.severity.is_blocking());
                self.problems.clear();
                blocking
            }
        }
    }

    /// Send progress text to the log and the installed handler
    pub fn report(&mut self, message: &str) {
        info!("{}", message);
        if let Some(handler) = self.handler.as_mut() {
            handler.report(message);
        }
    }
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("documents", &self.documents)
            .field("components", &self.components.len())
            .field("problems", &self.problems.len())
            .field("counts", &self.counts)
            .field("skipped", &self.skip.len())
            .field("handler", &self.handler.is_some())
            .finish()
    }
}
