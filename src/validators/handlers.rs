//! Problem handlers
//!
//! A [`ProblemHandler`] is the sink problems are drained into once a run is
//! done. [`ConsoleHandler`] prints them, [`CompositeHandler`] fans them out
//! to several handlers, and [`RecordingHandler`] keeps them for inspection.

use std::cell::RefCell;
use std::error::Error as StdError;
use std::io::{self, Write};
use std::rc::Rc;

use tracing::warn;

use super::problems::{Severity, ValidationProblem};

/// Sink for validation problems and progress messages
pub trait ProblemHandler {
    /// Receive an unimplemented-feature notice
    fn handle_unimplemented(&mut self, problem: &ValidationProblem);

    /// Receive a warning
    fn handle_warning(&mut self, problem: &ValidationProblem);

    /// Receive an error
    fn handle_error(&mut self, problem: &ValidationProblem);

    /// Receive a fatal problem
    fn handle_fatal(&mut self, problem: &ValidationProblem);

    /// Receive free-form progress text
    fn report(&mut self, message: &str);

    /// Unrecoverable host-level failure
    fn terminate(&mut self, message: &str);

    /// Unrecoverable host-level failure with its cause
    fn terminate_with_cause(&mut self, message: &str, cause: &dyn StdError);

    /// Dispatch a problem by severity
    fn handle(&mut self, problem: &ValidationProblem) {
        match problem.severity {
            Severity::Unimplemented => self.handle_unimplemented(problem),
            Severity::Warning => self.handle_warning(problem),
            Severity::Error => self.handle_error(problem),
            Severity::Fatal => self.handle_fatal(problem),
        }
    }
}

/// Handler writing severity-prefixed lines
pub struct ConsoleHandler<W: Write = io::Stdout> {
    out: W,
}

impl ConsoleHandler<io::Stdout> {
    /// Handler writing to standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl Default for ConsoleHandler<io::Stdout> {
    fn default() -> Self {
        Self::stdout()
    }
}

impl<W: Write> ConsoleHandler<W> {
    /// Handler writing to any writer
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, label: &str, text: &str) {
        if let Err(e) = writeln!(self.out, "[{}] {}", label, text) {
            warn!(error = %e, "failed to write problem output");
        }
    }

    fn problem(&mut self, problem: &ValidationProblem) {
        self.line(problem.severity.label(), &problem.description());
    }
}

impl<W: Write> ProblemHandler for ConsoleHandler<W> {
    fn handle_unimplemented(&mut self, problem: &ValidationProblem) {
        self.problem(problem);
    }

    fn handle_warning(&mut self, problem: &ValidationProblem) {
        self.problem(problem);
    }

    fn handle_error(&mut self, problem: &ValidationProblem) {
        self.problem(problem);
    }

    fn handle_fatal(&mut self, problem: &ValidationProblem) {
        self.problem(problem);
    }

    fn report(&mut self, message: &str) {
        self.line("INFO", message);
    }

    fn terminate(&mut self, message: &str) {
        self.line("TERMINATE", message);
    }

    fn terminate_with_cause(&mut self, message: &str, cause: &dyn StdError) {
        self.line("TERMINATE", &format!("{}: {}", message, cause));
    }
}

/// Handler forwarding everything to an ordered list of handlers
#[derive(Default)]
pub struct CompositeHandler {
    handlers: Vec<Box<dyn ProblemHandler>>,
}

impl CompositeHandler {
    /// Create an empty composite
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler (builder style)
    pub fn with(mut self, handler: impl ProblemHandler + 'static) -> Self {
        self.add(Box::new(handler));
        self
    }

    /// Append a handler
    pub fn add(&mut self, handler: Box<dyn ProblemHandler>) {
        self.handlers.push(handler);
    }

    /// Number of handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check for no handlers
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl ProblemHandler for CompositeHandler {
    fn handle_unimplemented(&mut self, problem: &ValidationProblem) {
        for h in &mut self.handlers {
            h.handle_unimplemented(problem);
        }
    }

    fn handle_warning(&mut self, problem: &ValidationProblem) {
        for h in &mut self.handlers {
            h.handle_warning(problem);
        }
    }

    fn handle_error(&mut self, problem: &ValidationProblem) {
        for h in &mut self.handlers {
            h.handle_error(problem);
        }
    }

    fn handle_fatal(&mut self, problem: &ValidationProblem) {
        for h in &mut self.handlers {
            h.handle_fatal(problem);
        }
    }

    fn report(&mut self, message: &str) {
        for h in &mut self.handlers {
            h.report(message);
        }
    }

    fn terminate(&mut self, message: &str) {
        for h in &mut self.handlers {
            h.terminate(message);
        }
    }

    fn terminate_with_cause(&mut self, message: &str, cause: &dyn StdError) {
        for h in &mut self.handlers {
            h.terminate_with_cause(message, cause);
        }
    }
}

#[derive(Debug, Default)]
struct Recording {
    problems: Vec<(Severity, String)>,
    reports: Vec<String>,
    terminations: Vec<String>,
}

/// Handler keeping everything it receives
///
/// Clones share one recording, so a clone kept by the caller observes a
/// handler that was boxed and installed elsewhere.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    recording: Rc<RefCell<Recording>>,
}

impl RecordingHandler {
    /// Create an empty recording
    pub fn new() -> Self {
        Self::default()
    }

    /// Problems received, as severity and description
    pub fn problems(&self) -> Vec<(Severity, String)> {
        self.recording.borrow().problems.clone()
    }

    /// Number of problems received at a severity
    pub fn count(&self, severity: Severity) -> usize {
        self.recording
            .borrow()
            .problems
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }

    /// Progress messages received
    pub fn reports(&self) -> Vec<String> {
        self.recording.borrow().reports.clone()
    }

    /// Termination messages received
    pub fn terminations(&self) -> Vec<String> {
        self.recording.borrow().terminations.clone()
    }

    fn push(&self, problem: &ValidationProblem) {
        self.recording
            .borrow_mut()
            .problems
            .push((problem.severity, problem.description()));
    }
}

impl ProblemHandler for RecordingHandler {
    fn handle_unimplemented(&mut self, problem: &ValidationProblem) {
        self.push(problem);
    }

    fn handle_warning(&mut self, problem: &ValidationProblem) {
        self.push(problem);
    }

    fn handle_error(&mut self, problem: &ValidationProblem) {
        self.push(problem);
    }

    fn handle_fatal(&mut self, problem: &ValidationProblem) {
        self.push(problem);
    }

    fn report(&mut self, message: &str) {
        self.recording.borrow_mut().reports.push(message.to_string());
    }

    fn terminate(&mut self, message: &str) {
        self.recording
            .borrow_mut()
            .terminations
            .push(message.to_string());
    }

    fn terminate_with_cause(&mut self, message: &str, cause: &dyn StdError) {
        self.recording
            .borrow_mut()
            .terminations
            .push(format!("{}: {}", message, cause));
    }
}
