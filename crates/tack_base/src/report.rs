//! The diagnostics surface shared by both front ends.
//!
//! Drivers do not print: they hand every recoverable problem to an
//! [`ErrorHandler`]. The XML driver additionally keeps the handler's
//! *current path* up to date with an XPath (including positional indices)
//! so that each diagnostic can say where in the document it arose.
//!
//! [`ErrorLog`] is the standard collecting implementation; tests and
//! embedders that want custom routing implement the trait themselves.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

/// One reported problem, already formatted, with the context path (if any)
/// that was active when it was reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub path: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Receiver for diagnostics produced anywhere in the pipeline.
pub trait ErrorHandler {
    fn handle_error(&mut self, message: &str);
    fn handle_warning(&mut self, message: &str);

    /// Updates the context path prefixed to subsequent diagnostics.
    /// Pass `None` to clear it.
    fn set_current_path(&mut self, path: Option<&str>);
}

/// Collecting [`ErrorHandler`] that records every diagnostic in order.
#[derive(Debug, Default)]
pub struct ErrorLog {
    diagnostics: Vec<Diagnostic>,
    current_path: Option<String>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    fn push(&mut self, severity: Severity, message: &str) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: self.current_path.clone(),
            message: message.to_string(),
        });
    }
}

impl ErrorHandler for ErrorLog {
    fn handle_error(&mut self, message: &str) {
        self.push(Severity::Error, message);
    }

    fn handle_warning(&mut self, message: &str) {
        self.push(Severity::Warning, message);
    }

    fn set_current_path(&mut self, path: Option<&str>) {
        self.current_path = path.map(str::to_string);
    }
}
