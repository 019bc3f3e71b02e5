//! Structured error reporting for the ZL runtime.
//!
//! Every user-visible failure surfaces as a [`Diagnostic`] carrying the kind
//! of failure, a message, source coordinates, and the slot where it
//! occurred, so hosts can render source-annotated errors.

use std::fmt;

use serde::Serialize;
use zl_ir::Node;

/// Failure taxonomy. Kinds, not types: hosts switch on this to decide how to
/// render or report a failure.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// Lexical or structural error during parsing.
    Parse,
    /// Strict-mode attribute or block violation.
    Validation,
    /// Strict-mode type-coercion failure.
    Type,
    /// A handler returned a non-control-flow error.
    Runtime,
    /// A handler (or the core) panicked; recovered and reported with a
    /// captured backtrace.
    Panic,
    /// Context was cancelled or a deadline expired.
    Cancelled,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::Parse => "parse",
            DiagnosticKind::Validation => "validation",
            DiagnosticKind::Type => "type",
            DiagnosticKind::Runtime => "runtime",
            DiagnosticKind::Panic => "panic",
            DiagnosticKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A structured, source-annotated error.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub filename: String,
    pub line: u32,
    pub col: u32,
    /// Name of the slot being executed when the failure occurred, when known.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub slot: String,
}

impl Diagnostic {
    /// Create a diagnostic with no source location.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            filename: String::new(),
            line: 0,
            col: 0,
            slot: String::new(),
        }
    }

    /// Attach explicit source coordinates.
    #[must_use]
    pub fn at(mut self, filename: impl Into<String>, line: u32, col: u32) -> Self {
        self.filename = filename.into();
        self.line = line;
        self.col = col;
        self
    }

    /// Attach the coordinates of an AST node.
    #[must_use]
    pub fn at_node(mut self, node: &Node) -> Self {
        self.filename = node.file.to_string();
        self.line = node.line;
        self.col = node.col;
        self
    }

    /// Record the slot in which the failure occurred.
    #[must_use]
    pub fn in_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = slot.into();
        self
    }

    /// Fill in location and slot only if not already set. Used when a
    /// diagnostic bubbles through outer nodes: the original location wins.
    #[must_use]
    pub fn or_at_node(self, node: &Node) -> Self {
        if self.filename.is_empty() && self.line == 0 {
            let slot = if self.slot.is_empty() {
                node.name.clone()
            } else {
                self.slot.clone()
            };
            self.at_node(node).in_slot(slot)
        } else {
            self
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filename.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(
                f,
                "[{}:{}:{}] {}",
                self.filename, self.line, self.col, self.message
            )
        }
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_includes_location_when_present() {
        let d = Diagnostic::new(DiagnosticKind::Runtime, "boom").at("app.zl", 3, 7);
        assert_eq!(d.to_string(), "[app.zl:3:7] boom");
    }

    #[test]
    fn display_without_location_is_bare_message() {
        let d = Diagnostic::new(DiagnosticKind::Parse, "unexpected byte");
        assert_eq!(d.to_string(), "unexpected byte");
    }

    #[test]
    fn or_at_node_preserves_original_location() {
        let file: std::sync::Arc<str> = std::sync::Arc::from("a.zl");
        let inner = Node::new("child", 9, 2, file.clone());
        let outer = Node::new("outer", 1, 1, file);

        let d = Diagnostic::new(DiagnosticKind::Runtime, "x").at_node(&inner);
        let bubbled = d.clone().or_at_node(&outer);
        assert_eq!(bubbled.line, 9);
        assert_eq!(bubbled.filename, "a.zl");
    }
}
