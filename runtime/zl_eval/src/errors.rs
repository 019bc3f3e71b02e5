//! Execution outcome types.
//!
//! Control flow is typed, never string-matched: `return`, `break`, and
//! `continue` travel as [`Flow`] values inside [`ExecError::Control`], which
//! loops and `try` pattern-match on. Real failures travel as
//! [`ExecError::Fail`] carrying a [`Diagnostic`].

use std::fmt;

use thiserror::Error;
use zl_diagnostic::{Diagnostic, DiagnosticKind};

/// Non-local transfer signals. Semantic, not failures.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Flow {
    /// Halt execution of the enclosing block/handler.
    Return,
    /// Exit the innermost loop.
    Break,
    /// Skip to the next iteration of the innermost loop.
    Continue,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Flow::Return => "return",
            Flow::Break => "break",
            Flow::Continue => "continue",
        };
        f.write_str(s)
    }
}

/// Error type of every execution step.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ExecError {
    /// A control-flow sentinel. Interpreted by enclosing handlers or the
    /// top of execution; never user-visible.
    #[error("{0}")]
    Control(Flow),
    /// A genuine failure, already or about to be annotated with source
    /// coordinates.
    #[error("{0}")]
    Fail(Box<Diagnostic>),
}

/// Result of executing one node.
pub type ExecResult = Result<(), ExecError>;

impl ExecError {
    /// A bare runtime failure. The executor attaches the node's source
    /// coordinates when it bubbles out of the handler.
    pub fn runtime(message: impl Into<String>) -> Self {
        ExecError::Fail(Box::new(Diagnostic::new(DiagnosticKind::Runtime, message)))
    }

    /// True for `return`/`break`/`continue`.
    pub fn is_control(&self) -> bool {
        matches!(self, ExecError::Control(_))
    }

    /// The carried diagnostic, if this is a failure.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            ExecError::Fail(d) => Some(d),
            ExecError::Control(_) => None,
        }
    }

    /// Unwrap into a diagnostic, mapping stray control-flow sentinels to a
    /// runtime diagnostic (they should have been absorbed below).
    pub fn into_diagnostic(self) -> Diagnostic {
        match self {
            ExecError::Fail(d) => *d,
            ExecError::Control(flow) => Diagnostic::new(
                DiagnosticKind::Runtime,
                format!("unhandled control flow: {flow}"),
            ),
        }
    }
}

impl From<Diagnostic> for ExecError {
    fn from(d: Diagnostic) -> Self {
        ExecError::Fail(Box::new(d))
    }
}

