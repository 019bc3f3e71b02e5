//! Execution context threaded through handlers.
//!
//! Carries the engine self-reference, a cancellation token with an optional
//! deadline, the host's response sink (consumed by the fast path), and a
//! bag of opaque host values (request handles, database pools, ...). The
//! core only understands the engine and the cancellation signal; everything
//! else passes through untouched.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use zl_diagnostic::{Diagnostic, DiagnosticKind};

use crate::engine::Engine;

/// Cooperative cancellation signal.
///
/// Cheap to clone; clones share the cancel flag. Deadlines are per-token so
/// a derived token can be stricter than its parent.
#[derive(Clone, Debug)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Request cancellation. Observed by every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Derive a token whose deadline is at most `timeout` from now. If the
    /// parent deadline is already tighter, it is kept.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> CancelToken {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        CancelToken {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(deadline),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        CancelToken::new()
    }
}

/// Host writer the `http.response` fast path emits through.
///
/// The core never constructs one; the embedding host installs it with
/// [`ExecContext::with_sink`].
pub trait ResponseSink: Send + Sync {
    fn send(&self, status: u16, content_type: &str, body: Vec<u8>) -> Result<(), String>;
}

type HostValues = FxHashMap<&'static str, Arc<dyn Any + Send + Sync>>;

/// Per-execution context handed to every handler.
#[derive(Clone)]
pub struct ExecContext<'e> {
    engine: &'e Engine,
    cancel: CancelToken,
    sink: Option<Arc<dyn ResponseSink>>,
    values: Arc<HostValues>,
}

impl<'e> ExecContext<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        ExecContext {
            engine,
            cancel: CancelToken::new(),
            sink: None,
            values: Arc::new(HostValues::default()),
        }
    }

    /// The engine running this execution.
    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    /// Shorthand for recursing into a child subtree.
    pub fn execute(&self, node: &zl_ir::Node, scope: &crate::Scope) -> crate::ExecResult {
        self.engine.execute(self, node, scope)
    }

    /// Install the host response writer consumed by the fast path.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ResponseSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attach an opaque host value under a well-known key.
    #[must_use]
    pub fn with_value(mut self, key: &'static str, value: Arc<dyn Any + Send + Sync>) -> Self {
        let mut values = (*self.values).clone();
        values.insert(key, value);
        self.values = Arc::new(values);
        self
    }

    /// Replace the cancellation token, e.g. with the request's.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Derive a context bounded by `timeout`, sharing everything else.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut child = self.clone();
        child.cancel = self.cancel.with_timeout(timeout);
        child
    }

    pub fn sink(&self) -> Option<&Arc<dyn ResponseSink>> {
        self.sink.as_ref()
    }

    /// Typed lookup of a host value.
    pub fn value<T: Any + Send + Sync>(&self, key: &'static str) -> Option<Arc<T>> {
        let v = self.values.get(key)?;
        Arc::clone(v).downcast::<T>().ok()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Cancellation probe. Loops call this at iteration boundaries, the
    /// executor at handler-reentry boundaries.
    pub fn done(&self) -> Result<(), Diagnostic> {
        if self.cancel.is_cancelled() {
            return Err(Diagnostic::new(
                DiagnosticKind::Cancelled,
                "execution cancelled",
            ));
        }
        if self.cancel.deadline_exceeded() {
            return Err(Diagnostic::new(
                DiagnosticKind::Cancelled,
                "deadline exceeded",
            ));
        }
        Ok(())
    }
}

/// A recording sink for tests and buffered hosts.
#[derive(Default)]
pub struct BufferSink {
    captured: parking_lot::Mutex<Vec<(u16, String, Vec<u8>)>>,
}

impl BufferSink {
    pub fn new() -> Self {
        BufferSink::default()
    }

    /// Responses sent so far, in order.
    pub fn responses(&self) -> Vec<(u16, String, Vec<u8>)> {
        self.captured.lock().clone()
    }

    /// The last response body parsed back into a [`Value`]-friendly JSON
    /// string, for assertions.
    pub fn last_body_string(&self) -> Option<String> {
        self.captured
            .lock()
            .last()
            .map(|(_, _, body)| String::from_utf8_lossy(body).into_owned())
    }
}

impl ResponseSink for BufferSink {
    fn send(&self, status: u16, content_type: &str, body: Vec<u8>) -> Result<(), String> {
        self.captured
            .lock()
            .push((status, content_type.to_string(), body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cancel_propagates_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn derived_deadline_never_loosens() {
        let token = CancelToken::new().with_timeout(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        let derived = token.with_timeout(Duration::from_secs(60));
        assert!(derived.deadline_exceeded());
    }

    #[test]
    fn host_values_roundtrip() {
        let engine = Engine::new();
        let ctx = ExecContext::new(&engine).with_value("port", Arc::new(8080u16));
        assert_eq!(ctx.value::<u16>("port").as_deref(), Some(&8080));
        assert_eq!(ctx.value::<u32>("port"), None);
        assert_eq!(ctx.value::<u16>("other"), None);
    }
}
