//! Executor and embedding engine for the ZL runtime.
//!
//! The crate turns parsed trees (from `zl_parse`) into effects: it walks
//! nodes, dispatches them to registered slot handlers, and maintains the
//! runtime state around that walk.
//!
//! # Architecture
//!
//! - `Engine`: slot registry, node-to-handler inline cache, function table,
//!   and the parsed-script cache
//! - `executor`: the dispatch ladder (fast path, cached handler, registry
//!   with strict validation, variable shorthand, child fallback) under a
//!   panic guard
//! - `Scope`: chained thread-safe bindings with dot/bracket navigation,
//!   recycled through `ScopePool`
//! - `ExecContext`: cancellation, deadlines, host values, response sink
//! - `builtins`: the control-flow slot library (`if`, `for`, `try`, ...)

pub mod builtins;
mod cache;
mod coerce;
mod context;
mod engine;
mod errors;
mod executor;
mod fastpath;
mod pool;
mod scope;

#[cfg(test)]
mod tests;

pub use cache::ScriptCache;
pub use coerce::{check_type, parse_scalar, to_bool, to_float, to_int};
pub use context::{BufferSink, CancelToken, ExecContext, ResponseSink};
pub use engine::{Engine, FunctionTable, Handler};
pub use errors::{ExecError, ExecResult, Flow};
pub use pool::{PooledScope, ScopePool};
pub use scope::Scope;

// The IR and diagnostic types every embedder needs alongside the engine.
pub use zl_diagnostic::{Diagnostic, DiagnosticKind};
pub use zl_ir::{InputMeta, Node, SlotMeta, Value, ValueType};
