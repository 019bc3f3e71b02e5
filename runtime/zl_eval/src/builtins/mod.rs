//! The built-in control-flow slot library.
//!
//! These slots cover branching, loops, error handling, functions, and
//! timeouts. Everything domain-specific (HTTP, storage, templates) belongs
//! to the embedding host and is registered alongside these.

pub(crate) mod cond;
mod control;
mod functions;
mod loops;

use zl_ir::{unquote, Node, Value};

use crate::engine::Engine;
use crate::executor::resolve_value;
use crate::scope::Scope;

/// Register every built-in slot on `engine`.
pub fn register(engine: &Engine) {
    control::register(engine);
    loops::register(engine);
    functions::register(engine);
}

/// The children a looping/branching slot executes: the `do:` block's if one
/// exists, the node's own otherwise.
pub(crate) fn block_children(node: &Node) -> &[Node] {
    match node.find_child("do") {
        Some(block) => &block.children,
        None => &node.children,
    }
}

/// A child attribute naming a variable: `as: $item` or `as: item`. The `$`
/// and any quotes are stripped.
pub(crate) fn var_arg(node: &Node, name: &str) -> Option<String> {
    let raw = node.find_child(name)?.raw_value()?;
    let cleaned = unquote(raw).unwrap_or(raw);
    Some(cleaned.trim_start_matches('$').to_string())
}

/// A child attribute resolved to its string form, if present and non-null.
pub(crate) fn string_arg(node: &Node, name: &str, scope: &Scope) -> Option<String> {
    let child = node.find_child(name)?;
    match resolve_value(child, scope) {
        Value::Null => None,
        v => Some(v.to_string()),
    }
}
