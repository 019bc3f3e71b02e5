//! Node dispatch.
//!
//! Execution of a node proceeds through a fixed ladder: cancellation probe,
//! fast paths, the node's cached handler, a registry lookup (with strict
//! validation on this first, cold dispatch), variable-shorthand assignment,
//! and finally structural recursion into children. Handlers run under a
//! panic guard so a faulty handler reports a diagnostic instead of tearing
//! down the host.

use std::backtrace::Backtrace;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::trace;
use zl_diagnostic::{Diagnostic, DiagnosticKind};
use zl_ir::{unquote, Node, SlotMeta, Value, ValueType, RAW_VALUE_PREFIX};

use crate::coerce;
use crate::context::ExecContext;
use crate::engine::{Engine, Handler};
use crate::errors::{ExecError, ExecResult};
use crate::fastpath;
use crate::scope::Scope;

/// Block names with structural meaning. They are containers inside another
/// slot, never attributes, so strict validation skips them.
const RESERVED_BLOCKS: &[&str] = &[
    "do",
    "then",
    "else",
    "catch",
    "",
    "__native_write",
    "__native_write_safe",
];

pub(crate) fn execute(
    engine: &Engine,
    ctx: &ExecContext<'_>,
    node: &Node,
    scope: &Scope,
) -> ExecResult {
    ctx.done()?;

    if let Some(result) = fastpath::try_fast_path(ctx, node, scope) {
        // Fast-path failures carry the node's coordinates like any other.
        return result.map_err(|e| match e {
            ExecError::Fail(d) => ExecError::Fail(Box::new(d.or_at_node(node))),
            control => control,
        });
    }

    // Hot path: the node was dispatched before and its handler is bound.
    // Validation already happened on the cold dispatch.
    if let Some(handler) = engine.cached_handler(node.id) {
        return invoke(&handler, ctx, node, scope);
    }

    if let Some((handler, meta)) = engine.lookup(&node.name) {
        trace!(slot = %node.name, id = node.id.as_u32(), "cold dispatch");
        validate(node, &meta, scope)?;
        engine.cache_handler(node.id, handler.clone());
        return invoke(&handler, ctx, node, scope);
    }

    if node.name.starts_with('$') && node.name.len() > 1 {
        return assign_shorthand(node, scope);
    }

    // Structural node: execute children in source order.
    for child in &node.children {
        execute(engine, ctx, child, scope)?;
    }
    Ok(())
}

/// Run a handler under a panic guard, attaching the node's coordinates to
/// any failure that bubbles out without them. Control flow passes through
/// untouched.
fn invoke(handler: &Handler, ctx: &ExecContext<'_>, node: &Node, scope: &Scope) -> ExecResult {
    let outcome = catch_unwind(AssertUnwindSafe(|| handler(ctx, node, scope)));
    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(ExecError::Control(flow))) => Err(ExecError::Control(flow)),
        Ok(Err(ExecError::Fail(d))) => Err(ExecError::Fail(Box::new(d.or_at_node(node)))),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            let backtrace = Backtrace::force_capture();
            Err(Diagnostic::new(
                DiagnosticKind::Panic,
                format!("PANIC: {message}\n\nStack Trace:\n{backtrace}"),
            )
            .at_node(node)
            .in_slot(&node.name)
            .into())
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Strict-mode validation against the slot's declared metadata. Runs once
/// per node, on cold dispatch.
fn validate(node: &Node, meta: &SlotMeta, scope: &Scope) -> Result<(), ExecError> {
    if let Some(inputs) = &meta.inputs {
        for child in &node.children {
            // Only the reserved block names are exempt. Block-shaped
            // children and `$name` children are attributes like any other.
            if RESERVED_BLOCKS.contains(&child.name.as_str()) {
                continue;
            }
            let Some(input) = inputs.get(&child.name) else {
                let mut allowed: Vec<&str> = inputs.keys().map(String::as_str).collect();
                allowed.sort_unstable();
                return Err(Diagnostic::new(
                    DiagnosticKind::Validation,
                    format!(
                        "validation error: unknown attribute '{}'. Allowed attributes: {}",
                        child.name,
                        allowed.join(", ")
                    ),
                )
                .at_node(child)
                .in_slot(&node.name)
                .into());
            };
            if input.ty != ValueType::Any {
                let value = if child.value.is_none() && !child.children.is_empty() {
                    map_from_children(child, scope)
                } else {
                    resolve_value(child, scope)
                };
                if !coerce::check_type(&value, input.ty) {
                    return Err(Diagnostic::new(
                        DiagnosticKind::Type,
                        format!(
                            "validation error: type mismatch for '{}'. Expected {}, got {} ({})",
                            child.name,
                            input.ty,
                            value.type_name(),
                            value
                        ),
                    )
                    .at_node(child)
                    .in_slot(&node.name)
                    .into());
                }
            }
        }

        let mut required: Vec<(&String, _)> = inputs.iter().filter(|(_, i)| i.required).collect();
        required.sort_unstable_by_key(|(name, _)| name.as_str());
        for (name, _) in required {
            if !node.has_child(name) {
                return Err(Diagnostic::new(
                    DiagnosticKind::Validation,
                    format!("validation error: missing required attribute '{name}'"),
                )
                .at_node(node)
                .in_slot(&node.name)
                .into());
            }
        }
    }

    for block in &meta.required_blocks {
        if !node.has_child(block) {
            return Err(Diagnostic::new(
                DiagnosticKind::Validation,
                format!("validation error: missing required block '{block}:'"),
            )
            .at_node(node)
            .in_slot(&node.name)
            .into());
        }
    }

    Ok(())
}

/// Resolve a node's textual value into a [`Value`].
///
/// A bare identifier beginning with `$` resolves through the scope (missing
/// variables become null); other bare identifiers parse as scalar literals.
/// Quoted strings lose their quotes; any remaining text passes through as a
/// string.
pub(crate) fn resolve_value(node: &Node, scope: &Scope) -> Value {
    let Some(raw) = node.value.as_deref() else {
        return Value::Null;
    };
    if let Some(ident) = raw.strip_prefix(RAW_VALUE_PREFIX) {
        if let Some(var) = ident.strip_prefix('$') {
            return scope.get(var).unwrap_or(Value::Null);
        }
        return coerce::parse_scalar(ident);
    }
    match unquote(raw) {
        Some(inner) => Value::Str(inner.to_string()),
        None => Value::Str(raw.to_string()),
    }
}

/// Strip the `$` prefix from a variable reference. Scope keys are stored
/// without it.
pub(crate) fn var_key(name: &str) -> &str {
    name.strip_prefix('$').unwrap_or(name)
}

/// Handle `$name: value` and `$name { ... }` assignment nodes.
fn assign_shorthand(node: &Node, scope: &Scope) -> ExecResult {
    let value = if node.value.is_none() && !node.children.is_empty() {
        map_from_children(node, scope)
    } else {
        resolve_value(node, scope)
    };
    trace!(var = %node.name, "shorthand assignment");
    scope.set(var_key(&node.name), value);
    Ok(())
}

/// Build a map value from a block of children. Nested blocks become nested
/// maps; leaf children resolve like any attribute value.
fn map_from_children(node: &Node, scope: &Scope) -> Value {
    let mut map = std::collections::BTreeMap::new();
    for child in &node.children {
        let value = if child.value.is_none() && !child.children.is_empty() {
            map_from_children(child, scope)
        } else {
            resolve_value(child, scope)
        };
        map.insert(child.name.clone(), value);
    }
    Value::Map(map)
}
