//! The condition mini-evaluator shared by loops and branching slots.
//!
//! Conditions are single binary comparisons over scope references, integer
//! literals, and strings: `$i < 10`, `$role == admin`, `$v != 'x'`. The
//! first operator found (scanning `<=`, `>=`, `==`, `!=`, `<`, `>` in that
//! order) splits the expression. Both sides numeric compares as integers,
//! anything else compares lexicographically. No operator means `false`
//! unless the caller falls back to truthiness.

use zl_ir::{unquote, Node, Value};

use crate::coerce;
use crate::scope::Scope;

/// Comparison operators, two-character forms first so `<=` is not read as
/// `<` followed by a stray `=`.
const OPERATORS: &[&str] = &["<=", ">=", "==", "!=", "<", ">"];

/// The cleaned condition text of a node: sentinel stripped, quotes removed.
pub(crate) fn condition_text(node: &Node) -> Option<&str> {
    let raw = node.raw_value()?;
    Some(unquote(raw).unwrap_or(raw).trim())
}

/// Evaluate a binary comparison. `false` when no operator is present.
pub(crate) fn eval_condition(expr: &str, scope: &Scope) -> bool {
    let Some((op, left, right)) = split_condition(expr) else {
        return false;
    };

    let left = resolve_operand(left, scope);
    let right = resolve_operand(right, scope);

    match (coerce::to_int(&left), coerce::to_int(&right)) {
        (Some(l), Some(r)) => compare(op, &l, &r),
        _ => compare(op, &left.to_string(), &right.to_string()),
    }
}

/// Truthy evaluation for `if`/`unless`: a comparison when an operator is
/// present, plain truthiness of the resolved operand otherwise.
pub(crate) fn eval_truthy(expr: &str, scope: &Scope) -> bool {
    if split_condition(expr).is_some() {
        return eval_condition(expr, scope);
    }
    resolve_operand(expr, scope).is_truthy()
}

fn split_condition(expr: &str) -> Option<(&'static str, &str, &str)> {
    for op in OPERATORS {
        if let Some(pos) = expr.find(op) {
            let left = expr[..pos].trim();
            let right = expr[pos + op.len()..].trim();
            return Some((op, left, right));
        }
    }
    None
}

fn compare<T: PartialOrd>(op: &str, l: &T, r: &T) -> bool {
    match op {
        "<" => l < r,
        ">" => l > r,
        "<=" => l <= r,
        ">=" => l >= r,
        "==" => l == r,
        "!=" => l != r,
        _ => false,
    }
}

/// Resolve one operand: `$ref` through the scope (missing becomes null),
/// integer literals as ints, everything else as unquoted text.
fn resolve_operand(s: &str, scope: &Scope) -> Value {
    if let Some(var) = s.strip_prefix('$') {
        return scope.get(var).unwrap_or(Value::Null);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Int(i);
    }
    Value::Str(unquote(s).unwrap_or(s).to_string())
}
