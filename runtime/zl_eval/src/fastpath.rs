//! Shape-based fast paths, checked before any registry work.
//!
//! Two node shapes dominate real scripts: leaf variable assignment and the
//! flat `http.response` block. Both are recognized structurally and handled
//! without touching the registry or the handler cache. A shape that does
//! not match falls through to normal dispatch; so does an `http.response`
//! with no host sink installed, which lets a registered handler take over.

use tracing::trace;
use zl_ir::Node;

use crate::coerce;
use crate::context::ExecContext;
use crate::errors::{ExecError, ExecResult};
use crate::executor::resolve_value;
use crate::scope::Scope;

/// Attribute names a flat `http.response` may carry.
const RESPONSE_ATTRS: &[&str] = &["status", "body", "data"];

/// Try the fast paths. `None` means the node did not match any shape and
/// normal dispatch should proceed.
pub(crate) fn try_fast_path(
    ctx: &ExecContext<'_>,
    node: &Node,
    scope: &Scope,
) -> Option<ExecResult> {
    if node.name.starts_with('$') && node.name.len() > 1 && node.children.is_empty() {
        if node.value.is_some() {
            trace!(var = %node.name, "fast path: leaf assignment");
            scope.set(crate::executor::var_key(&node.name), resolve_value(node, scope));
            return Some(Ok(()));
        }
        return None;
    }

    if is_simple_http_response(node) {
        let sink = ctx.sink()?;

        let status = node
            .find_child("status")
            .map(|c| resolve_value(c, scope))
            .and_then(|v| coerce::to_int(&v))
            .and_then(|i| u16::try_from(i).ok())
            .unwrap_or(200);

        let payload = node
            .find_child("body")
            .or_else(|| node.find_child("data"))
            .map(|c| resolve_value(c, scope))
            .unwrap_or(zl_ir::Value::Null);

        trace!(status, "fast path: http.response");
        let body = match serde_json::to_vec(&payload) {
            Ok(body) => body,
            Err(e) => {
                return Some(Err(ExecError::runtime(format!(
                    "http.response: cannot serialize body: {e}"
                ))));
            }
        };
        let result = sink
            .send(status, "application/json", body)
            .map_err(|e| ExecError::runtime(format!("http.response: {e}")));
        return Some(result);
    }

    None
}

/// A "simple" response is flat: one to three value-only children, all from
/// the known attribute set, with no nested blocks.
fn is_simple_http_response(node: &Node) -> bool {
    if node.name != "http.response" {
        return false;
    }
    if node.children.is_empty() || node.children.len() > 3 {
        return false;
    }
    node.children.iter().all(|c| {
        c.children.is_empty() && c.value.is_some() && RESPONSE_ATTRS.contains(&c.name.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn node(name: &str) -> Node {
        Node::new(name, 1, 1, Arc::from("t.zl"))
    }

    fn attr(name: &str, value: &str) -> Node {
        let mut n = node(name);
        n.value = Some(format!("{}{value}", zl_ir::RAW_VALUE_PREFIX));
        n
    }

    #[test]
    fn shape_check_rejects_nested_blocks() {
        let mut resp = node("http.response");
        resp.children.push(attr("status", "200"));
        assert!(is_simple_http_response(&resp));

        let mut headers = node("headers");
        headers.children.push(attr("x", "1"));
        resp.children.push(headers);
        assert!(!is_simple_http_response(&resp));
    }

    #[test]
    fn shape_check_rejects_unknown_attrs() {
        let mut resp = node("http.response");
        resp.children.push(attr("status", "200"));
        resp.children.push(attr("redirect", "/"));
        assert!(!is_simple_http_response(&resp));
    }

    #[test]
    fn empty_response_is_not_simple() {
        assert!(!is_simple_http_response(&node("http.response")));
    }
}
