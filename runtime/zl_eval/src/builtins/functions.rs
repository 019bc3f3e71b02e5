//! Function definition/invocation and explicit variable assignment.

use zl_ir::{InputMeta, Node, SlotMeta, Value};

use crate::builtins::var_arg;
use crate::engine::Engine;
use crate::errors::{ExecError, Flow};
use crate::executor::resolve_value;
use crate::scope::Scope;
use std::sync::Arc;

pub(crate) fn register(engine: &Engine) {
    engine.register(
        "fn",
        SlotMeta::new("Define a function: store this block for later `call`.")
            .example("fn: send_welcome {\n  ...\n}"),
        |ctx, node, scope| {
            let name = name_value(node, scope);
            if name.is_empty() {
                return Err(ExecError::runtime("fn: function name is required"));
            }
            ctx.engine().functions().define(name, Arc::new(node.clone()));
            Ok(())
        },
    );

    engine.register(
        "call",
        SlotMeta::new("Invoke a function defined with `fn`. Shares the caller's scope.")
            .example("call: send_welcome"),
        |ctx, node, scope| {
            let name = name_value(node, scope);
            if name.is_empty() {
                return Err(ExecError::runtime("call: function name is required"));
            }
            let Some(body) = ctx.engine().functions().get(&name) else {
                return Err(ExecError::runtime(format!(
                    "call: function '{name}' not found"
                )));
            };

            for child in &body.children {
                match ctx.execute(child, scope) {
                    // `return` exits the function, not the caller.
                    Err(ExecError::Control(Flow::Return)) => return Ok(()),
                    other => other?,
                }
            }
            Ok(())
        },
    );

    engine.register(
        "var",
        SlotMeta::new("Assign a variable explicitly: `var: $name { val: ... }`.")
            .input("key", InputMeta::new("Variable name"))
            .input("name", InputMeta::new("Variable name (alias for key)"))
            .input("val", InputMeta::new("Value to assign"))
            .input("value", InputMeta::new("Value to assign (alias for val)")),
        |_, node, scope| {
            let key = shorthand_key(node)
                .or_else(|| var_arg(node, "key"))
                .or_else(|| var_arg(node, "name"))
                .unwrap_or_default();
            let val = node
                .find_child("val")
                .or_else(|| node.find_child("value"))
                .map(|c| deref_chain(resolve_value(c, scope), scope))
                .unwrap_or(Value::Null);

            if !key.is_empty() {
                scope.set(key, val);
            }
            Ok(())
        },
    );
}

/// The function name attached as the node's value.
fn name_value(node: &Node, scope: &Scope) -> String {
    match resolve_value(node, scope) {
        Value::Null => String::new(),
        v => v.to_string(),
    }
}

/// `var: $name` shorthand: the node's own value names the target.
fn shorthand_key(node: &Node) -> Option<String> {
    let raw = node.raw_value()?;
    let cleaned = zl_ir::unquote(raw).unwrap_or(raw);
    let key = cleaned.trim().trim_start_matches('$');
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Follow `$ref` indirections in string values a bounded number of steps.
fn deref_chain(mut value: Value, scope: &Scope) -> Value {
    for _ in 0..10 {
        let Value::Str(s) = &value else { return value };
        let Some(var) = s.strip_prefix('$') else {
            return value;
        };
        value = scope.get(var).unwrap_or(Value::Null);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deref_follows_indirections() {
        let scope = Scope::new();
        scope.set("a", Value::Str("$b".into()));
        scope.set("b", Value::Int(7));
        assert_eq!(deref_chain(Value::Str("$a".into()), &scope), Value::Int(7));
    }

    #[test]
    fn deref_gives_up_on_cycles() {
        let scope = Scope::new();
        scope.set("x", Value::Str("$y".into()));
        scope.set("y", Value::Str("$x".into()));
        assert_eq!(deref_chain(Value::Str("$x".into()), &scope), Value::Null);
    }
}
