//! Iteration slots: `for`/`foreach` and `while`/`loop`.
//!
//! `for` handles two shapes. A value with exactly two semicolons is a
//! C-style loop (`"$i = 0; $i < 10; $i++"`); anything else resolves to a
//! list and iterates it with an `as:` alias and `loop` metadata. Both forms
//! probe cancellation every iteration and stop at the iteration cap.

use std::collections::BTreeMap;

use zl_ir::{InputMeta, Node, SlotMeta, Value};

use crate::builtins::cond::{condition_text, eval_condition};
use crate::builtins::{block_children, var_arg};
use crate::coerce;
use crate::context::ExecContext;
use crate::engine::Engine;
use crate::errors::{ExecError, ExecResult, Flow};
use crate::executor::resolve_value;
use crate::scope::Scope;

/// Runaway-loop guard. A condition that never turns false stops here.
const MAX_ITERATIONS: usize = 10000;

pub(crate) fn register(engine: &Engine) {
    let for_meta = || {
        SlotMeta::new("Iterate over a list, or run a C-style counted loop.")
            .example("for: $list {\n  as: $item\n  do: { ... }\n}")
            .input("as", InputMeta::new("Alias for the current element (default 'item')"))
            .input("do", InputMeta::new("Block to repeat"))
            .required_block("do")
    };
    engine.register("for", for_meta(), for_handler);
    engine.register("foreach", for_meta().example("foreach: $list { as: $item ... }"), for_handler);

    let while_meta = || {
        SlotMeta::new("Repeat the `do:` block while the condition holds.")
            .input("do", InputMeta::new("Block to repeat"))
            .required_block("do")
    };
    engine.register("while", while_meta(), while_handler);
    engine.register("loop", while_meta(), while_handler);
}

fn for_handler(ctx: &ExecContext<'_>, node: &Node, scope: &Scope) -> ExecResult {
    let text = condition_text(node).unwrap_or("");
    if text.matches(';').count() == 2 {
        return c_style_loop(ctx, node, text, scope);
    }
    foreach_loop(ctx, node, scope)
}

/// `"$i = 0; $i < 10; $i++"`: init, per-iteration condition, `++`/`--`
/// update on the loop variable.
fn c_style_loop(ctx: &ExecContext<'_>, node: &Node, spec: &str, scope: &Scope) -> ExecResult {
    let mut parts = spec.splitn(3, ';').map(str::trim);
    let init = parts.next().unwrap_or("");
    let cond = parts.next().unwrap_or("");
    let update = parts.next().unwrap_or("");

    let mut loop_var = String::new();
    if let Some((name, start)) = init.split_once('=') {
        loop_var = name.trim().trim_start_matches('$').to_string();
        let start: i64 = start.trim().parse().unwrap_or(0);
        scope.set(loop_var.clone(), Value::Int(start));
    }

    let Some(do_block) = node.find_child("do") else {
        return Ok(());
    };

    for _ in 0..MAX_ITERATIONS {
        ctx.done()?;
        if !eval_condition(cond, scope) {
            break;
        }

        match ctx.execute(do_block, scope) {
            Ok(()) => {}
            Err(ExecError::Control(Flow::Break)) => return Ok(()),
            Err(ExecError::Control(Flow::Continue)) => {}
            Err(other) => return Err(other),
        }

        if !loop_var.is_empty() {
            let current = scope.get(&loop_var).as_ref().and_then(coerce::to_int).unwrap_or(0);
            if update.contains("++") {
                scope.set(loop_var.clone(), Value::Int(current + 1));
            } else if update.contains("--") {
                scope.set(loop_var.clone(), Value::Int(current - 1));
            }
        }
    }
    Ok(())
}

fn foreach_loop(ctx: &ExecContext<'_>, node: &Node, scope: &Scope) -> ExecResult {
    let Value::List(items) = resolve_value(node, scope) else {
        // Not list-shaped: an empty loop, not an error.
        return Ok(());
    };

    let item_name = var_arg(node, "as").unwrap_or_else(|| "item".to_string());
    let Some(do_block) = node.find_child("do") else {
        return Ok(());
    };

    let count = items.len();
    let parent_loop = scope.get("loop");

    for (i, item) in items.into_iter().enumerate() {
        ctx.done()?;
        scope.set(item_name.clone(), item);
        scope.set("loop", loop_metadata(i, count, parent_loop.as_ref()));

        match ctx.execute(do_block, scope) {
            Ok(()) => {}
            Err(ExecError::Control(Flow::Break)) => break,
            Err(ExecError::Control(Flow::Continue)) => continue,
            Err(other) => return Err(other),
        }
    }

    // The outer loop's metadata comes back into view when this one ends.
    scope.set("loop", parent_loop.unwrap_or(Value::Null));
    Ok(())
}

/// The per-iteration `loop` variable: position counters plus parity flags,
/// with the enclosing loop's metadata nested under `parent`.
fn loop_metadata(i: usize, count: usize, parent: Option<&Value>) -> Value {
    let iteration = i + 1;
    let mut map = BTreeMap::new();
    map.insert("index".to_string(), Value::Int(i as i64));
    map.insert("iteration".to_string(), Value::Int(iteration as i64));
    map.insert("remaining".to_string(), Value::Int((count - iteration) as i64));
    map.insert("count".to_string(), Value::Int(count as i64));
    map.insert("first".to_string(), Value::Bool(i == 0));
    map.insert("last".to_string(), Value::Bool(iteration == count));
    map.insert("even".to_string(), Value::Bool(iteration % 2 == 0));
    map.insert("odd".to_string(), Value::Bool(iteration % 2 != 0));
    if let Some(parent) = parent {
        map.insert("parent".to_string(), parent.clone());
    }
    Value::Map(map)
}

fn while_handler(ctx: &ExecContext<'_>, node: &Node, scope: &Scope) -> ExecResult {
    let cond = condition_text(node).unwrap_or("").to_string();

    'outer: for _ in 0..MAX_ITERATIONS {
        ctx.done()?;
        if !eval_condition(&cond, scope) {
            break;
        }

        for child in block_children(node) {
            match ctx.execute(child, scope) {
                Ok(()) => {}
                Err(ExecError::Control(Flow::Break)) => break 'outer,
                Err(ExecError::Control(Flow::Continue)) => continue 'outer,
                Err(other) => return Err(other),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn metadata_flags() {
        let Value::Map(first) = loop_metadata(0, 3, None) else {
            panic!("expected map");
        };
        assert_eq!(first["first"], Value::Bool(true));
        assert_eq!(first["last"], Value::Bool(false));
        assert_eq!(first["odd"], Value::Bool(true));
        assert_eq!(first["remaining"], Value::Int(2));

        let Value::Map(last) = loop_metadata(2, 3, None) else {
            panic!("expected map");
        };
        assert_eq!(last["last"], Value::Bool(true));
        assert_eq!(last["iteration"], Value::Int(3));
        assert_eq!(last["remaining"], Value::Int(0));
    }

    #[test]
    fn metadata_nests_parent() {
        let parent = loop_metadata(1, 5, None);
        let Value::Map(inner) = loop_metadata(0, 2, Some(&parent)) else {
            panic!("expected map");
        };
        assert_eq!(inner["parent"], parent);
    }
}
