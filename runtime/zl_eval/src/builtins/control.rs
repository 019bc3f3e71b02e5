//! Branching and non-local control slots.

use std::time::Duration;

use zl_ir::{InputMeta, Node, SlotMeta};

use crate::builtins::cond::{condition_text, eval_truthy};
use crate::builtins::{block_children, string_arg, var_arg};
use crate::engine::Engine;
use crate::errors::{ExecError, ExecResult, Flow};
use crate::executor::resolve_value;
use crate::scope::Scope;

pub(crate) fn register(engine: &Engine) {
    engine.register(
        "return",
        SlotMeta::new("Halt execution of the current block/handler."),
        |_, _, _| Err(ExecError::Control(Flow::Return)),
    );

    engine.register(
        "break",
        SlotMeta::new("Exit the innermost loop. Supports a condition: `break: $i == 5`."),
        |_, node, scope| conditional_flow(node, scope, Flow::Break),
    );

    engine.register(
        "continue",
        SlotMeta::new(
            "Skip to the next iteration of the innermost loop. \
             Supports a condition: `continue: $i % 2 == 0`.",
        ),
        |_, node, scope| conditional_flow(node, scope, Flow::Continue),
    );

    engine.register(
        "if",
        SlotMeta::new("Conditional branch. Supports ==, !=, >, <, >=, <= and bare truthiness.")
            .example("if: $age >= 18 {\n  then: { ... }\n  else: { ... }\n}")
            .input("then", InputMeta::new("Block to run when the condition holds"))
            .input("else", InputMeta::new("Block to run when the condition fails"))
            .required_block("then"),
        |ctx, node, scope| {
            let taken = condition_text(node).is_some_and(|expr| eval_truthy(expr, scope));
            let branch = if taken { "then" } else { "else" };
            if let Some(block) = node.find_child(branch) {
                for child in &block.children {
                    ctx.execute(child, scope)?;
                }
            }
            Ok(())
        },
    );

    engine.register(
        "unless",
        SlotMeta::new("Inverse conditional: run the block when the condition is false.")
            .input("do", InputMeta::new("Block to run")),
        |ctx, node, scope| {
            let held = condition_text(node).is_some_and(|expr| eval_truthy(expr, scope));
            if !held {
                if let Some(block) = node.find_child("do") {
                    ctx.execute(block, scope)?;
                }
            }
            Ok(())
        },
    );

    engine.register(
        "switch",
        SlotMeta::new("Multi-way branch: first matching `case:`, else `default:`.")
            .input("case", InputMeta::new("Case value to match"))
            .input("default", InputMeta::new("Fallback when no case matches")),
        |ctx, node, scope| {
            let subject = resolve_value(node, scope);
            for child in &node.children {
                match child.name.as_str() {
                    "case" => {
                        if resolve_value(child, scope) == subject {
                            return absorb_break(ctx.execute(child, scope));
                        }
                    }
                    "default" => return absorb_break(ctx.execute(child, scope)),
                    _ => {}
                }
            }
            Ok(())
        },
    );

    engine.register(
        "try",
        SlotMeta::new("Run `do:`, diverting failures into `catch:`.")
            .example("try {\n  do: { ... }\n  catch: { ... }\n}")
            .input("as", InputMeta::new("Variable holding the error message (default 'error')"))
            .input("do", InputMeta::new("Block to attempt"))
            .input("catch", InputMeta::new("Error-handling block")),
        |ctx, node, scope| {
            let err_var = var_arg(node, "as").unwrap_or_else(|| "error".to_string());
            let Some(do_block) = node.find_child("do") else {
                return Ok(());
            };

            for child in &do_block.children {
                match ctx.execute(child, scope) {
                    Ok(()) => {}
                    // Control flow is not an error; it escapes the catch.
                    Err(ExecError::Control(flow)) => return Err(ExecError::Control(flow)),
                    Err(ExecError::Fail(diag)) => {
                        let Some(catch_block) = node.find_child("catch") else {
                            return Err(ExecError::Fail(diag));
                        };
                        scope.set(err_var, diag.to_string());
                        return ctx.execute(catch_block, scope);
                    }
                }
            }
            Ok(())
        },
    );

    engine.register(
        "timeout",
        SlotMeta::new("Bound the `do:` block's execution time, e.g. `timeout: 5s`.")
            .input("duration", InputMeta::new("Limit ('500ms', '5s', '1m', or bare ms)"))
            .input("do", InputMeta::new("Block to execute under the limit")),
        |ctx, node, scope| {
            let duration_str = string_arg(node, "duration", scope)
                .or_else(|| condition_text(node).map(str::to_string))
                .unwrap_or_default();
            if duration_str.is_empty() {
                return Err(ExecError::runtime("timeout: duration is required"));
            }
            let Some(duration) = parse_duration(&duration_str) else {
                return Err(ExecError::runtime(format!(
                    "timeout: invalid duration '{duration_str}'"
                )));
            };

            let bounded = ctx.with_timeout(duration);
            for child in block_children(node) {
                if let Err(e) = bounded.execute(child, scope) {
                    if bounded.cancel_token().deadline_exceeded() {
                        return Err(zl_diagnostic::Diagnostic::new(
                            zl_diagnostic::DiagnosticKind::Cancelled,
                            format!("execution timed out after {duration_str}"),
                        )
                        .into());
                    }
                    return Err(e);
                }
            }
            Ok(())
        },
    );
}

fn conditional_flow(node: &Node, scope: &Scope, flow: Flow) -> ExecResult {
    if let Some(expr) = condition_text(node) {
        if !crate::builtins::cond::eval_condition(expr, scope) {
            return Ok(());
        }
    }
    Err(ExecError::Control(flow))
}

/// A loop `break` terminates a `case` block normally.
fn absorb_break(result: ExecResult) -> ExecResult {
    match result {
        Err(ExecError::Control(Flow::Break)) => Ok(()),
        other => other,
    }
}

/// Parse `500ms`, `5s`, `2m`, `1h`, or a bare millisecond count.
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        return ms.trim().parse::<u64>().ok().map(Duration::from_millis);
    }
    if let Some(secs) = s.strip_suffix('s') {
        return secs.trim().parse::<u64>().ok().map(Duration::from_secs);
    }
    if let Some(mins) = s.strip_suffix('m') {
        return mins.trim().parse::<u64>().ok().map(|m| Duration::from_secs(m * 60));
    }
    if let Some(hours) = s.strip_suffix('h') {
        return hours.trim().parse::<u64>().ok().map(|h| Duration::from_secs(h * 3600));
    }
    s.parse::<u64>().ok().map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn duration_forms() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("250"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("soon"), None);
    }
}
