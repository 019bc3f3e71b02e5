//! Chained, thread-safe variable environment.
//!
//! Each scope owns a map of bindings and an optional parent. Lookups check
//! the local map, then the parent chain, then fall back to dot/bracket path
//! navigation with safe-navigation semantics: any dead end returns "not
//! found" rather than failing.
//!
//! `get` releases the local read lock before recursing into the parent, so
//! chained lookups never hold two locks at once.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use zl_ir::Value;

/// A single scope in the chain.
#[derive(Debug, Default)]
pub struct Scope {
    vars: RwLock<FxHashMap<String, Value>>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    /// A fresh root scope.
    pub fn new() -> Self {
        Scope::default()
    }

    /// A scope chained under `parent`.
    pub fn with_parent(parent: Arc<Scope>) -> Self {
        Scope {
            vars: RwLock::new(FxHashMap::default()),
            parent: Some(parent),
        }
    }

    /// Store a variable in this scope. Never writes the parent.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.write().insert(key.into(), value.into());
    }

    /// Look up a variable, walking the parent chain and then dot/bracket
    /// paths (`user.orders.0.total`, `items[2]`).
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(v) = self.get_flat(key) {
            return Some(v);
        }

        if key.contains('.') || key.contains('[') {
            return self.get_path(key);
        }
        None
    }

    /// Direct key lookup: local map, then the parent chain. No paths.
    fn get_flat(&self, key: &str) -> Option<Value> {
        {
            let vars = self.vars.read();
            if let Some(v) = vars.get(key) {
                return Some(v.clone());
            }
        }
        // Lock released; safe to recurse.
        self.parent.as_ref().and_then(|p| p.get_flat(key))
    }

    /// Path navigation. The first segment resolves like a flat key; each
    /// further segment indexes into maps by name or lists by number.
    fn get_path(&self, key: &str) -> Option<Value> {
        let normalized = normalize_path(key);
        let mut segments = normalized.split('.').filter(|s| !s.is_empty());

        let mut current = self.get_flat(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Map(ref m) => m.get(segment)?.clone(),
                Value::List(ref l) => {
                    let idx: usize = segment.parse().ok()?;
                    l.get(idx)?.clone()
                }
                // Can't go deeper: safe navigation, not an error.
                _ => return None,
            };
        }
        Some(current)
    }

    /// Snapshot of this scope's own variables (parents excluded).
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.vars
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Remove every binding in place so a pooled scope can be reused
    /// without leaking data between executions.
    pub fn reset(&self) {
        self.vars.write().clear();
    }

    /// Shallow copy of the variable map with no parent link, for detaching
    /// a scope from its chain.
    pub fn clone_detached(&self) -> Scope {
        Scope {
            vars: RwLock::new(self.vars.read().clone()),
            parent: None,
        }
    }

    /// Number of bindings in this scope alone.
    pub fn len(&self) -> usize {
        self.vars.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.read().is_empty()
    }
}

/// Normalize bracket indexing to dot form: `a[1].b` becomes `a.1.b`.
fn normalize_path(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        match ch {
            '[' => out.push('.'),
            ']' => {}
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn map(entries: &[(&str, Value)]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn set_then_get() {
        let scope = Scope::new();
        scope.set("x", 42i64);
        assert_eq!(scope.get("x"), Some(Value::Int(42)));
    }

    #[test]
    fn missing_key_is_none() {
        let scope = Scope::new();
        assert_eq!(scope.get("nope"), None);
    }

    #[test]
    fn parent_chain_lookup() {
        let parent = Arc::new(Scope::new());
        parent.set("shared", "base");
        let child = Scope::with_parent(parent.clone());
        assert_eq!(child.get("shared"), Some(Value::Str("base".into())));

        // Shadowing: the child's binding wins without touching the parent.
        child.set("shared", "mine");
        assert_eq!(child.get("shared"), Some(Value::Str("mine".into())));
        assert_eq!(parent.get("shared"), Some(Value::Str("base".into())));
    }

    #[test]
    fn set_never_writes_parent() {
        let parent = Arc::new(Scope::new());
        let child = Scope::with_parent(parent.clone());
        child.set("k", 1i64);
        assert_eq!(parent.get("k"), None);
    }

    #[test]
    fn dot_path_navigation() {
        let scope = Scope::new();
        scope.set(
            "user",
            map(&[
                ("name", Value::Str("Budi".into())),
                (
                    "orders",
                    Value::List(vec![
                        map(&[("total", Value::Int(100))]),
                        map(&[("total", Value::Int(250))]),
                    ]),
                ),
            ]),
        );

        assert_eq!(scope.get("user.name"), Some(Value::Str("Budi".into())));
        assert_eq!(scope.get("user.orders.1.total"), Some(Value::Int(250)));
        assert_eq!(scope.get("user.orders[0].total"), Some(Value::Int(100)));
    }

    #[test]
    fn dot_path_through_parent() {
        let parent = Arc::new(Scope::new());
        parent.set("cfg", map(&[("port", Value::Int(8080))]));
        let child = Scope::with_parent(parent);
        assert_eq!(child.get("cfg.port"), Some(Value::Int(8080)));
    }

    #[test]
    fn literal_dotted_key_beats_path() {
        let scope = Scope::new();
        scope.set("a.b", 1i64);
        assert_eq!(scope.get("a.b"), Some(Value::Int(1)));
    }

    #[test]
    fn safe_navigation_on_dead_ends() {
        let scope = Scope::new();
        scope.set("a", map(&[("b", Value::Int(1))]));
        assert_eq!(scope.get("a.b.c"), None); // Int is not traversable
        assert_eq!(scope.get("a.missing"), None);
        assert_eq!(scope.get("missing.b"), None);
        scope.set("list", Value::List(vec![Value::Int(0)]));
        assert_eq!(scope.get("list.9"), None);
        assert_eq!(scope.get("list.notanumber"), None);
    }

    #[test]
    fn reset_clears_in_place() {
        let scope = Scope::new();
        scope.set("x", 1i64);
        scope.reset();
        assert_eq!(scope.get("x"), None);
        assert!(scope.is_empty());
    }

    #[test]
    fn clone_detached_drops_parent() {
        let parent = Arc::new(Scope::new());
        parent.set("p", 1i64);
        let child = Scope::with_parent(parent);
        child.set("c", 2i64);

        let detached = child.clone_detached();
        assert_eq!(detached.get("c"), Some(Value::Int(2)));
        assert_eq!(detached.get("p"), None);
    }

    #[test]
    fn to_map_is_a_snapshot() {
        let scope = Scope::new();
        scope.set("a", 1i64);
        let snap = scope.to_map();
        scope.set("b", 2i64);
        assert_eq!(snap.len(), 1);
    }

    proptest! {
        /// Safe navigation never panics, whatever the path looks like.
        #[test]
        fn get_never_panics(path in "[a-c.\\[\\]0-9]{0,20}") {
            let scope = Scope::new();
            scope.set("a", map(&[("b", Value::List(vec![Value::Int(1)]))]));
            let _ = scope.get(&path);
        }
    }
}
