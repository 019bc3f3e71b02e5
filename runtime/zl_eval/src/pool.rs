//! Scope pooling.
//!
//! Executions are typically short-lived (one per request or job), so scopes
//! are recycled through a freelist instead of reallocated. Handing a scope
//! back always resets it first, so no bindings leak between executions.

use std::ops::Deref;
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::scope::Scope;

/// Upper bound on retained scopes; beyond this they are simply dropped.
const MAX_POOLED: usize = 64;

/// A freelist of reusable [`Scope`]s.
pub struct ScopePool {
    free: Mutex<Vec<Scope>>,
}

static GLOBAL_POOL: OnceLock<ScopePool> = OnceLock::new();

impl ScopePool {
    pub fn new() -> Self {
        ScopePool {
            free: Mutex::new(Vec::new()),
        }
    }

    /// The process-wide pool.
    pub fn global() -> &'static ScopePool {
        GLOBAL_POOL.get_or_init(ScopePool::new)
    }

    /// Take a scope from the pool, or create one if the pool is empty.
    /// The returned handle gives the scope back on drop.
    pub fn get(&self) -> PooledScope<'_> {
        let scope = self.free.lock().pop().unwrap_or_default();
        PooledScope {
            scope: Some(scope),
            pool: self,
        }
    }

    fn put(&self, scope: Scope) {
        scope.reset();
        let mut free = self.free.lock();
        if free.len() < MAX_POOLED {
            free.push(scope);
        }
    }

    /// Number of scopes currently waiting for reuse.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

impl Default for ScopePool {
    fn default() -> Self {
        ScopePool::new()
    }
}

/// RAII handle over a pooled scope. Dereferences to [`Scope`]; returning to
/// the pool (with a reset) happens automatically on drop.
pub struct PooledScope<'p> {
    scope: Option<Scope>,
    pool: &'p ScopePool,
}

impl Deref for PooledScope<'_> {
    type Target = Scope;

    fn deref(&self) -> &Scope {
        // Invariant: `scope` is only None after drop.
        self.scope.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledScope<'_> {
    fn drop(&mut self) {
        if let Some(scope) = self.scope.take() {
            self.pool.put(scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use zl_ir::Value;

    #[test]
    fn scopes_are_recycled() {
        let pool = ScopePool::new();
        {
            let scope = pool.get();
            scope.set("x", 1i64);
        }
        assert_eq!(pool.idle(), 1);

        // The recycled scope must come back empty.
        let scope = pool.get();
        assert_eq!(pool.idle(), 0);
        assert_eq!(scope.get("x"), None);
    }

    #[test]
    fn no_leakage_across_sibling_uses() {
        let pool = ScopePool::new();
        {
            let a = pool.get();
            a.set("secret", Value::Str("s3cret".into()));
        }
        {
            let b = pool.get();
            assert!(b.is_empty());
        }
    }

    #[test]
    fn pool_is_bounded() {
        let pool = ScopePool::new();
        let handles: Vec<_> = (0..100).map(|_| pool.get()).collect();
        drop(handles);
        assert!(pool.idle() <= MAX_POOLED);
    }
}
