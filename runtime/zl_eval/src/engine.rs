//! The embedding engine: slot registry, handler cache, functions, scripts.
//!
//! Hosts create one [`Engine`] per process (or per tenant), register their
//! slot handlers against it, and run parsed trees through it. All state the
//! interpreter needs at runtime lives here; nothing is stored in the AST,
//! which stays immutable and shareable.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;
use zl_diagnostic::Diagnostic;
use zl_ir::{Node, NodeId, SlotMeta};

use crate::cache::ScriptCache;
use crate::context::ExecContext;
use crate::errors::{ExecError, ExecResult, Flow};
use crate::executor;
use crate::scope::Scope;

/// A slot handler. Receives the execution context, the node being executed
/// (attributes and blocks as children), and the active scope.
pub type Handler = Arc<dyn Fn(&ExecContext<'_>, &Node, &Scope) -> ExecResult + Send + Sync>;

pub(crate) struct RegisteredSlot {
    pub handler: Handler,
    pub meta: Arc<SlotMeta>,
}

/// Script-defined functions, registered by the `fn` slot and invoked by
/// `call`. Bodies are shared subtrees of the (immutable) AST.
#[derive(Default)]
pub struct FunctionTable {
    fns: RwLock<FxHashMap<String, Arc<Node>>>,
}

impl FunctionTable {
    /// Register or replace a function body.
    pub fn define(&self, name: impl Into<String>, body: Arc<Node>) {
        self.fns.write().insert(name.into(), body);
    }

    pub fn get(&self, name: &str) -> Option<Arc<Node>> {
        self.fns.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.fns.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn clear(&self) {
        self.fns.write().clear();
    }
}

/// The interpreter engine.
pub struct Engine {
    registry: RwLock<FxHashMap<String, RegisteredSlot>>,
    /// Monomorphic inline cache: node identity to resolved handler. Entries
    /// are validated once, at insertion.
    handler_cache: DashMap<NodeId, Handler>,
    functions: FunctionTable,
    scripts: ScriptCache,
}

impl Engine {
    /// An engine with no slots registered. Only structural execution
    /// (shorthand assignment, child fallback) works until slots are added.
    pub fn new() -> Self {
        Engine {
            registry: RwLock::new(FxHashMap::default()),
            handler_cache: DashMap::new(),
            functions: FunctionTable::default(),
            scripts: ScriptCache::new(),
        }
    }

    /// An engine with the built-in slot library registered.
    pub fn with_builtins() -> Self {
        let engine = Engine::new();
        crate::builtins::register(&engine);
        engine
    }

    /// Register a slot handler under `name` with its metadata.
    ///
    /// Replacing an existing registration does not touch nodes already
    /// bound through the handler cache; call [`clear_handler_cache`] to
    /// rebind them.
    ///
    /// [`clear_handler_cache`]: Engine::clear_handler_cache
    pub fn register<F>(&self, name: impl Into<String>, meta: SlotMeta, handler: F)
    where
        F: Fn(&ExecContext<'_>, &Node, &Scope) -> ExecResult + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(slot = %name, "registering slot handler");
        self.registry.write().insert(
            name,
            RegisteredSlot {
                handler: Arc::new(handler),
                meta: Arc::new(meta),
            },
        );
    }

    /// Look up a registered slot by name.
    pub(crate) fn lookup(&self, name: &str) -> Option<(Handler, Arc<SlotMeta>)> {
        let registry = self.registry.read();
        registry
            .get(name)
            .map(|slot| (Arc::clone(&slot.handler), Arc::clone(&slot.meta)))
    }

    pub(crate) fn cached_handler(&self, id: NodeId) -> Option<Handler> {
        self.handler_cache.get(&id).map(|h| Arc::clone(&h))
    }

    pub(crate) fn cache_handler(&self, id: NodeId, handler: Handler) {
        self.handler_cache.insert(id, handler);
    }

    /// Drop every node-to-handler binding. Required after re-registering a
    /// slot so previously executed nodes pick up the new handler.
    pub fn clear_handler_cache(&self) {
        debug!(entries = self.handler_cache.len(), "clearing handler cache");
        self.handler_cache.clear();
    }

    /// Execute one node. Handlers recurse through here (usually via
    /// [`ExecContext::execute`]).
    pub fn execute(&self, ctx: &ExecContext<'_>, node: &Node, scope: &Scope) -> ExecResult {
        executor::execute(self, ctx, node, scope)
    }

    /// Run a tree to completion. A top-level `return` is normal
    /// termination; `break`/`continue` outside a loop and all failures
    /// surface as diagnostics.
    pub fn run(&self, ctx: &ExecContext<'_>, node: &Node, scope: &Scope) -> Result<(), Diagnostic> {
        match self.execute(ctx, node, scope) {
            Ok(()) => Ok(()),
            Err(ExecError::Control(Flow::Return)) => Ok(()),
            Err(other) => Err(other.into_diagnostic()),
        }
    }

    /// Load a script through the mtime-keyed parse cache.
    pub fn load_script(&self, path: &Path) -> Result<Arc<Node>, Diagnostic> {
        self.scripts.load(path)
    }

    /// Load and run a script file in one step.
    pub fn run_script(
        &self,
        ctx: &ExecContext<'_>,
        path: &Path,
        scope: &Scope,
    ) -> Result<(), Diagnostic> {
        let root = self.load_script(path)?;
        self.run(ctx, &root, scope)
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Registered slot names, sorted.
    pub fn sorted_slot_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Metadata for every registered slot, keyed by name. Drives generated
    /// documentation and editor tooling.
    pub fn documentation(&self) -> std::collections::BTreeMap<String, Arc<SlotMeta>> {
        self.registry
            .read()
            .iter()
            .map(|(name, slot)| (name.clone(), Arc::clone(&slot.meta)))
            .collect()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}
