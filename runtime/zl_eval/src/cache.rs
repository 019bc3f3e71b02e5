//! Parsed-script cache keyed by path and modification time.
//!
//! Scripts are parsed once and shared as immutable [`Arc<Node>`] trees. A
//! file whose mtime moved forward (or backward) is reparsed; an unchanged
//! file is served from memory. Executions never mutate the tree, so one
//! parse can back any number of concurrent runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;
use zl_diagnostic::{Diagnostic, DiagnosticKind};
use zl_ir::Node;
use zl_parse::{FsLoader, ScriptLoader};

struct CachedScript {
    root: Arc<Node>,
    mtime: SystemTime,
}

/// Cache of parsed script files.
pub struct ScriptCache {
    files: RwLock<FxHashMap<PathBuf, CachedScript>>,
    loader: Box<dyn ScriptLoader>,
}

impl ScriptCache {
    pub fn new() -> Self {
        ScriptCache::with_loader(Box::new(FsLoader))
    }

    pub fn with_loader(loader: Box<dyn ScriptLoader>) -> Self {
        ScriptCache {
            files: RwLock::new(FxHashMap::default()),
            loader,
        }
    }

    /// Load `path`, reparsing only when its mtime differs from the cached
    /// entry.
    pub fn load(&self, path: &Path) -> Result<Arc<Node>, Diagnostic> {
        let mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| {
                Diagnostic::new(
                    DiagnosticKind::Parse,
                    format!("cannot stat script '{}': {e}", path.display()),
                )
            })?;

        {
            let files = self.files.read();
            if let Some(entry) = files.get(path) {
                if entry.mtime == mtime {
                    debug!(path = %path.display(), "script cache hit");
                    return Ok(Arc::clone(&entry.root));
                }
            }
        }

        debug!(path = %path.display(), "script cache miss, parsing");
        let root = Arc::new(zl_parse::parse_file(path, self.loader.as_ref())?);
        self.files.write().insert(
            path.to_path_buf(),
            CachedScript {
                root: Arc::clone(&root),
                mtime,
            },
        );
        Ok(root)
    }

    /// Drop every cached parse.
    pub fn clear(&self) {
        self.files.write().clear();
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl Default for ScriptCache {
    fn default() -> Self {
        ScriptCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write as _;

    fn write_script(dir: &tempfile::TempDir, name: &str, src: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(src.as_bytes()).unwrap();
        path
    }

    #[test]
    fn unchanged_file_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(&dir, "a.zl", "x: 1\n");
        let cache = ScriptCache::new();

        let first = cache.load(&path).unwrap();
        let second = cache.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn touched_file_is_reparsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(&dir, "a.zl", "x: 1\n");
        let cache = ScriptCache::new();

        let first = cache.load(&path).unwrap();
        // Rewrite with a different mtime.
        std::thread::sleep(std::time::Duration::from_millis(20));
        std::fs::write(&path, "x: 2\n").unwrap();
        let second = cache.load(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.children[0].raw_value(), Some("2"));
    }

    #[test]
    fn missing_file_is_a_parse_diagnostic() {
        let cache = ScriptCache::new();
        let err = cache.load(Path::new("/no/such/script.zl")).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Parse);
    }
}
