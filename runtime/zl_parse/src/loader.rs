//! Source loading abstraction used by include resolution.

use std::io;
use std::path::Path;

/// Loads script source text by path.
///
/// The parser goes through this seam rather than the filesystem directly so
/// the script cache can stack on top and tests can feed in-memory sources.
pub trait ScriptLoader: Send + Sync {
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Plain filesystem loader.
pub struct FsLoader;

impl ScriptLoader for FsLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}
