//! Parser for ZL source.
//!
//! Builds the AST with a two-stack algorithm: a stack of open parent nodes
//! (seeded with `root`) and a pending most-recent node. `ident` opens a new
//! sibling; `:` attaches a possibly multi-token same-line value; `{` turns
//! the pending node into a parent; `}` closes the innermost one.
//!
//! After a file parses, [`resolve_includes`] inlines every child named
//! `include` by splicing in the children of the referenced file's root,
//! recursively, with a depth guard against include cycles.

mod loader;
mod parser;

pub use loader::{FsLoader, ScriptLoader};
pub use parser::parse_string;

use std::path::Path;

use zl_diagnostic::{Diagnostic, DiagnosticKind};
use zl_ir::{unquote, Node, RAW_VALUE_PREFIX};

/// Maximum include nesting before resolution gives up. Two files including
/// each other would otherwise recurse forever.
const MAX_INCLUDE_DEPTH: u32 = 64;

/// Parse a file from disk and resolve its includes.
pub fn parse_file(path: &Path, loader: &dyn ScriptLoader) -> Result<Node, Diagnostic> {
    let name = path.to_string_lossy();
    let src = loader.load(path).map_err(|e| {
        Diagnostic::new(DiagnosticKind::Parse, format!("cannot read '{name}': {e}"))
    })?;
    let mut root = parse_string(&src, &name)?;
    resolve_includes(&mut root, loader, 0)?;
    Ok(root)
}

/// Inline `include:` children by splicing in the included root's children.
///
/// The include path may be quoted or a bare identifier; both forms are
/// cleaned before loading. Includes compose recursively; nesting deeper
/// than [`MAX_INCLUDE_DEPTH`] is reported as a parse diagnostic instead of
/// recursing without bound.
pub fn resolve_includes(
    node: &mut Node,
    loader: &dyn ScriptLoader,
    depth: u32,
) -> Result<(), Diagnostic> {
    let mut i = 0;
    while i < node.children.len() {
        let child = &node.children[i];
        if child.name == "include" {
            if let Some(path) = include_path(child) {
                if depth >= MAX_INCLUDE_DEPTH {
                    return Err(Diagnostic::new(
                        DiagnosticKind::Parse,
                        format!("include depth exceeded at '{path}' (include cycle?)"),
                    )
                    .at_node(child)
                    .in_slot("include"));
                }
                tracing::debug!(path = %path, depth, "resolving include");

                let src = loader.load(Path::new(&path)).map_err(|e| {
                    Diagnostic::new(
                        DiagnosticKind::Parse,
                        format!("cannot read include '{path}': {e}"),
                    )
                    .at_node(child)
                    .in_slot("include")
                })?;
                let mut included = parse_string(&src, &path)?;
                resolve_includes(&mut included, loader, depth + 1)?;

                let spliced = included.children.len();
                node.children.splice(i..=i, included.children);
                i += spliced;
                continue;
            }
        }
        resolve_includes(&mut node.children[i], loader, depth)?;
        i += 1;
    }
    Ok(())
}

/// Extract the cleaned path from an `include` node: sentinel stripped,
/// quotes removed.
fn include_path(node: &Node) -> Option<String> {
    let raw = node.raw_value()?;
    let raw = raw.strip_prefix(RAW_VALUE_PREFIX).unwrap_or(raw);
    Some(unquote(raw).unwrap_or(raw).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn names(node: &Node) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    /// Structural equality ignoring node ids and source files.
    fn shape(node: &Node) -> String {
        let kids: Vec<String> = node.children.iter().map(shape).collect();
        format!(
            "{}={:?}[{}]",
            node.name,
            node.raw_value().unwrap_or(""),
            kids.join(",")
        )
    }

    #[test]
    fn include_is_replaced_by_file_children() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib.zl");
        fs::write(&lib, "shared: 1\nother: 2\n").unwrap();
        let main = dir.path().join("main.zl");
        fs::write(
            &main,
            format!("before: 0\ninclude: \"{}\"\nafter: 3\n", lib.display()),
        )
        .unwrap();

        let root = parse_file(&main, &FsLoader).unwrap();
        assert_eq!(names(&root), vec!["before", "shared", "other", "after"]);
    }

    #[test]
    fn include_matches_textual_inlining() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("b.zl");
        fs::write(&lib, "x: 1\ny: { z: 2 }\n").unwrap();
        let main = dir.path().join("a.zl");
        fs::write(&main, format!("include: \"{}\"\n", lib.display())).unwrap();

        let via_include = parse_file(&main, &FsLoader).unwrap();
        let inlined = parse_string("x: 1\ny: { z: 2 }\n", "inline").unwrap();
        assert_eq!(shape(&via_include), shape(&inlined));
    }

    #[test]
    fn nested_includes_compose() {
        let dir = tempfile::tempdir().unwrap();
        let c = dir.path().join("c.zl");
        fs::write(&c, "deepest: 1\n").unwrap();
        let b = dir.path().join("b.zl");
        fs::write(&b, format!("include: \"{}\"\nmid: 2\n", c.display())).unwrap();
        let a = dir.path().join("a.zl");
        fs::write(&a, format!("include: \"{}\"\n", b.display())).unwrap();

        let root = parse_file(&a, &FsLoader).unwrap();
        assert_eq!(names(&root), vec!["deepest", "mid"]);
    }

    #[test]
    fn include_cycle_is_reported_not_looped() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.zl");
        let b = dir.path().join("b.zl");
        fs::write(&a, format!("include: \"{}\"\n", b.display())).unwrap();
        fs::write(&b, format!("include: \"{}\"\n", a.display())).unwrap();

        let err = parse_file(&a, &FsLoader).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Parse);
        assert!(err.message.contains("include depth exceeded"), "{err}");
    }

    #[test]
    fn missing_include_file_is_a_parse_diagnostic() {
        let mut root = parse_string("include: \"no/such/file.zl\"\n", "main.zl").unwrap();
        let err = resolve_includes(&mut root, &FsLoader, 0).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::Parse);
        assert_eq!(err.filename, "main.zl");
        assert_eq!(err.line, 1);
    }
}
