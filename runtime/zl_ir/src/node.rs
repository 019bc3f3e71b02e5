//! The universal AST record.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Sentinel prefix marking a node value that was a single bare identifier
/// token in the source (as opposed to a quoted string literal). Downstream
/// resolution strips it before interpreting the text.
pub const RAW_VALUE_PREFIX: char = '\0';

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique identity of an AST node.
///
/// Assigned once at parse time from a shared counter. The engine keys its
/// handler cache by `NodeId`, which keeps the AST itself immutable and
/// shareable across threads: no per-node write state survives parsing.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    /// Allocate a fresh id.
    pub fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric form, for logging.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// A record in the parsed AST.
///
/// `name` is the slot name, attribute name, or one of the structural names
/// (`"root"`, `"do"`, `"then"`, ...); names beginning with `$` denote
/// variable-shorthand assignment. `value` is the raw scalar text attached
/// after `:` — string literals keep their surrounding quotes, bare
/// identifiers carry the [`RAW_VALUE_PREFIX`] sentinel. Children preserve
/// source order, which is semantically significant.
///
/// The tree is owned by the script cache; the executor and handlers only
/// borrow it and must not mutate its shape.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub value: Option<String>,
    pub children: Vec<Node>,
    pub line: u32,
    pub col: u32,
    pub file: Arc<str>,
}

impl Node {
    /// Create a node with source coordinates.
    pub fn new(name: impl Into<String>, line: u32, col: u32, file: Arc<str>) -> Self {
        Node {
            id: NodeId::fresh(),
            name: name.into(),
            value: None,
            children: Vec::new(),
            line,
            col,
            file,
        }
    }

    /// Create the distinguished `root` node for a source file.
    pub fn root(file: Arc<str>) -> Self {
        Node::new("root", 0, 0, file)
    }

    /// First child with the given name, in source order.
    pub fn find_child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Whether a child with the given name exists.
    pub fn has_child(&self, name: &str) -> bool {
        self.find_child(name).is_some()
    }

    /// The value text with the raw-identifier sentinel stripped.
    ///
    /// Quoted string literals are returned as-is (quotes included) so the
    /// caller can still distinguish literal text from identifiers.
    pub fn raw_value(&self) -> Option<&str> {
        self.value
            .as_deref()
            .map(|v| v.strip_prefix(RAW_VALUE_PREFIX).unwrap_or(v))
    }

    /// Total node count of this subtree, root included.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }
}

/// Strip matching surrounding quotes (`"..."` or `'...'`), if present.
pub fn unquote(s: &str) -> Option<&str> {
    let b = s.as_bytes();
    if b.len() >= 2 {
        let (first, last) = (b[0], b[b.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return Some(&s[1..s.len() - 1]);
        }
    }
    None
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw_value() {
            Some(v) => write!(f, "{}: {}", self.name, v),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn file() -> Arc<str> {
        Arc::from("test.zl")
    }

    #[test]
    fn ids_are_unique() {
        let a = Node::new("a", 1, 1, file());
        let b = Node::new("a", 1, 1, file());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn raw_value_strips_sentinel() {
        let mut n = Node::new("x", 1, 1, file());
        n.value = Some(format!("{RAW_VALUE_PREFIX}42"));
        assert_eq!(n.raw_value(), Some("42"));

        n.value = Some("\"hello\"".to_string());
        assert_eq!(n.raw_value(), Some("\"hello\""));
    }

    #[test]
    fn unquote_handles_both_quote_styles() {
        assert_eq!(unquote("\"hi\""), Some("hi"));
        assert_eq!(unquote("'hi'"), Some("hi"));
        assert_eq!(unquote("hi"), None);
        assert_eq!(unquote("\"unterminated"), None);
        assert_eq!(unquote("\""), None);
    }

    #[test]
    fn find_child_respects_source_order() {
        let mut root = Node::root(file());
        let mut first = Node::new("do", 1, 1, file());
        first.value = Some("a".to_string());
        let mut second = Node::new("do", 2, 1, file());
        second.value = Some("b".to_string());
        root.children.push(first);
        root.children.push(second);

        let found = root.find_child("do").map(|n| n.value.clone());
        assert_eq!(found, Some(Some("a".to_string())));
    }
}
