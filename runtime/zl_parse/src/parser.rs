//! The two-stack tree builder.

use std::sync::Arc;

use zl_diagnostic::{Diagnostic, DiagnosticKind};
use zl_ir::{Node, Token, TokenKind, RAW_VALUE_PREFIX};
use zl_lexer::Lexer;

/// Parse in-memory ZL source into an AST rooted at a `root` node.
///
/// `filename` is recorded on every node for diagnostics; it does not need
/// to exist on disk.
pub fn parse_string(src: &str, filename: &str) -> Result<Node, Diagnostic> {
    Parser::new(src, filename).run()
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    file: Arc<str>,
    /// Open parent nodes, innermost last. The bottom entry is `root`.
    stack: Vec<Node>,
    /// Most recently created node, not yet committed to its parent. A `{`
    /// promotes it onto the stack instead.
    pending: Option<Node>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, filename: &str) -> Self {
        let file: Arc<str> = Arc::from(filename);
        Parser {
            lexer: Lexer::new(src),
            file: file.clone(),
            stack: vec![Node::root(file)],
            pending: None,
        }
    }

    fn run(mut self) -> Result<Node, Diagnostic> {
        loop {
            let tok = self.lexer.next_token();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Ident => self.on_ident(tok),
                TokenKind::Colon => self.on_colon(&tok),
                TokenKind::LBrace => self.on_lbrace(&tok),
                TokenKind::RBrace => self.close_block(),
                TokenKind::Str => {
                    // A bare string statement has no meaning; treat it like
                    // an anonymous node carrying the text.
                    let mut node = Node::new("", tok.line, tok.col, self.file.clone());
                    node.value = Some(format!("\"{}\"", tok.literal));
                    self.commit_pending();
                    self.pending = Some(node);
                }
                TokenKind::Error => {
                    return Err(Diagnostic::new(
                        DiagnosticKind::Parse,
                        format!("lexical error: unexpected character '{}'", tok.literal),
                    )
                    .at(self.file.as_ref(), tok.line, tok.col));
                }
            }
        }

        // Unbalanced braces: close whatever is still open.
        self.commit_pending();
        while self.stack.len() > 1 {
            self.close_block();
        }
        // The bottom of the stack is always the root.
        Ok(self.stack.remove(0))
    }

    fn on_ident(&mut self, tok: Token) {
        self.commit_pending();
        self.pending = Some(Node::new(tok.literal, tok.line, tok.col, self.file.clone()));
    }

    /// Attach a same-line value to the pending node, then handle the
    /// value-and-block (`name: value {`) and empty-block (`name: }`) forms.
    fn on_colon(&mut self, colon: &Token) {
        let mut parts: Vec<Token> = Vec::new();
        loop {
            let peek = self.lexer.peek_token();
            let stop = matches!(
                peek.kind,
                TokenKind::Eof | TokenKind::LBrace | TokenKind::RBrace | TokenKind::Colon
            ) || peek.line != colon.line;
            if stop {
                break;
            }
            parts.push(self.lexer.next_token());
        }

        if !parts.is_empty() {
            if let Some(node) = self.pending.as_mut() {
                node.value = Some(join_value(&parts));
            }
        }

        match self.lexer.peek_token().kind {
            TokenKind::LBrace => {
                self.lexer.next_token();
                self.open_pending_block(colon);
            }
            TokenKind::RBrace => {
                // `name: }` closes an empty slot.
                self.lexer.next_token();
                self.close_block();
            }
            _ => {}
        }
    }

    fn on_lbrace(&mut self, tok: &Token) {
        if self.pending.is_some() {
            self.open_pending_block(tok);
        } else {
            // Anonymous block.
            self.stack
                .push(Node::new("", tok.line, tok.col, self.file.clone()));
        }
    }

    /// Promote the pending node to an open parent.
    fn open_pending_block(&mut self, tok: &Token) {
        match self.pending.take() {
            Some(node) => self.stack.push(node),
            None => self
                .stack
                .push(Node::new("", tok.line, tok.col, self.file.clone())),
        }
    }

    /// Close the innermost open block, never popping the root.
    fn close_block(&mut self) {
        self.commit_pending();
        if self.stack.len() > 1 {
            if let Some(done) = self.stack.pop() {
                if let Some(parent) = self.stack.last_mut() {
                    parent.children.push(done);
                }
            }
        }
    }

    /// Append the pending node to the current parent's children.
    fn commit_pending(&mut self) {
        if let Some(node) = self.pending.take() {
            if let Some(parent) = self.stack.last_mut() {
                parent.children.push(node);
            }
        }
    }
}

/// Assemble a value from its tokens.
///
/// A single bare identifier is stored with the raw-identifier sentinel so
/// downstream resolution can tell `name: foo` from `name: "foo"`. String
/// tokens get their quotes restored; multiple tokens are joined with single
/// spaces so `1 + 2` survives as written.
fn join_value(parts: &[Token]) -> String {
    if let [only] = parts {
        if only.kind == TokenKind::Ident {
            return format!("{RAW_VALUE_PREFIX}{}", only.literal);
        }
    }

    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        match part.kind {
            TokenKind::Str => {
                out.push('"');
                out.push_str(&part.literal);
                out.push('"');
            }
            _ => out.push_str(&part.literal),
        }
    }
    out
}
