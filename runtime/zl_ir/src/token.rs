//! Token definitions shared between the lexer and parser.

use std::fmt;

/// Discriminant for a lexed token.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TokenKind {
    /// A maximal run of the permissive identifier alphabet. Admits
    /// expression-like atoms (`$i++`, `1+2`, `a>=b`) as single tokens;
    /// their meaning is decided downstream.
    Ident,
    /// `:` separating a name from its value or block.
    Colon,
    /// A string literal delimited by `"` or `'`, escapes already cooked.
    /// The literal carries the inner text without the quotes.
    Str,
    /// A standalone `{`.
    LBrace,
    /// A standalone `}`.
    RBrace,
    /// End of input. The lexer keeps returning this once exhausted.
    Eof,
    /// A byte outside the accepted alphabet.
    Error,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Ident => "IDENTIFIER",
            TokenKind::Colon => "COLON",
            TokenKind::Str => "STRING",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::Eof => "EOF",
            TokenKind::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// A single lexed token with its source coordinates.
///
/// Lines and columns are 1-based; the column points at the first byte of
/// the token.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub line: u32,
    pub col: u32,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, line: u32, col: u32) -> Self {
        Token {
            kind,
            literal: literal.into(),
            line,
            col,
        }
    }
}
