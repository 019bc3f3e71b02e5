//! Hand-written lexer for ZL source.
//!
//! Converts a byte stream into [`Token`]s: identifiers, `:`, string
//! literals, braces, EOF, and error bytes. Whitespace outside strings is
//! insignificant; line comments start with `//` or `#` and run to the end
//! of the line. String literals are delimited by `"` or `'` with C-style
//! escapes.
//!
//! The identifier alphabet is deliberately permissive — letters, digits,
//! and `$ . _ - / * ! = < > ( ) + % { }` — so expression-like atoms
//! (`$i++`, `1+2`, `a>=b`) lex as single identifier tokens whose meaning is
//! decided by the parser and handlers. A maximal run that is exactly `{` or
//! `}` is reclassified as a brace token.
//!
//! Every token carries 1-based `(line, column)` coordinates, and a
//! single-token [`Lexer::peek_token`] supports the parser's lookahead.

use zl_ir::{Token, TokenKind};

/// Saved cursor state for single-token lookahead.
#[derive(Copy, Clone)]
struct Checkpoint {
    pos: usize,
    line: u32,
    col: u32,
}

/// Byte-oriented scanner over a single source string.
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

/// Whether a byte belongs to the permissive identifier alphabet.
fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'$' | b'.'
                | b'_'
                | b'-'
                | b'/'
                | b'*'
                | b'!'
                | b'='
                | b'<'
                | b'>'
                | b'('
                | b')'
                | b'+'
                | b'%'
                | b'{'
                | b'}'
        )
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> u8 {
        self.src.get(self.pos).copied().unwrap_or(0)
    }

    fn peek_byte(&self) -> u8 {
        self.src.get(self.pos + 1).copied().unwrap_or(0)
    }

    fn bump(&mut self) {
        if self.current() == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            line: self.line,
            col: self.col,
        }
    }

    fn restore(&mut self, cp: Checkpoint) {
        self.pos = cp.pos;
        self.line = cp.line;
        self.col = cp.col;
    }

    /// Produce the next token. Returns `Eof` forever once exhausted.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let (line, col) = (self.line, self.col);
        match self.current() {
            0 => Token::new(TokenKind::Eof, "", line, col),
            b':' => {
                self.bump();
                Token::new(TokenKind::Colon, ":", line, col)
            }
            q @ (b'"' | b'\'') => {
                let literal = self.read_string(q);
                Token::new(TokenKind::Str, literal, line, col)
            }
            b if is_ident_byte(b) => {
                let literal = self.read_ident();
                let kind = match literal.as_str() {
                    "{" => TokenKind::LBrace,
                    "}" => TokenKind::RBrace,
                    _ => TokenKind::Ident,
                };
                Token::new(kind, literal, line, col)
            }
            other => {
                self.bump();
                Token::new(TokenKind::Error, (other as char).to_string(), line, col)
            }
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek_token(&mut self) -> Token {
        let cp = self.checkpoint();
        let tok = self.next_token();
        self.restore(cp);
        tok
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while is_ident_byte(self.current()) {
            self.bump();
        }
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }

    /// Read a string literal, cooking C-style escapes. The opening quote is
    /// at the cursor; the closing quote is consumed when present. An
    /// unterminated string ends at EOF with whatever was gathered.
    fn read_string(&mut self, quote: u8) -> String {
        self.bump(); // opening quote
        let mut out = String::new();

        loop {
            match self.current() {
                0 => break,
                b if b == quote => break,
                b'\\' => {
                    self.bump();
                    match self.current() {
                        b'n' => out.push('\n'),
                        b't' => out.push('\t'),
                        b'r' => out.push('\r'),
                        b'"' => out.push('"'),
                        b'\'' => out.push('\''),
                        b'\\' => out.push('\\'),
                        0 => break,
                        other => {
                            // Unknown escape is preserved verbatim.
                            out.push('\\');
                            out.push(other as char);
                        }
                    }
                    self.bump();
                }
                _ => {
                    let start = self.pos;
                    self.bump();
                    // Copy the full UTF-8 sequence, not just one byte.
                    while self.current() & 0xC0 == 0x80 {
                        self.bump();
                    }
                    out.push_str(&String::from_utf8_lossy(&self.src[start..self.pos]));
                }
            }
        }

        if self.current() == quote {
            self.bump();
        }
        out
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let b = self.current();
            if b.is_ascii_whitespace() {
                self.bump();
                continue;
            }
            if b == b'#' || (b == b'/' && self.peek_byte() == b'/') {
                while self.current() != b'\n' && self.current() != 0 {
                    self.bump();
                }
                continue;
            }
            break;
        }
    }
}
