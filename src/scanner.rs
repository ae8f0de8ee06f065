//! Module `scanner` implements a one‑pass, streaming UTF‑8 lexer for the Kunyu language.
//!
//! It transforms a source string into a sequence of `Token<'a>`s, skipping insignificant
//! whitespace and comments, and emitting exactly one `EOF` token at the end. Designed as a
//! `FusedIterator`, it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input text.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token<'a>, KunyuError>` on each `.next()`.  The first lexing error ends
//!   the stream: there is no resynchronisation.
//!
//! - `tokenize(src) -> Result<Vec<Token>>`
//!   Collects the whole stream, stopping at the first error.
//!
//! # Token Recognition (`scan_token`)
//!
//! - Delimiters: `(`, `)`, `{`, `}`, `[`, `]`, `,`, `.`, `;`.
//! - Operators: `= + - * / % == != < <= > >= ! && ||`.
//! - Line breaks produce `NEWLINE` tokens; space, tab and carriage return are skipped.
//! - Comments: `#` to end of line, skipped in bulk via `memchr`.
//! - String literals: `"` … `"`.  A backslash keeps itself *and* the following character
//!   verbatim; there is no escape translation.  An unterminated string runs to end of input.
//! - Numeric literals: digits with at most one `.`; a second `.` ends the number.
//! - Identifiers/keywords: ASCII letters, `_` or any multi‑byte character, followed by
//!   ASCII alphanumerics, `_` or multi‑byte characters.  Keywords resolve through a
//!   perfect‑hash `KEYWORDS` map.
//! - Errors: any other character yields `KunyuError::lex(line, column, message)`.
//!
//! # Example
//!
//! ```rust
//! use kunyu::scanner::Scanner;
//!
//! let source = "输出 123; # example";
//! for result in Scanner::new(source) {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use crate::error::{KunyuError, Result};
use crate::token::{Delimiter, Keyword, Operator, Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "变量" => Keyword::Variable,
    "常量" => Keyword::Constant,
    "如果" => Keyword::If,
    "否则" => Keyword::Else,
    "循环" => Keyword::Loop,
    "函数" => Keyword::Function,
    "返回" => Keyword::Return,
    "输出" => Keyword::Print,
};

/// Look up a reserved word.
pub fn keyword(text: &str) -> Option<Keyword> {
    KEYWORDS.get(text).copied()
}

/// Leading byte of a multi‑byte UTF‑8 sequence.
#[inline(always)]
const fn is_utf8_start(b: u8) -> bool {
    b >= 0xC0
}

#[inline(always)]
const fn is_utf8_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

/// A single pass **scanner / lexer**.  The lifetime `'a` ties every emitted
/// token’s `lexeme` slice back to the original source text.
pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1‑based line counter (\n increments)
    column: usize,              // 1‑based column of `curr`, in characters
    start_line: usize,          // position of `start`, reported on the token
    start_column: usize,
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
    text: Option<&'a str>,      // lexeme override (string contents)
    finished: bool,             // EOF emitted or error reported
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            bytes: src.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            pending: None,
            text: None,
            finished: false,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it, keeping line/column in step.
    /// Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;

        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if !is_utf8_continuation(b) {
            self.column += 1;
        }

        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.curr]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the continuation bytes of a multi‑byte character whose
    /// leading byte has just been consumed.
    #[inline(always)]
    fn finish_char(&mut self) {
        while !self.is_at_end() && is_utf8_continuation(self.peek()) {
            self.advance();
        }
    }

    fn unexpected(&self) -> KunyuError {
        let c: char = self.src[self.start..].chars().next().unwrap_or('\0');

        KunyuError::lex(
            self.start_line,
            self.start_column,
            format!("Unexpected character: {}", c),
        )
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`.  If the lexeme produces an
    /// actual token the kind is stored in `self.pending`.  Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            // ── delimiters ───────────────────────────────────────────────
            b'(' => self.pending = Some(TokenType::DELIMITER(Delimiter::LeftParen)),
            b')' => self.pending = Some(TokenType::DELIMITER(Delimiter::RightParen)),
            b'{' => self.pending = Some(TokenType::DELIMITER(Delimiter::LeftBrace)),
            b'}' => self.pending = Some(TokenType::DELIMITER(Delimiter::RightBrace)),
            b'[' => self.pending = Some(TokenType::DELIMITER(Delimiter::LeftBracket)),
            b']' => self.pending = Some(TokenType::DELIMITER(Delimiter::RightBracket)),
            b',' => self.pending = Some(TokenType::DELIMITER(Delimiter::Comma)),
            b'.' => self.pending = Some(TokenType::DELIMITER(Delimiter::Dot)),
            b';' => self.pending = Some(TokenType::DELIMITER(Delimiter::Semicolon)),

            // ── single‑character operators ───────────────────────────────
            b'+' => self.pending = Some(TokenType::OPERATOR(Operator::Plus)),
            b'-' => self.pending = Some(TokenType::OPERATOR(Operator::Minus)),
            b'*' => self.pending = Some(TokenType::OPERATOR(Operator::Star)),
            b'/' => self.pending = Some(TokenType::OPERATOR(Operator::Slash)),
            b'%' => self.pending = Some(TokenType::OPERATOR(Operator::Percent)),

            // ── one‑or‑two‑character operators ───────────────────────────
            b'=' => {
                let op = if self.match_byte(b'=') {
                    Operator::EqualEqual
                } else {
                    Operator::Assign
                };

                self.pending = Some(TokenType::OPERATOR(op));
            }

            b'!' => {
                let op = if self.match_byte(b'=') {
                    Operator::BangEqual
                } else {
                    Operator::Bang
                };

                self.pending = Some(TokenType::OPERATOR(op));
            }

            b'<' => {
                let op = if self.match_byte(b'=') {
                    Operator::LessEqual
                } else {
                    Operator::Less
                };

                self.pending = Some(TokenType::OPERATOR(op));
            }

            b'>' => {
                let op = if self.match_byte(b'=') {
                    Operator::GreaterEqual
                } else {
                    Operator::Greater
                };

                self.pending = Some(TokenType::OPERATOR(op));
            }

            // ── doubled‑only operators (&&, ||) ─────────────────────────
            b'&' => {
                if !self.match_byte(b'&') {
                    return Err(self.unexpected());
                }

                self.pending = Some(TokenType::OPERATOR(Operator::AndAnd));
            }

            b'|' => {
                if !self.match_byte(b'|') {
                    return Err(self.unexpected());
                }

                self.pending = Some(TokenType::OPERATOR(Operator::OrOr));
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => {
                return Ok(()); // skip insignificants
            }

            b'\n' => self.pending = Some(TokenType::NEWLINE),

            // ── comments (# … until newline) ─────────────────────────────
            b'#' => {
                // The newline itself is left for the next call so that it
                // still produces a NEWLINE token.
                let end: usize = match memchr(b'\n', &self.bytes[self.curr..]) {
                    Some(pos) => self.curr + pos,
                    None => self.len(),
                };

                self.column += self.src[self.curr..end].chars().count();
                self.curr = end;

                return Ok(());
            }

            // ── string literal " … " ─────────────────────────────────────
            b'"' => self.parse_string(),

            // ── number literal (digit‑leading) ───────────────────────────
            b'0'..=b'9' => self.parse_number(),

            // ── identifiers / keywords ───────────────────────────────────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.parse_identifier(),

            b if is_utf8_start(b) => {
                self.finish_char();
                self.parse_identifier();
            }

            // ── unexpected character ─────────────────────────────────────
            _ => {
                self.finish_char();

                return Err(self.unexpected());
            }
        }

        Ok(())
    }

    /// Parse a double‑quoted string literal.
    ///
    /// * `self.start` still points to the opening `"`.
    /// * When we return, `self.curr` points **past** the closing `"`, or at
    ///   end of input for an unterminated string.
    fn parse_string(&mut self) {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\\' && !self.is_at_end() {
                // Keep the escaped character as‑is, even a quote.
                self.advance();
            }
        }

        let content: &'a str = &self.src[self.start + 1..self.curr];

        if !self.is_at_end() {
            self.advance(); // consume closing quote
        } else {
            debug!("Unterminated string runs to end of input");
        }

        self.text = Some(content);
        self.pending = Some(TokenType::STRING);
    }

    /// Parse a numeric literal (`123`, `3.14`, `7.`).  Only the first `.`
    /// belongs to the number.
    fn parse_number(&mut self) {
        let mut has_dot: bool = false;

        loop {
            match self.peek() {
                b'0'..=b'9' => {
                    self.advance();
                }

                b'.' if !has_dot => {
                    has_dot = true;
                    self.advance();
                }

                _ => break,
            }
        }

        self.pending = Some(TokenType::NUMBER);
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.  The first character is already consumed.
    fn parse_identifier(&mut self) {
        loop {
            let c: u8 = self.peek();

            if c.is_ascii_alphanumeric() || c == b'_' {
                self.advance();
            } else if is_utf8_start(c) {
                self.advance();
                self.finish_char();
            } else {
                break;
            }
        }

        let text: &str = &self.src[self.start..self.curr];

        let tt: TokenType = keyword(text)
            .map(TokenType::KEYWORD)
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            // 1. EOF guard – emit exactly one EOF then terminate.
            if self.is_at_end() {
                self.finished = true;

                return Some(Ok(Token::new(TokenType::EOF, "", self.line, self.column)));
            }

            // 2. Reset per‑token state.
            self.start = self.curr;
            self.start_line = self.line;
            self.start_column = self.column;
            self.pending = None;
            self.text = None;

            // 3. Attempt to scan a token; the first error ends the stream.
            if let Err(e) = self.scan_token() {
                self.finished = true;

                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                let lexeme: &'a str = match self.text.take() {
                    Some(text) => text,
                    None => &self.src[self.start..self.curr],
                };

                return Some(Ok(Token::new(
                    tt,
                    lexeme,
                    self.start_line,
                    self.start_column,
                )));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

/// Tokenize a whole source text.  Halts on the first lexing error.
pub fn tokenize(src: &str) -> Result<Vec<Token<'_>>> {
    let tokens: Vec<Token<'_>> = Scanner::new(src).collect::<Result<Vec<_>>>()?;

    info!("Tokenized {} tokens", tokens.len());

    Ok(tokens)
}
