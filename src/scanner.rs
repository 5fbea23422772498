//! Module `scanner` implements a one‑pass, streaming lexer for the Lox language.
//!
//! It transforms source text into a sequence of [`Token`]s, skipping whitespace
//! and comments, and emitting exactly one `EOF` token at the end. Designed as a
//! `FusedIterator`, it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &str) -> Scanner<'_>`
//!   Create a new lexer over the input text.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, LoxError>` on each `.next()`. A lexical error does
//!   not stop the iterator: the offending input is skipped and scanning
//!   resumes with the next byte.
//!
//! - `Scanner::scan_tokens(self, reporter)`
//!   Drain the iterator, hand every error to the [`Reporter`], and return the
//!   valid tokens (always terminated by `EOF`).
//!
//! # Token Recognition
//!
//! - Single‑character tokens: `(`, `)`, `{`, `}`, `,`, `.`, `-`, `+`, `;`, `*`.
//! - Two‑character operators: `!=`, `==`, `<=`, `>=`.
//! - String literals: `"` … `"`, allowing multi‑line and reporting unterminated errors.
//! - Numeric literals: integer and optional fractional part (`1.` is `1` then `.`).
//! - Identifiers/keywords: alphanumeric/_ sequences, resolved via a perfect‑hash `KEYWORDS` map.
//! - Comments: `//` to end of line, skipped with `memchr`.
//!
//! # Example
//!
//! ```rust
//! use loxwalk::error::LoxError;
//! use loxwalk::scanner::Scanner;
//!
//! let mut errors: Vec<LoxError> = Vec::new();
//! let tokens = Scanner::new("print 123; // example").scan_tokens(&mut errors);
//! assert_eq!(tokens.len(), 4);
//! assert!(errors.is_empty());
//! ```

use crate::error::{LoxError, Reporter, Result};
use crate::token::{Literal, Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and"    => TokenType::AND,
    "class"  => TokenType::CLASS,
    "else"   => TokenType::ELSE,
    "false"  => TokenType::FALSE,
    "fun"    => TokenType::FUN,
    "for"    => TokenType::FOR,
    "if"     => TokenType::IF,
    "nil"    => TokenType::NIL,
    "or"     => TokenType::OR,
    "print"  => TokenType::PRINT,
    "return" => TokenType::RETURN,
    "super"  => TokenType::SUPER,
    "this"   => TokenType::THIS,
    "true"   => TokenType::TRUE,
    "var"    => TokenType::VAR,
    "while"  => TokenType::WHILE,
};

/// A single pass **scanner / lexer** over UTF‑8 source text.
pub struct Scanner<'a> {
    src: &'a str,                 // entire source text
    bytes: &'a [u8],              // same text, byte view for the hot path
    start: usize,                 // index of the *first* byte of the current lexeme
    curr: usize,                  // index *one past* the last byte examined
    line: usize,                  // 1‑based line counter (\n increments)
    pending: Option<TokenType>,   // recognised token kind waiting to be emitted
    literal: Option<Literal>,     // literal value for the pending token
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
            pending: None,
            literal: None,
        }
    }

    /// Scan the whole input.  Every lexical error is reported and skipped;
    /// the returned sequence always ends with a single `EOF` token.
    pub fn scan_tokens(self, reporter: &mut dyn Reporter) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();

        for result in self {
            match result {
                Ok(token) => tokens.push(token),
                Err(e) => reporter.report(e),
            }
        }

        info!("Scanned {} token(s)", tokens.len());

        tokens
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

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;
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

    /// Peek one byte beyond [`peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.bytes[self.curr + 1]
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

    /// `with_equal` if the next byte is `=` (consumed), else `single`.
    #[inline(always)]
    fn or_equal(&mut self, single: TokenType, with_equal: TokenType) -> TokenType {
        if self.match_byte(b'=') {
            with_equal
        } else {
            single
        }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* lexeme starting at `self.curr`.  If it produces an
    /// actual token the kind is stored in `self.pending`.  Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => self.pending = Some(TokenType::LEFT_PAREN),
            b')' => self.pending = Some(TokenType::RIGHT_PAREN),
            b'{' => self.pending = Some(TokenType::LEFT_BRACE),
            b'}' => self.pending = Some(TokenType::RIGHT_BRACE),
            b',' => self.pending = Some(TokenType::COMMA),
            b'.' => self.pending = Some(TokenType::DOT),
            b'-' => self.pending = Some(TokenType::MINUS),
            b'+' => self.pending = Some(TokenType::PLUS),
            b';' => self.pending = Some(TokenType::SEMICOLON),
            b'*' => self.pending = Some(TokenType::STAR),

            // ── one or two characters: !, !=, =, ==, <, <=, >, >= ─────────
            b'!' => self.pending = Some(self.or_equal(TokenType::BANG, TokenType::BANG_EQUAL)),
            b'=' => self.pending = Some(self.or_equal(TokenType::EQUAL, TokenType::EQUAL_EQUAL)),
            b'<' => self.pending = Some(self.or_equal(TokenType::LESS, TokenType::LESS_EQUAL)),
            b'>' => {
                self.pending = Some(self.or_equal(TokenType::GREATER, TokenType::GREATER_EQUAL))
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => {
                return Ok(());
            }

            b'\n' => {
                self.line += 1;

                return Ok(());
            }

            // ── comments (// … until newline) ────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // The newline itself is left for the main loop so the
                    // line counter stays in one place.
                    match memchr(b'\n', &self.bytes[self.curr..]) {
                        Some(pos) => self.curr += pos,
                        None => self.curr = self.len(),
                    }

                    return Ok(());
                }

                self.pending = Some(TokenType::SLASH);
            }

            b'"' => {
                return self.string();
            }

            b'0'..=b'9' => {
                self.number();
            }

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.identifier();
            }

            // ── unexpected character ─────────────────────────────────────
            _ => {
                // Skip the whole code point so the next lexeme starts on a
                // char boundary.
                if let Some(c) = self.src[self.start..].chars().next() {
                    self.curr = self.start + c.len_utf8();
                }

                return Err(LoxError::lex(self.line, "Unexpected character."));
            }
        }

        Ok(())
    }

    /// Parse a double‑quoted string literal.  `self.start` still points to
    /// the opening `"`.
    fn string(&mut self) -> Result<()> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.advance(); // closing quote

        let value: &str = &self.src[self.start + 1..self.curr - 1];

        self.pending = Some(TokenType::STRING);
        self.literal = Some(Literal::Str(value.to_owned()));

        Ok(())
    }

    /// Parse a numeric literal (`123`, `3.14`).  Fractions are optional.
    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A trailing '.' without a digit after it is not part of the number.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: &str = &self.src[self.start..self.curr];
        let n: f64 = text.parse::<f64>().unwrap_or(0.0); // digits only, cannot fail

        self.pending = Some(TokenType::NUMBER);
        self.literal = Some(Literal::Number(n));
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let text: &str = &self.src[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(text)
            .copied()
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            // EOF guard – emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1;
                return Some(Ok(Token::new(TokenType::EOF, "", None, self.line)));
            }

            self.start = self.curr;
            self.pending = None;
            self.literal = None;

            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            if let Some(tt) = self.pending.take() {
                let lexeme: &str = &self.src[self.start..self.curr];
                debug!("Scanned token ({:?}) on line {}", tt, self.line);

                return Some(Ok(Token::new(tt, lexeme, self.literal.take(), self.line)));
            }
            // whitespace / comment → continue
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
