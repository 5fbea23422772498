//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! Four tiers exist: lexical, syntactic, static (resolution) and runtime.
//! The first three are *collected*: the scanner, parser and resolver hand
//! each diagnostic to a caller‑supplied [`Reporter`] and keep going.  Runtime
//! failures travel through the evaluator as [`InterpretError`] and abort the
//! current run.
//!
//! The module **does not** print diagnostics itself.

use thiserror::Error;

use log::debug;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error anchored at a token.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,
        /// `" at end"` or `" at '<lexeme>'"`.
        location: String,
    },

    /// Static‑analysis failure found by the resolver.
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        line: usize,
        location: String,
    },

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// A run was rejected before execution because `count` static
    /// diagnostics (lexical, syntactic or resolution) were reported.
    #[error("{count} error(s) reported before execution")]
    Static { count: usize },

    /// The evaluator hit a state the resolver should have ruled out.
    #[error("internal interpreter error: {0}")]
    Internal(String),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Source line the diagnostic points at, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolve { line, .. } => Some(*line),
            LoxError::Runtime(e) => Some(e.token.line),
            _ => None,
        }
    }
}

fn location_of(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_owned()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

/// A user‑visible runtime failure, carrying the token it is blamed on.
#[derive(Debug, Clone, Error)]
#[error("{}\n[line {}]", .message, .token.line)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Runtime error: line={}, msg={}", token.line, message);

        Self {
            token: token.clone(),
            message,
        }
    }
}

/// Error channel of the evaluator.
#[derive(Debug, Error)]
pub enum InterpretError {
    /// Caused by the user program (type mismatch, undefined name, ...).
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// The resolver and the evaluator disagree about scope layout.  Valid
    /// programs can never trigger this.
    #[error("internal interpreter error: {0}")]
    Internal(String),
}

/// Convenient alias for interpreter results.
pub type IResult<T> = std::result::Result<T, InterpretError>;

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Sink for lexical, syntactic and static diagnostics.
pub trait Reporter {
    fn report(&mut self, error: LoxError);
}

/// Collects diagnostics in order of discovery.
impl Reporter for Vec<LoxError> {
    fn report(&mut self, error: LoxError) {
        self.push(error);
    }
}
