//! A tree‑walking interpreter for Lox.
//!
//! Pipeline: [`scanner`] → [`parser`] → [`resolver`] → [`interpreter`].
//! The first three stages report diagnostics through a [`Reporter`] and keep
//! going; execution only starts once all of them came back clean.

pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use log::info;

use crate::error::{InterpretError, LoxError, Reporter, Result};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Counts what passes through to the caller's reporter.
struct Tally<'a> {
    inner: &'a mut dyn Reporter,
    count: usize,
}

impl<'a> Tally<'a> {
    fn new(inner: &'a mut dyn Reporter) -> Self {
        Self { inner, count: 0 }
    }

    fn check(&self) -> Result<()> {
        if self.count == 0 {
            Ok(())
        } else {
            Err(LoxError::Static { count: self.count })
        }
    }
}

impl Reporter for Tally<'_> {
    fn report(&mut self, error: LoxError) {
        self.count += 1;
        self.inner.report(error);
    }
}

/// One interpreter session.  Global state persists between calls, which is
/// what a REPL needs.
pub struct Lox {
    interpreter: Interpreter,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new(Interpreter::new())
    }
}

impl Lox {
    pub fn new(interpreter: Interpreter) -> Self {
        Self { interpreter }
    }

    /// Scan, parse, resolve and run a whole program.
    pub fn run(&mut self, source: &str, reporter: &mut dyn Reporter) -> Result<()> {
        let mut tally = Tally::new(reporter);

        let tokens = Scanner::new(source).scan_tokens(&mut tally);
        let statements = Parser::new(tokens, &mut tally).parse();
        tally.check()?;

        Resolver::new(&mut self.interpreter, &mut tally).resolve(&statements)?;

        info!("Static checks passed, executing");

        self.interpreter
            .interpret(&statements)
            .map_err(runtime_failure)
    }

    /// Evaluate `source` as a single expression and return its printed form.
    pub fn evaluate(&mut self, source: &str, reporter: &mut dyn Reporter) -> Result<String> {
        let mut tally = Tally::new(reporter);

        let tokens = Scanner::new(source).scan_tokens(&mut tally);
        let expr = Parser::new(tokens, &mut tally).parse_expression();
        tally.check()?;

        let Some(expr) = expr else {
            return Err(LoxError::Static { count: 1 });
        };

        Resolver::new(&mut self.interpreter, &mut tally).resolve_expression(&expr)?;

        self.interpreter
            .evaluate(&expr)
            .map(|value| value.to_string())
            .map_err(runtime_failure)
    }
}

fn runtime_failure(error: InterpretError) -> LoxError {
    match error {
        InterpretError::Runtime(e) => LoxError::Runtime(e),
        InterpretError::Internal(message) => LoxError::Internal(message),
    }
}
