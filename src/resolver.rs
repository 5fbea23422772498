//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String,bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration in one scope, reading a local in its
//!    own initializer, a class inheriting from itself).
//! 3. Tell the interpreter, for *each* variable, `this` and `super` occurrence,
//!    how many frames separate it from its declaration.  References found in
//!    no scope get no entry and are looked up as globals at run time.
//!
//! The scopes pushed here must match, one for one, the frames the evaluator
//! creates: blocks, function calls, `for` loops, and two per class body (one
//! for `super`, one for `this`).
//!
//! Errors are reported and the walk continues, so one run surfaces every
//! static error.  Any error at all means the program must not be executed.

use crate::ast::{Expr, ExprKind, FunctionDecl, Stmt};
use crate::error::{LoxError, Reporter, Result};
use crate::interpreter::Interpreter;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;
use std::rc::Rc;

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances by calling back into the interpreter.
pub struct Resolver<'r> {
    interpreter: &'r mut Interpreter,
    reporter: &'r mut dyn Reporter,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    errors: usize,
}

impl<'r> Resolver<'r> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'r mut Interpreter, reporter: &'r mut dyn Reporter) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            reporter,
            scopes: Vec::new(),
            errors: 0,
        }
    }

    /// Walk all top‑level statements.  Fails with the number of static
    /// errors reported if there were any.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<()> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        self.finish()
    }

    /// Resolve a standalone expression (the single‑expression mode).
    pub fn resolve_expression(mut self, expr: &Expr) -> Result<()> {
        self.resolve_expr(expr);
        self.finish()
    }

    fn finish(self) -> Result<()> {
        if self.errors == 0 {
            Ok(())
        } else {
            info!("Resolve pass found {} error(s)", self.errors);

            Err(LoxError::Static { count: self.errors })
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.errors += 1;
        self.reporter.report(LoxError::resolve(token, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(declaration) => {
                // the name is visible inside its own body (recursion)
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                // one scope for the whole loop, as the evaluator does
                self.begin_scope();
                if let Some(init) = initializer {
                    self.resolve_stmt(init);
                }
                if let Some(cond) = condition {
                    self.resolve_expr(cond);
                }
                if let Some(inc) = increment {
                    self.resolve_expr(inc);
                }
                self.resolve_stmt(body);
                self.end_scope();
            }

            Stmt::Return { value, .. } => {
                // `return` outside a function is the parser's concern
                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) {
        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let ExprKind::Variable(super_name) = &superclass.kind {
                if super_name.lexeme == name.lexeme {
                    self.error(super_name, "A class can't inherit from itself.");
                }
            }

            self.resolve_expr(superclass);
        }

        // Both frames exist even when nothing refers to them.
        self.begin_scope();
        if superclass.is_some() {
            self.define_synthetic("super");
        }

        self.begin_scope();
        self.define_synthetic("this");

        for method in methods {
            self.resolve_function(method);
        }

        self.end_scope();
        self.end_scope();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}

            ExprKind::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            ExprKind::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            ExprKind::Variable(name) => {
                if self.scopes.last().and_then(|scope| scope.get(&name.lexeme)) == Some(&false) {
                    self.error(name, "Can't read local variable in its own initializer.");
                }

                self.resolve_local(expr, name);
            }

            ExprKind::Assign { target, value, .. } => {
                // RHS first, then bind the target
                self.resolve_expr(value);

                match &target.kind {
                    ExprKind::Variable(name) => self.resolve_local(target, name),
                    ExprKind::Dot { object, .. } => self.resolve_expr(object),
                    _ => self.resolve_expr(target),
                }
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            // property names are looked up dynamically
            ExprKind::Dot { object, .. } => self.resolve_expr(object),

            ExprKind::This(keyword) => self.resolve_local(expr, keyword),

            ExprKind::Super { keyword, .. } => self.resolve_local(expr, keyword),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// One scope for the parameters, matching the per‑call frame.  A block
    /// body pushes its own scope on top, so its locals may shadow parameters.
    fn resolve_function(&mut self, declaration: &FunctionDecl) {
        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmt(&declaration.body);
        self.end_scope();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Global scope is not tracked, so redeclaring a global is allowed.
    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.insert(name.lexeme.clone(), false).is_some() {
            self.error(name, "Already a variable with this name in this scope.");
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn define_synthetic(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record `expr` as a local at depth `d`, or leave it unrecorded (global)
    /// if no scope declares `name`.
    fn resolve_local(&mut self, expr: &Expr, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.interpreter.note_local(expr, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
