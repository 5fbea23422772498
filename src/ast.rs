//! Abstract syntax tree for Lox programs.
//!
//! Expressions carry an [`ExprId`] handed out at construction time.  The
//! resolver's side table is keyed by that id, never by structure: two
//! identical `a` references on the same line are still distinct keys and may
//! resolve to different scope distances.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

/// Identity of one expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

impl ExprId {
    /// Process‑wide unique id; REPL lines parsed by separate parsers share
    /// one interpreter, so ids must never repeat.
    fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constants `true` / `false`.
    Bool(bool),

    /// The `nil` literal.
    Nil,
}

/// An expression node: identity plus shape.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            id: ExprId::fresh(),
            kind,
        }
    }
}

/// Every kind of *expression* in Lox.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    /// Prefix unary operator expression: `!ready`, `-42`.
    Unary { operator: Token, right: Box<Expr> },

    /// Infix arithmetic, comparison or equality operator.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Variable access.
    Variable(Token),

    /// Assignment.  `target` is either a [`ExprKind::Variable`] or a
    /// [`ExprKind::Dot`]; `name` is the variable or property name token.
    Assign {
        name: Token,
        target: Box<Expr>,
        value: Box<Expr>,
    },

    /// Function‑ or method‑call expression.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token, retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// Property access `object.name`; also an assignment target.
    Dot { object: Box<Expr>, name: Token },

    /// The `this` keyword inside a method.
    This(Token),

    /// `super.method`
    Super { keyword: Token, method: Token },
}

/// A function or method declaration.  Shared between the AST and every
/// runtime function value created from it.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    /// Runs inside the frame holding the parameters.  Usually a block,
    /// which adds its own nested frame.
    pub body: Box<Stmt>,
}

/// **Abstract‑Syntax‑Tree node** for *statements*.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement used for output.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    /// `for` keeps its own shape (rather than desugaring into `while`) so the
    /// loop scope is explicit for both the resolver and the evaluator.
    For {
        initializer: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },

    Function(Rc<FunctionDecl>),

    Return {
        /// The `return` keyword token.
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Class {
        name: Token,
        /// Always an [`ExprKind::Variable`] when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}
