//! Tree‑walking evaluator.
//!
//! The interpreter keeps a single *current environment* pointer.  Every
//! construct that opens a scope swaps a fresh child frame in and restores the
//! previous frame on the way out, whether the body finished normally, hit a
//! `return`, or failed with a runtime error.
//!
//! `return` is not an error: statement execution yields a [`Flow`], and only
//! a function call boundary turns `Flow::Return` back into a value.

use std::cell::RefCell;
use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, ExprKind, LiteralValue, Stmt};
use crate::callable::{LoxClass, LoxFunction, NativeFunction};
use crate::environment::Environment;
use crate::error::{IResult, InterpretError, RuntimeError};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.
#[derive(Debug)]
pub enum Flow {
    Normal,
    /// A `return` is unwinding towards the nearest call boundary.
    Return(Value),
}

pub struct Interpreter {
    /// Frame holding top‑level declarations; unresolved names are looked up
    /// from here, falling through to the built‑ins frame above it.
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    /// Resolver output: expression id → scope distance.
    locals: HashMap<ExprId, usize>,
    printer: Box<dyn FnMut(&str)>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter that prints to standard output.
    pub fn new() -> Self {
        Self::with_printer(|text: &str| println!("{}", text))
    }

    /// Creates an interpreter whose `print` statements go to `printer`.
    pub fn with_printer(printer: impl FnMut(&str) + 'static) -> Self {
        info!("Initializing Interpreter");

        let builtins = Rc::new(RefCell::new(Environment::new()));

        for native in natives() {
            debug!("Defining native function '{}'", native.name);

            builtins
                .borrow_mut()
                .define(native.name, Value::NativeFunction(Rc::new(native)));
        }

        let globals = Rc::new(RefCell::new(Environment::with_enclosing(builtins)));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            printer: Box::new(printer),
        }
    }

    /// Records that `expr` refers to a binding `depth` frames up.
    pub fn note_local(&mut self, expr: &Expr, depth: usize) {
        debug!("Noting {:?} at depth {}", expr.id, depth);

        self.locals.insert(expr.id, depth);
    }

    /// The distance recorded for `expr`, or `None` for a global reference.
    pub fn resolved_depth(&self, expr: &Expr) -> Option<usize> {
        self.locals.get(&expr.id).copied()
    }

    /// Runs a resolved program.  The first runtime error aborts the run.
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        info!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            if let Flow::Return(_) = self.execute(stmt)? {
                // The parser rejects top-level `return`; nothing to unwind to.
                break;
            }
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> IResult<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                let text = value.to_string();

                debug!("Printing: {}", text);

                (self.printer)(&text);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(env)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));

                self.with_environment(Rc::new(RefCell::new(env)), |this| {
                    if let Some(init) = initializer {
                        this.execute(init)?;
                    }

                    loop {
                        if let Some(cond) = condition {
                            if !this.evaluate(cond)?.is_truthy() {
                                break;
                            }
                        }

                        if let Flow::Return(value) = this.execute(body)? {
                            return Ok(Flow::Return(value));
                        }

                        if let Some(incr) = increment {
                            this.evaluate(incr)?;
                        }
                    }

                    Ok(Flow::Normal)
                })
            }

            Stmt::Function(declaration) => {
                info!("Defining function '{}'", declaration.name.lexeme);

                let function =
                    LoxFunction::new(Rc::clone(declaration), Rc::clone(&self.environment));

                self.environment.borrow_mut().define(
                    &declaration.name.lexeme,
                    Value::Function(Rc::new(function)),
                );
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                info!("Defining class '{}'", name.lexeme);

                let superclass = match superclass {
                    Some(expr) => Some(self.evaluate_superclass(expr)?),
                    None => None,
                };

                // Methods close over a dedicated frame that carries `super`.
                let mut class_env = Environment::with_enclosing(Rc::clone(&self.environment));

                if let Some(parent) = &superclass {
                    class_env.define("super", Value::Class(Rc::clone(parent)));
                }

                let class_env = Rc::new(RefCell::new(class_env));

                let methods: HashMap<String, Rc<LoxFunction>> = methods
                    .iter()
                    .map(|method| {
                        let function = LoxFunction::new(Rc::clone(method), Rc::clone(&class_env));
                        (method.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();

                let class = LoxClass::new(name.lexeme.clone(), superclass, methods);

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Class(Rc::new(class)));
                Ok(Flow::Normal)
            }
        }
    }

    fn evaluate_superclass(&mut self, expr: &Expr) -> IResult<Rc<LoxClass>> {
        let ExprKind::Variable(name) = &expr.kind else {
            return Err(InterpretError::Internal(
                "superclass is not a variable reference".to_owned(),
            ));
        };

        match self.evaluate(expr)? {
            Value::Class(class) => Ok(class),
            _ => Err(RuntimeError::new(name, "Superclass must be a class.").into()),
        }
    }

    /// Runs `statements` inside `env`, restoring the current frame afterwards.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: Rc<RefCell<Environment>>,
    ) -> IResult<Flow> {
        self.with_environment(env, |this| {
            for stmt in statements {
                if let Flow::Return(value) = this.execute(stmt)? {
                    return Ok(Flow::Return(value));
                }
            }

            Ok(Flow::Normal)
        })
    }

    /// Runs a single statement inside `env`, restoring the current frame
    /// afterwards.
    pub fn execute_in(&mut self, stmt: &Stmt, env: Rc<RefCell<Environment>>) -> IResult<Flow> {
        self.with_environment(env, |this| this.execute(stmt))
    }

    fn with_environment<T>(
        &mut self,
        env: Rc<RefCell<Environment>>,
        body: impl FnOnce(&mut Self) -> IResult<T>,
    ) -> IResult<T> {
        debug!("Pushing scope frame");

        let previous = mem::replace(&mut self.environment, env);
        let result = body(self);
        self.environment = previous;
        result
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::from(s.as_str()),
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Nil => Value::Nil,
            }),

            ExprKind::Grouping(inner) => self.evaluate(inner),

            ExprKind::Unary { operator, right } => self.evaluate_unary(operator, right),

            ExprKind::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            ExprKind::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;

                let short_circuit = if operator.token_type == TokenType::OR {
                    left_val.is_truthy()
                } else {
                    !left_val.is_truthy()
                };

                if short_circuit {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            ExprKind::Variable(name) => self.look_up_variable(name, expr.id),

            ExprKind::Assign {
                name,
                target,
                value,
            } => {
                let value = self.evaluate(value)?;
                self.assign_to(name, target, value.clone())?;
                Ok(value)
            }

            ExprKind::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee)?;

                let mut arg_values = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    arg_values.push(self.evaluate(arg)?);
                }

                self.call_value(callee_val, paren, arg_values)
            }

            ExprKind::Dot { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(name),
                _ => Err(RuntimeError::new(name, "Only instances have properties.").into()),
            },

            ExprKind::This(keyword) => self.look_up_variable(keyword, expr.id),

            ExprKind::Super { keyword, method } => self.evaluate_super(expr.id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, op: &Token, right: &Expr) -> IResult<Value> {
        let right_val = self.evaluate(right)?;

        match op.token_type {
            TokenType::MINUS => match right_val {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::new(op, "Operand must be a number.").into()),
            },
            TokenType::BANG => Ok(Value::Bool(!right_val.is_truthy())),
            _ => Err(InterpretError::Internal(format!(
                "invalid unary operator '{}'",
                op.lexeme
            ))),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> IResult<Value> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        debug!(
            "Binary '{}' on {} and {}",
            op.lexeme,
            left_val.type_name(),
            right_val.type_name()
        );

        match op.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::from(format!("{}{}", a, b))),
                _ => Err(RuntimeError::new(
                    op,
                    "Operands must be two numbers or two strings.",
                )
                .into()),
            },

            // Host equality: NaN is unequal to itself.
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            _ => {
                let (a, b) = match (left_val, right_val) {
                    (Value::Number(a), Value::Number(b)) => (a, b),
                    _ => return Err(RuntimeError::new(op, "Operands must be numbers.").into()),
                };

                match op.token_type {
                    TokenType::MINUS => Ok(Value::Number(a - b)),
                    TokenType::STAR => Ok(Value::Number(a * b)),
                    TokenType::SLASH => Ok(Value::Number(a / b)),
                    TokenType::LESS => Ok(Value::Bool(a < b)),
                    TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
                    TokenType::GREATER => Ok(Value::Bool(a > b)),
                    TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
                    _ => Err(InterpretError::Internal(format!(
                        "invalid binary operator '{}'",
                        op.lexeme
                    ))),
                }
            }
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme),
            None => self.globals.borrow().get(name),
        }
    }

    fn assign_to(&mut self, name: &Token, target: &Expr, value: Value) -> IResult<()> {
        match &target.kind {
            ExprKind::Variable(_) => match self.locals.get(&target.id) {
                Some(&distance) => Environment::assign_at(&self.environment, distance, name, value),
                None => self.globals.borrow_mut().assign(name, value),
            },

            ExprKind::Dot { object, .. } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    instance.set(&name.lexeme, value);
                    Ok(())
                }
                // Blamed on the assignment's name token.
                _ => Err(RuntimeError::new(name, "Only instances have fields.").into()),
            },

            _ => Err(InterpretError::Internal(
                "assignment target is neither a variable nor a property".to_owned(),
            )),
        }
    }

    fn evaluate_super(&self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let Some(&distance) = self.locals.get(&id) else {
            return Err(RuntimeError::new(
                keyword,
                "Can't use 'super' outside of a subclass method.",
            )
            .into());
        };

        let Value::Class(superclass) = Environment::get_at(&self.environment, distance, "super")?
        else {
            return Err(InterpretError::Internal(
                "'super' does not hold a class".to_owned(),
            ));
        };

        // `this` lives in the frame just inside the one holding `super`.
        let this_distance = distance.checked_sub(1).ok_or_else(|| {
            InterpretError::Internal("'super' resolved without a 'this' frame".to_owned())
        })?;

        let Value::Instance(instance) =
            Environment::get_at(&self.environment, this_distance, "this")?
        else {
            return Err(InterpretError::Internal(
                "'this' does not hold an instance".to_owned(),
            ));
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
            None => Err(RuntimeError::new(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )
            .into()),
        }
    }

    /// Invokes a callable (native function, user function or class).
    fn call_value(&mut self, callee: Value, paren: &Token, arguments: Vec<Value>) -> IResult<Value> {
        match callee {
            Value::NativeFunction(native) => {
                check_arity(paren, native.name, native.arity, arguments.len())?;

                debug!("Calling native function '{}'", native.name);

                (native.func)(&arguments)
                    .map_err(|message| InterpretError::from(RuntimeError::new(paren, message)))
            }

            Value::Function(function) => {
                check_arity(paren, function.name(), function.arity(), arguments.len())?;

                debug!("Calling function '{}'", function.name());

                function.call(self, arguments)
            }

            Value::Class(class) => {
                check_arity(paren, &class.name, class.arity(), arguments.len())?;

                debug!("Instantiating class '{}'", class.name);

                LoxClass::instantiate(&class, self, arguments)
            }

            _ => Err(RuntimeError::new(paren, "Can only call functions and classes.").into()),
        }
    }
}

fn check_arity(paren: &Token, name: &str, arity: usize, got: usize) -> IResult<()> {
    if arity == got {
        return Ok(());
    }

    Err(RuntimeError::new(
        paren,
        format!(
            "Expected {} arguments but got {} calling '{}'.",
            arity, got, name
        ),
    )
    .into())
}

/// The built‑ins every program starts with.
fn natives() -> [NativeFunction; 2] {
    [
        NativeFunction {
            name: "clock",
            arity: 0,
            func: |_args: &[Value]| {
                let micros = chrono::Utc::now().timestamp_micros();
                Ok(Value::Number(micros as f64 / 1_000_000.0))
            },
        },
        NativeFunction {
            name: "toString",
            arity: 1,
            func: |args: &[Value]| match args {
                [value] => Ok(Value::from(value.to_string())),
                _ => Err("toString() takes exactly one argument.".to_owned()),
            },
        },
    ]
}
