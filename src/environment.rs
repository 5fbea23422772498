use crate::error::{IResult, InterpretError, RuntimeError};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One scope frame.  Frames are shared (`Rc<RefCell<_>>`) because closures
/// keep the frame they were declared in alive after the block exits.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Adds or overwrites a binding in this frame only.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Name lookup, walking outward through enclosing frames.
    pub fn get(&self, name: &Token) -> IResult<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined_variable(name))
        }
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> IResult<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined_variable(name))
        }
    }

    /// Reads `name` from the frame exactly `distance` links up, without any
    /// name search.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> IResult<Value> {
        let frame = Self::ancestor(env, distance)?;
        let value = frame.borrow().values.get(name).cloned();

        value.ok_or_else(|| {
            InterpretError::Internal(format!(
                "'{}' is not bound in the frame {} level(s) up",
                name, distance
            ))
        })
    }

    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> IResult<()> {
        let frame = Self::ancestor(env, distance)?;
        let mut frame = frame.borrow_mut();

        match frame.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(InterpretError::Internal(format!(
                "'{}' is not bound in the frame {} level(s) up",
                name.lexeme, distance
            ))),
        }
    }

    fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> IResult<Rc<RefCell<Environment>>> {
        let mut frame = Rc::clone(env);

        for hop in 0..distance {
            let next = frame.borrow().enclosing.clone();

            frame = next.ok_or_else(|| {
                InterpretError::Internal(format!(
                    "scope chain ended after {} of {} hop(s)",
                    hop, distance
                ))
            })?;
        }

        debug!("Walked {} frame(s) up the scope chain", distance);

        Ok(frame)
    }
}

fn undefined_variable(name: &Token) -> InterpretError {
    RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme)).into()
}
