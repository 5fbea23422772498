use crate::ast::{Expr, ExprKind, LiteralValue};
use crate::token::Literal;

/// Renders an expression in Crafting‑Interpreters prefix form, e.g.
/// `(* (- 1.0) (group 2.0))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match &expr.kind {
            // ── literals ────────────────────────────────────────────────
            ExprKind::Literal(lit) => match lit {
                LiteralValue::Bool(b) => b.to_string(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                // same rendering as the token dump: 3 → "3.0"
                LiteralValue::Number(n) => Literal::Number(*n).to_string(),
            },

            ExprKind::Grouping(inner) => format!("(group {})", Self::print(inner)),

            ExprKind::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            }
            | ExprKind::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            ExprKind::Variable(name) => name.lexeme.clone(),

            ExprKind::Assign { target, value, .. } => {
                format!("(= {} {})", Self::print(target), Self::print(value))
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            ExprKind::Dot { object, name } => {
                format!("(. {} {})", Self::print(object), name.lexeme)
            }

            ExprKind::This(_) => "this".into(),

            ExprKind::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }
}
