//! Bottom-up expression type inference.
//!
//! The entry point `check_expr` dispatches to themed submodules. Checking is
//! error-accumulating: invalid expressions resolve to `?` so later checks can
//! continue without cascading.

use std::rc::Rc;

use crate::frontend::ast::{Expr, Spanned};
use crate::frontend::types::{bool_type, f64_type, i64_type, string_type, Ty, TyRef};

use super::TypeChecker;

mod basics;
mod calls;
mod collections;
mod ops;

impl TypeChecker {
    /// Infer an expression's type, accumulating diagnostics along the way.
    pub(crate) fn check_expr(&mut self, expr: &Spanned<Expr>) -> TyRef {
        match &expr.node {
            Expr::Int(_) => i64_type(),
            Expr::Float(_) => f64_type(),
            Expr::Str(_) => string_type(),
            Expr::Bool(_) => bool_type(),
            Expr::None => Rc::new(Ty::Optional { inner: self.fresh_infer() }),
            Expr::Ident(name) => self.check_ident(name, expr.span),
            Expr::Binary { op, left, right } => self.check_binary(*op, left, right),
            Expr::Unary { op, operand } => self.check_unary(*op, operand),
            Expr::Call { callee, args } => self.check_call(callee, args, expr.span),
            Expr::Index { object, index } => self.check_index(object, index),
            Expr::Slice { object, start, end, step } => {
                self.check_slice(object, [start, end, step])
            }
            Expr::Member { object, member } => self.check_member(object, member, expr.span),
            Expr::Lambda(lambda) => self.check_lambda(lambda),
            Expr::Ternary { condition, then_expr, else_expr } => {
                self.check_ternary(condition, then_expr, else_expr)
            }
            Expr::List(elements) => self.check_list(elements),
            Expr::Dict(entries) => self.check_dict(entries),
            Expr::Tuple(elements) => self.check_tuple(elements),
            Expr::ListComp(comp) => self.check_list_comp(comp),
            // Unwrapping of a future type is deferred; await passes its
            // operand's type through.
            Expr::Await(inner) => self.check_expr(inner),
            Expr::Range { start, end, .. } => self.check_range(start, end),
            Expr::Assign { target, value, .. } => self.check_assign(target, value, expr.span),
        }
    }
}
