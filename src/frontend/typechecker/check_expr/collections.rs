//! Collection literals, comprehensions, lambdas, conditionals, ranges.

use std::rc::Rc;

use crate::frontend::ast::{Expr, LambdaExpr, ListCompExpr, Spanned};
use crate::frontend::symbols::{ScopeKind, Symbol, SymbolKind};
use crate::frontend::types::{common_type, i64_type, Ty, TyRef};

use super::TypeChecker;

impl TypeChecker {
    /// Element types aggregate via the common-type rule; an empty literal
    /// gets a fresh inference variable.
    pub(crate) fn check_list(&mut self, elements: &[Spanned<Expr>]) -> TyRef {
        let Some((first, rest)) = elements.split_first() else {
            let element = self.fresh_infer();
            return Rc::new(Ty::List { element });
        };

        let mut element = self.check_expr(first);
        for expr in rest {
            let ty = self.check_expr(expr);
            element = common_type(&element, &ty);
        }
        Rc::new(Ty::List { element })
    }

    pub(crate) fn check_dict(&mut self, entries: &[(Spanned<Expr>, Spanned<Expr>)]) -> TyRef {
        let Some(((first_key, first_value), rest)) = entries.split_first() else {
            let key = self.fresh_infer();
            let value = self.fresh_infer();
            return Rc::new(Ty::Dict { key, value });
        };

        let mut key = self.check_expr(first_key);
        let mut value = self.check_expr(first_value);
        for (k, v) in rest {
            let kt = self.check_expr(k);
            let vt = self.check_expr(v);
            key = common_type(&key, &kt);
            value = common_type(&value, &vt);
        }
        Rc::new(Ty::Dict { key, value })
    }

    pub(crate) fn check_tuple(&mut self, elements: &[Spanned<Expr>]) -> TyRef {
        let elements = elements.iter().map(|e| self.check_expr(e)).collect();
        Rc::new(Ty::Tuple { elements })
    }

    /// The loop variable is bound to the iterable's element type in a fresh
    /// block scope; the optional guard must be bool.
    pub(crate) fn check_list_comp(&mut self, comp: &ListCompExpr) -> TyRef {
        let iterable_ty = self.check_expr(&comp.iterable);
        let element_ty = self.iterable_element_type(&iterable_ty);

        self.symbols.enter_scope(ScopeKind::Block);
        self.symbols.define(
            Symbol::new(comp.var.as_str(), SymbolKind::Variable, element_ty).initialized(),
        );

        let result_element = self.check_expr(&comp.element);

        if let Some(condition) = &comp.condition {
            let condition_ty = self.check_expr(condition);
            if !condition_ty.is_unknown() && !matches!(condition_ty.as_ref(), Ty::Bool) {
                self.error("Comprehension condition must be bool", condition.span.start);
            }
        }

        self.symbols.exit_scope();
        Rc::new(Ty::List { element: result_element })
    }

    /// Lambdas open a function scope; unannotated parameters get fresh
    /// inference variables, and the return type defaults to the body's type.
    pub(crate) fn check_lambda(&mut self, lambda: &LambdaExpr) -> TyRef {
        self.symbols.enter_scope(ScopeKind::Function);

        let mut param_types = Vec::new();
        for param in &lambda.params {
            let ty = param
                .ty
                .as_ref()
                .map(|t| self.resolve_type(t))
                .unwrap_or_else(|| self.fresh_infer());
            self.symbols.define(
                Symbol::new(param.name.as_str(), SymbolKind::Parameter, ty.clone()).initialized(),
            );
            param_types.push(ty);
        }

        let body_ty = self.check_expr(&lambda.body);
        self.symbols.exit_scope();

        let ret = lambda
            .return_type
            .as_ref()
            .map(|t| self.resolve_type(t))
            .unwrap_or(body_ty);

        Rc::new(Ty::Function { params: param_types, ret, is_async: false })
    }

    pub(crate) fn check_ternary(
        &mut self,
        condition: &Spanned<Expr>,
        then_expr: &Spanned<Expr>,
        else_expr: &Spanned<Expr>,
    ) -> TyRef {
        let condition_ty = self.check_expr(condition);
        if !condition_ty.is_unknown() && !matches!(condition_ty.as_ref(), Ty::Bool) {
            self.error("Condition must be bool", condition.span.start);
        }

        let then_ty = self.check_expr(then_expr);
        let else_ty = self.check_expr(else_expr);
        common_type(&then_ty, &else_ty)
    }

    /// Range bounds must be integers; the result is a list of integers, the
    /// stand-in for an iterator.
    pub(crate) fn check_range(&mut self, start: &Spanned<Expr>, end: &Spanned<Expr>) -> TyRef {
        let start_ty = self.check_expr(start);
        let end_ty = self.check_expr(end);

        if !start_ty.is_integer() && !start_ty.is_unknown() {
            self.error("Range start must be integer", start.span.start);
        }
        if !end_ty.is_integer() && !end_ty.is_unknown() {
            self.error("Range end must be integer", end.span.start);
        }

        Rc::new(Ty::List { element: i64_type() })
    }
}
