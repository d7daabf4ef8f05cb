//! Statement checking: bindings, control flow, returns.

use crate::frontend::ast::*;
use crate::frontend::source::Span;
use crate::frontend::symbols::{ScopeKind, Symbol, SymbolKind};
use crate::frontend::types::{is_assignable, unknown_type, Ty};

use super::TypeChecker;

impl TypeChecker {
    /// Check a block in a fresh block scope.
    pub(crate) fn check_block(&mut self, block: &Block) {
        self.symbols.enter_scope(ScopeKind::Block);
        for stmt in &block.statements {
            self.check_statement(stmt);
        }
        self.symbols.exit_scope();
    }

    pub(crate) fn check_statement(&mut self, stmt: &Spanned<Stmt>) {
        match &stmt.node {
            Stmt::Expr(expr) => {
                self.check_expr(expr);
            }
            Stmt::VarDecl(var) => self.check_var_decl(var, stmt.span),
            Stmt::If(if_stmt) => self.check_if_stmt(if_stmt),
            Stmt::While(while_stmt) => self.check_while_stmt(while_stmt),
            Stmt::For(for_stmt) => self.check_for_stmt(for_stmt),
            Stmt::Match(match_stmt) => self.check_match_stmt(match_stmt),
            Stmt::Return(value) => self.check_return_stmt(value.as_ref(), stmt.span),
            Stmt::Break => {
                if !self.symbols.in_loop() {
                    self.error("'break' outside of loop", stmt.span.start);
                }
            }
            Stmt::Continue => {
                if !self.symbols.in_loop() {
                    self.error("'continue' outside of loop", stmt.span.start);
                }
            }
            Stmt::Yield(expr) => {
                self.check_expr(expr);
            }
        }
    }

    fn check_var_decl(&mut self, var: &VarDeclStmt, span: Span) {
        let declared = var.ty.as_ref().map(|t| self.resolve_type(t));
        let initializer = var.initializer.as_ref().map(|e| (self.check_expr(e), e.span));

        let var_type = match (declared, initializer) {
            (Some(declared), Some((init_ty, init_span))) => {
                if !is_assignable(&init_ty, &declared) {
                    self.error(
                        format!("Type mismatch: expected {}, got {}", declared, init_ty),
                        init_span.start,
                    );
                }
                declared
            }
            (Some(declared), None) => declared,
            (None, Some((init_ty, _))) => init_ty,
            (None, None) => {
                self.error(format!("Cannot determine type of '{}'", var.name), span.start);
                unknown_type()
            }
        };

        let mut symbol = Symbol::new(var.name.as_str(), SymbolKind::Variable, var_type)
            .mutable(var.is_mutable && !var.is_const)
            .at(span.start);
        if var.initializer.is_some() {
            symbol = symbol.initialized();
        }
        if !self.symbols.define(symbol) {
            self.error(format!("Redefinition of '{}'", var.name), span.start);
        }
    }

    fn check_condition(&mut self, condition: &Spanned<Expr>) {
        let ty = self.check_expr(condition);
        if !ty.is_unknown() && !matches!(ty.as_ref(), Ty::Bool) {
            self.error("Condition must be bool", condition.span.start);
        }
    }

    fn check_if_stmt(&mut self, if_stmt: &IfStmt) {
        self.check_condition(&if_stmt.condition);
        self.check_block(&if_stmt.then_block);

        for (condition, block) in &if_stmt.elif_blocks {
            self.check_condition(condition);
            self.check_block(block);
        }

        if let Some(else_block) = &if_stmt.else_block {
            self.check_block(else_block);
        }
    }

    fn check_while_stmt(&mut self, while_stmt: &WhileStmt) {
        self.check_condition(&while_stmt.condition);
        self.symbols.enter_scope(ScopeKind::Loop);
        self.check_block(&while_stmt.body);
        self.symbols.exit_scope();
    }

    fn check_for_stmt(&mut self, for_stmt: &ForStmt) {
        let iterable_ty = self.check_expr(&for_stmt.iterable);
        let element_ty = self.iterable_element_type(&iterable_ty);

        self.symbols.enter_scope(ScopeKind::Loop);
        self.symbols.define(
            Symbol::new(for_stmt.variable.as_str(), SymbolKind::Variable, element_ty)
                .initialized()
                .at(for_stmt.iterable.span.start),
        );
        self.check_block(&for_stmt.body);
        self.symbols.exit_scope();
    }

    fn check_match_stmt(&mut self, match_stmt: &MatchStmt) {
        self.check_expr(&match_stmt.scrutinee);

        for arm in &match_stmt.arms {
            // Patterns are expressions for now; they are checked but
            // exhaustiveness is not enforced.
            self.check_expr(&arm.pattern);
            if let Some(guard) = &arm.guard {
                let guard_ty = self.check_expr(guard);
                if !guard_ty.is_unknown() && !matches!(guard_ty.as_ref(), Ty::Bool) {
                    self.error("Match guard must be bool", guard.span.start);
                }
            }
            self.check_block(&arm.body);
        }
    }

    fn check_return_stmt(&mut self, value: Option<&Spanned<Expr>>, span: Span) {
        if !self.symbols.in_function() {
            self.error("'return' outside of function", span.start);
            return;
        }
        self.symbols.set_saw_return();

        let expected = self.symbols.current_return_type();
        match value {
            Some(expr) => {
                let actual = self.check_expr(expr);
                if let Some(expected) = expected {
                    if !is_assignable(&actual, &expected) {
                        self.error(
                            format!("Type mismatch: expected {}, got {}", expected, actual),
                            expr.span.start,
                        );
                    }
                }
            }
            None => {
                if let Some(expected) = expected {
                    if !expected.is_void() && !expected.is_unknown() {
                        self.error(
                            format!("Expected return value of type {}", expected),
                            span.start,
                        );
                    }
                }
            }
        }
    }
}
