//! Identifiers and assignment targets.

use crate::frontend::ast::{Expr, Spanned};
use crate::frontend::source::Span;
use crate::frontend::symbols::SymbolKind;
use crate::frontend::types::{is_assignable, unknown_type, TyRef};

use super::TypeChecker;

impl TypeChecker {
    /// Resolve an identifier against the scope chain.
    pub(crate) fn check_ident(&mut self, name: &str, span: Span) -> TyRef {
        let resolved = self
            .symbols
            .lookup(name)
            .map(|s| (s.ty.clone(), s.kind, s.is_initialized));

        match resolved {
            None => {
                self.error(format!("Undefined symbol '{}'", name), span.start);
                unknown_type()
            }
            Some((ty, kind, is_initialized)) => {
                if kind == SymbolKind::Variable && !is_initialized {
                    self.error(format!("Use of uninitialized variable '{}'", name), span.start);
                }
                ty
            }
        }
    }

    /// Assignment: the target must resolve to a mutable location and the
    /// value must be assignable to it. A plain-identifier target is resolved
    /// directly so that the first write to an annotated-but-uninitialized
    /// binding is not flagged as a read.
    pub(crate) fn check_assign(
        &mut self,
        target: &Spanned<Expr>,
        value: &Spanned<Expr>,
        span: Span,
    ) -> TyRef {
        let target_ty = match &target.node {
            Expr::Ident(name) => {
                let resolved = self.symbols.lookup(name).map(|s| (s.ty.clone(), s.is_mutable));
                match resolved {
                    None => {
                        self.error(format!("Undefined symbol '{}'", name), target.span.start);
                        unknown_type()
                    }
                    Some((ty, is_mutable)) => {
                        if !is_mutable {
                            self.error(
                                format!("Cannot assign to immutable variable '{}'", name),
                                span.start,
                            );
                        }
                        self.symbols.mark_initialized(name);
                        ty
                    }
                }
            }
            _ => self.check_expr(target),
        };

        let value_ty = self.check_expr(value);
        if !is_assignable(&value_ty, &target_ty) {
            self.error(
                format!("Type mismatch: expected {}, got {}", target_ty, value_ty),
                value.span.start,
            );
        }

        target_ty
    }
}
