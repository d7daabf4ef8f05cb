//! Calls, indexing, slicing, and member access.

use crate::frontend::ast::{Expr, Spanned};
use crate::frontend::source::Span;
use crate::frontend::types::{char_type, is_assignable, unknown_type, Ty, TyRef};

use super::TypeChecker;

impl TypeChecker {
    pub(crate) fn check_call(
        &mut self,
        callee: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        span: Span,
    ) -> TyRef {
        let callee_ty = self.check_expr(callee);

        match callee_ty.as_ref() {
            Ty::Function { params, ret, .. } => {
                if args.len() != params.len() {
                    self.error(
                        format!("Expected {} arguments, got {}", params.len(), args.len()),
                        span.start,
                    );
                }
                for (arg, param) in args.iter().zip(params.iter()) {
                    let arg_ty = self.check_expr(arg);
                    if !is_assignable(&arg_ty, param) {
                        self.error(
                            format!("Type mismatch: expected {}, got {}", param, arg_ty),
                            arg.span.start,
                        );
                    }
                }
                // Surplus arguments are still checked for their own errors.
                for arg in args.iter().skip(params.len()) {
                    self.check_expr(arg);
                }
                ret.clone()
            }
            Ty::Unknown => {
                for arg in args {
                    self.check_expr(arg);
                }
                unknown_type()
            }
            _ => {
                self.error("Cannot call non-function type", callee.span.start);
                for arg in args {
                    self.check_expr(arg);
                }
                unknown_type()
            }
        }
    }

    pub(crate) fn check_index(
        &mut self,
        object: &Spanned<Expr>,
        index: &Spanned<Expr>,
    ) -> TyRef {
        let object_ty = self.check_expr(object);
        self.check_expr(index);

        match object_ty.as_ref() {
            Ty::Array { element, .. } => element.clone(),
            Ty::List { element } => element.clone(),
            Ty::Dict { value, .. } => value.clone(),
            Ty::Str => char_type(),
            // Best effort without constant folding: the first element type.
            Ty::Tuple { elements } => elements.first().cloned().unwrap_or_else(unknown_type),
            Ty::Unknown => unknown_type(),
            _ => {
                self.error(format!("Cannot index type {}", object_ty), object.span.start);
                unknown_type()
            }
        }
    }

    /// A slice of a list, array, or string yields the same collection shape;
    /// fixed-size arrays lose their length. All bounds must be integers.
    pub(crate) fn check_slice(
        &mut self,
        object: &Spanned<Expr>,
        bounds: [&Option<Box<Spanned<Expr>>>; 3],
    ) -> TyRef {
        let object_ty = self.check_expr(object);

        for bound in bounds.into_iter().flatten() {
            let bound_ty = self.check_expr(bound);
            if !bound_ty.is_integer() && !bound_ty.is_unknown() {
                self.error("Slice bound must be integer", bound.span.start);
            }
        }

        match object_ty.as_ref() {
            Ty::List { .. } | Ty::Str => object_ty.clone(),
            Ty::Array { element, .. } => {
                std::rc::Rc::new(Ty::Array { element: element.clone(), size: None })
            }
            Ty::Unknown => unknown_type(),
            _ => {
                self.error(format!("Cannot slice type {}", object_ty), object.span.start);
                unknown_type()
            }
        }
    }

    pub(crate) fn check_member(
        &mut self,
        object: &Spanned<Expr>,
        member: &str,
        span: Span,
    ) -> TyRef {
        let object_ty = self.check_expr(object);

        match object_ty.as_ref() {
            Ty::Struct(cell) => {
                let found = cell.borrow().fields.iter().find(|f| f.name == member).map(|f| f.ty.clone());
                match found {
                    Some(ty) => ty,
                    None => {
                        let name = cell.borrow().name.clone();
                        self.error(
                            format!("Struct '{}' has no field '{}'", name, member),
                            span.start,
                        );
                        unknown_type()
                    }
                }
            }
            Ty::Class(cell) => {
                let found = cell.borrow().fields.iter().find(|f| f.name == member).map(|f| f.ty.clone());
                match found {
                    Some(ty) => ty,
                    None => {
                        let name = cell.borrow().name.clone();
                        self.error(
                            format!("Class '{}' has no field '{}'", name, member),
                            span.start,
                        );
                        unknown_type()
                    }
                }
            }
            Ty::Unknown => unknown_type(),
            _ => {
                self.error(
                    format!("Cannot access member on type {}", object_ty),
                    object.span.start,
                );
                unknown_type()
            }
        }
    }
}
