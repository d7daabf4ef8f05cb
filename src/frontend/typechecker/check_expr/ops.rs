//! Binary and unary operator checking.
//!
//! Arithmetic needs numeric operands and yields the common type under
//! numeric widening; short-circuit logic needs bools; bitwise and shift need
//! integers and keep the left operand's type; comparisons accept anything
//! and yield bool.

use crate::frontend::ast::{BinaryOp, Expr, Spanned, UnaryOp};
use crate::frontend::types::{bool_type, common_type, unknown_type, Ty, TyRef};

use super::TypeChecker;

impl TypeChecker {
    pub(crate) fn check_binary(
        &mut self,
        op: BinaryOp,
        left: &Spanned<Expr>,
        right: &Spanned<Expr>,
    ) -> TyRef {
        let left_ty = self.check_expr(left);
        let right_ty = self.check_expr(right);

        match op {
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Pow => {
                if !left_ty.is_numeric() && !left_ty.is_unknown() {
                    self.error("Left operand must be numeric", left.span.start);
                }
                if !right_ty.is_numeric() && !right_ty.is_unknown() {
                    self.error("Right operand must be numeric", right.span.start);
                }
                common_type(&left_ty, &right_ty)
            }

            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => bool_type(),

            BinaryOp::And | BinaryOp::Or => {
                if !matches!(left_ty.as_ref(), Ty::Bool) && !left_ty.is_unknown() {
                    self.error("Left operand must be bool", left.span.start);
                }
                if !matches!(right_ty.as_ref(), Ty::Bool) && !right_ty.is_unknown() {
                    self.error("Right operand must be bool", right.span.start);
                }
                bool_type()
            }

            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
                if !left_ty.is_integer() && !left_ty.is_unknown() {
                    self.error("Left operand must be integer", left.span.start);
                }
                if !right_ty.is_integer() && !right_ty.is_unknown() {
                    self.error("Right operand must be integer", right.span.start);
                }
                left_ty
            }

            // Tensor shapes are not modeled here; the operand's type carries.
            BinaryOp::MatMul => left_ty,
        }
    }

    pub(crate) fn check_unary(&mut self, op: UnaryOp, operand: &Spanned<Expr>) -> TyRef {
        let operand_ty = self.check_expr(operand);

        match op {
            UnaryOp::Neg => {
                if !operand_ty.is_numeric() && !operand_ty.is_unknown() {
                    self.error("Operand must be numeric", operand.span.start);
                    return unknown_type();
                }
                operand_ty
            }
            UnaryOp::Not => {
                if !matches!(operand_ty.as_ref(), Ty::Bool) && !operand_ty.is_unknown() {
                    self.error("Operand must be bool", operand.span.start);
                }
                bool_type()
            }
            UnaryOp::BitNot => {
                if !operand_ty.is_integer() && !operand_ty.is_unknown() {
                    self.error("Operand must be integer", operand.span.start);
                    return unknown_type();
                }
                operand_ty
            }
        }
    }
}
