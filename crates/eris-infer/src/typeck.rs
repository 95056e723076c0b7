//! Expression-level checks built on unification.
//!
//! Callers walk their own AST and hand operand types in; each check records
//! its failures as reports and returns `<error>` for the offending node so
//! the rest of the unit can still be analyzed.

use eris_ast::{BinOp, NodeId, TypeAnnotation};
use eris_types::traits::{ADDABLE, ARITHMETIC, COMPARABLE, EQUATABLE};
use eris_types::{Type, TypeInfo};

use crate::Session;
use crate::constant::fold;
use crate::error::{Report, TypeError};

/// The trait both operands of `op` must satisfy.
///
/// `None` for `and`/`or`, which require `bool` directly.
pub fn operator_trait(op: BinOp) -> Option<&'static str> {
    match op {
        BinOp::Add => Some(ADDABLE),
        BinOp::Sub | BinOp::Mul | BinOp::Div => Some(ARITHMETIC),
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => Some(COMPARABLE),
        BinOp::Eq | BinOp::Ne => Some(EQUATABLE),
        BinOp::And | BinOp::Or => None,
    }
}

impl Session {
    /// Turn a user-written annotation into a semantic type.
    ///
    /// `_` becomes a fresh variable.
    pub fn resolve_annotation(&mut self, ann: &TypeAnnotation) -> Result<Type, TypeError> {
        match ann {
            TypeAnnotation::Named(name) => match name.as_str() {
                "int" => Ok(Type::Int),
                "any" => Ok(Type::Any),
                "None" => Ok(Type::None),
                other => Type::primitive_named(other).ok_or_else(|| TypeError::UnknownTypeName {
                    name: other.to_string(),
                }),
            },
            TypeAnnotation::Function(params, ret) => {
                let args = params
                    .iter()
                    .map(|param| self.resolve_annotation(param))
                    .collect::<Result<Vec<_>, _>>()?;
                let ret = self.resolve_annotation(ret)?;
                Ok(Type::func(args, ret))
            }
            TypeAnnotation::Hole => Ok(self.fresh_type()),
        }
    }

    /// Type `lhs op rhs`.
    ///
    /// Operands must agree with each other and satisfy the operator's trait.
    /// Comparisons and logical operators yield `bool`; arithmetic keeps the
    /// operand type with any literal wrapper dropped. Constant operands fold.
    pub fn binary_op(
        &mut self,
        op: BinOp,
        lhs: &TypeInfo,
        rhs: &TypeInfo,
        origin: impl Into<NodeId>,
    ) -> TypeInfo {
        let origin = origin.into();

        let ty = match operator_trait(op) {
            None => {
                let left = self.expect(&Type::Bool, &lhs.ty, origin);
                let right = self.expect(&Type::Bool, &rhs.ty, origin);
                if left.is_error() || right.is_error() {
                    return TypeInfo::error();
                }
                Type::Bool
            }
            Some(trait_name) => {
                if let Err(err) = self.unify(&lhs.ty, &rhs.ty) {
                    self.report(Report::new(err, origin));
                    return TypeInfo::error();
                }
                if let Err(err) = self.require_trait(&lhs.ty, trait_name, origin) {
                    self.report(Report::new(err, origin));
                    return TypeInfo::error();
                }
                if op.is_comparison() {
                    Type::Bool
                } else {
                    self.apply(&lhs.ty).widened()
                }
            }
        };

        match (&lhs.value, &rhs.value) {
            (Some(a), Some(b)) => match fold(op, a, b) {
                Some(value) => {
                    tracing::trace!(%op, %value, "folded constant operands");
                    TypeInfo::constant(value)
                }
                None => TypeInfo::new(ty),
            },
            _ => TypeInfo::new(ty),
        }
    }

    /// Type a call of `callee` with arguments of the given types.
    ///
    /// Returns the callee's return type, or `<error>` when the callee cannot
    /// take these arguments.
    pub fn call(&mut self, callee: &Type, args: &[Type], origin: impl Into<NodeId>) -> Type {
        let ret = self.fresh_type();
        let site = Type::func(args.iter().map(Type::widened).collect(), ret.clone());
        match self.unify(callee, &site) {
            Ok(()) => self.apply(&ret),
            Err(err) => {
                self.report(Report::new(err, origin.into()));
                Type::Error
            }
        }
    }
}
