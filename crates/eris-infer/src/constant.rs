//! Literal typing and constant folding.

use eris_ast::{BinOp, Lit};
use eris_types::{ConstValue, Type, TypeInfo};

/// The type of a literal expression: `const <typ> = <value>`.
///
/// `Lit::Int` is the exit-code literal and types as `int`.
pub fn literal(lit: &Lit) -> TypeInfo {
    let value = match lit {
        Lit::Int(v) => ConstValue::Int(*v),
        Lit::Num(v) => ConstValue::Num(*v),
        Lit::Bool(v) => ConstValue::Bool(*v),
        Lit::Str(v) => ConstValue::Str(v.clone()),
        Lit::None => ConstValue::None,
    };
    TypeInfo::constant(value)
}

/// Drop every literal wrapper, including those inside function types.
pub fn widen(ty: &Type) -> Type {
    ty.widened()
}

/// Evaluate `lhs op rhs` at compile time.
///
/// Returns `None` when the operands do not fit the operator, and for
/// division by zero, which is left to run time.
pub fn fold(op: BinOp, lhs: &ConstValue, rhs: &ConstValue) -> Option<ConstValue> {
    use ConstValue as V;

    let value = match (op, lhs, rhs) {
        (BinOp::Add, V::Num(a), V::Num(b)) => V::Num(a + b),
        (BinOp::Add, V::Str(a), V::Str(b)) => V::Str(format!("{a}{b}")),
        (BinOp::Sub, V::Num(a), V::Num(b)) => V::Num(a - b),
        (BinOp::Mul, V::Num(a), V::Num(b)) => V::Num(a * b),
        (BinOp::Div, V::Num(_), V::Num(b)) if *b == 0.0 => return None,
        (BinOp::Div, V::Num(a), V::Num(b)) => V::Num(a / b),

        (BinOp::Lt, V::Num(a), V::Num(b)) => V::Bool(a < b),
        (BinOp::Gt, V::Num(a), V::Num(b)) => V::Bool(a > b),
        (BinOp::Le, V::Num(a), V::Num(b)) => V::Bool(a <= b),
        (BinOp::Ge, V::Num(a), V::Num(b)) => V::Bool(a >= b),
        (BinOp::Lt, V::Str(a), V::Str(b)) => V::Bool(a < b),
        (BinOp::Gt, V::Str(a), V::Str(b)) => V::Bool(a > b),
        (BinOp::Le, V::Str(a), V::Str(b)) => V::Bool(a <= b),
        (BinOp::Ge, V::Str(a), V::Str(b)) => V::Bool(a >= b),

        (BinOp::Eq | BinOp::Ne, a, b) => {
            let equal = values_equal(a, b)?;
            V::Bool(if op == BinOp::Eq { equal } else { !equal })
        }

        (BinOp::And, V::Bool(a), V::Bool(b)) => V::Bool(*a && *b),
        (BinOp::Or, V::Bool(a), V::Bool(b)) => V::Bool(*a || *b),

        _ => return None,
    };
    Some(value)
}

// Numeric equality here, unlike `ConstValue`'s bitwise `PartialEq`.
fn values_equal(lhs: &ConstValue, rhs: &ConstValue) -> Option<bool> {
    use ConstValue as V;

    match (lhs, rhs) {
        (V::Int(a), V::Int(b)) => Some(a == b),
        (V::Num(a), V::Num(b)) => Some(a == b),
        (V::Bool(a), V::Bool(b)) => Some(a == b),
        (V::Str(a), V::Str(b)) => Some(a == b),
        (V::None, V::None) => Some(true),
        _ => None,
    }
}
