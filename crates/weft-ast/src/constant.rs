//! Constant values and the arithmetic used by constant evaluation.

use std::collections::HashMap;
use std::fmt;

use crate::expr::{BinaryOp, UnaryOp};
use crate::types::{Scalar, ScalarKind};

/// Values supplied for (or computed for) named constants and overrides.
pub type ConstantMap = HashMap<String, ConstantValue>;

/// A compile-time value.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantValue {
    Bool(bool),
    AbstractInt(i64),
    AbstractFloat(f64),
    I32(i32),
    U32(u32),
    F32(f32),
    /// Stored widened; always representable as an `f16`.
    F16(f32),
    Vector(Vec<ConstantValue>),
    Array(Vec<ConstantValue>),
}

/// Why a constant operation has no value.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConstError {
    #[error("integer overflow in constant expression")]
    Overflow,
    #[error("division by zero in constant expression")]
    DivisionByZero,
    #[error("constant expression evaluates to a non-finite value")]
    NotFinite,
    #[error("value {value} does not fit in {ty}")]
    OutOfRange { value: String, ty: &'static str },
    #[error("shift by {0} is out of range")]
    ShiftOutOfRange(u32),
    #[error("operator cannot be evaluated on these operands")]
    Unsupported,
}

const F16_MAX: f64 = 65504.0;

impl ConstantValue {
    /// The scalar type of the value, or of its leaves for composites.
    pub fn scalar(&self) -> Option<Scalar> {
        Some(match self {
            Self::Bool(_) => Scalar::BOOL,
            Self::AbstractInt(_) => Scalar::ABSTRACT_INT,
            Self::AbstractFloat(_) => Scalar::ABSTRACT_FLOAT,
            Self::I32(_) => Scalar::I32,
            Self::U32(_) => Scalar::U32,
            Self::F32(_) => Scalar::F32,
            Self::F16(_) => Scalar::F16,
            Self::Vector(c) | Self::Array(c) => return c.first()?.scalar(),
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Integer scalars as `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::AbstractInt(v) => Some(v),
            Self::I32(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Numeric scalars as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::AbstractFloat(v) => Some(v),
            Self::F32(v) | Self::F16(v) => Some(v.into()),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// Non-negative integer scalars as `u32`.
    pub fn as_u32(&self) -> Option<u32> {
        self.as_i64().and_then(|v| u32::try_from(v).ok())
    }

    pub fn components(&self) -> Option<&[ConstantValue]> {
        match self {
            Self::Vector(c) | Self::Array(c) => Some(c),
            _ => None,
        }
    }

    fn map_leaves(
        &self,
        f: &mut impl FnMut(&ConstantValue) -> Result<ConstantValue, ConstError>,
    ) -> Result<ConstantValue, ConstError> {
        match self {
            Self::Vector(c) => Ok(Self::Vector(
                c.iter().map(|v| v.map_leaves(f)).collect::<Result<_, _>>()?,
            )),
            Self::Array(c) => Ok(Self::Array(
                c.iter().map(|v| v.map_leaves(f)).collect::<Result<_, _>>()?,
            )),
            scalar => f(scalar),
        }
    }

    /// Converts every leaf to `target`, with WGSL value-conversion rules.
    pub fn convert(&self, target: Scalar) -> Result<ConstantValue, ConstError> {
        self.map_leaves(&mut |leaf| leaf.convert_scalar(target))
    }

    fn convert_scalar(&self, target: Scalar) -> Result<ConstantValue, ConstError> {
        if self.scalar() == Some(target) {
            return Ok(self.clone());
        }
        let out_of_range = |value: String| ConstError::OutOfRange {
            value,
            ty: target.name(),
        };
        if let Self::Bool(b) = *self {
            return Ok(match target.kind {
                ScalarKind::Bool => Self::Bool(b),
                ScalarKind::AbstractInt => Self::AbstractInt(b.into()),
                ScalarKind::AbstractFloat => Self::AbstractFloat(f64::from(u8::from(b))),
                ScalarKind::Sint => Self::I32(b.into()),
                ScalarKind::Uint => Self::U32(b.into()),
                ScalarKind::Float if target.width == 2 => Self::F16(f32::from(u8::from(b))),
                ScalarKind::Float => Self::F32(f32::from(u8::from(b))),
            });
        }
        if target.kind == ScalarKind::Bool {
            let value = self.as_f64().ok_or(ConstError::Unsupported)?;
            return Ok(Self::Bool(value != 0.0));
        }

        if let Some(int) = self.as_i64() {
            let from_concrete = matches!(self, Self::I32(_) | Self::U32(_));
            return Ok(match target.kind {
                ScalarKind::AbstractInt => Self::AbstractInt(int),
                ScalarKind::AbstractFloat => Self::AbstractFloat(int as f64),
                // i32 <-> u32 conversions reinterpret the bits.
                ScalarKind::Sint if from_concrete => Self::I32(int as u32 as i32),
                ScalarKind::Uint if from_concrete => Self::U32(int as i32 as u32),
                ScalarKind::Sint => {
                    Self::I32(i32::try_from(int).map_err(|_| out_of_range(int.to_string()))?)
                }
                ScalarKind::Uint => {
                    Self::U32(u32::try_from(int).map_err(|_| out_of_range(int.to_string()))?)
                }
                ScalarKind::Float => float_leaf(int as f64, target)?,
                ScalarKind::Bool => unreachable!("bool targets are handled above"),
            });
        }

        let value = self.as_f64().ok_or(ConstError::Unsupported)?;
        Ok(match target.kind {
            ScalarKind::AbstractFloat => Self::AbstractFloat(value),
            ScalarKind::Float => float_leaf(value, target)?,
            ScalarKind::Sint => {
                let t = value.trunc();
                if !(f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&t) {
                    return Err(out_of_range(value.to_string()));
                }
                Self::I32(t as i32)
            }
            ScalarKind::Uint => {
                let t = value.trunc();
                if !(0.0..=f64::from(u32::MAX)).contains(&t) {
                    return Err(out_of_range(value.to_string()));
                }
                Self::U32(t as u32)
            }
            ScalarKind::AbstractInt => {
                let t = value.trunc();
                if !(i64::MIN as f64..=i64::MAX as f64).contains(&t) {
                    return Err(out_of_range(value.to_string()));
                }
                Self::AbstractInt(t as i64)
            }
            ScalarKind::Bool => unreachable!("bool targets are handled above"),
        })
    }

    /// Component `index` of a vector or array.
    pub fn index(&self, index: usize) -> Option<&ConstantValue> {
        self.components()?.get(index)
    }

    /// Evaluates a unary operator. Address-of and dereference have no
    /// constant value.
    pub fn unary(&self, op: UnaryOp) -> Result<ConstantValue, ConstError> {
        self.map_leaves(&mut |leaf| match (op, leaf) {
            (UnaryOp::Negate, Self::AbstractInt(v)) => {
                v.checked_neg().map(Self::AbstractInt).ok_or(ConstError::Overflow)
            }
            (UnaryOp::Negate, Self::I32(v)) => {
                v.checked_neg().map(Self::I32).ok_or(ConstError::Overflow)
            }
            (UnaryOp::Negate, Self::AbstractFloat(v)) => Ok(Self::AbstractFloat(-v)),
            (UnaryOp::Negate, Self::F32(v)) => Ok(Self::F32(-v)),
            (UnaryOp::Negate, Self::F16(v)) => Ok(Self::F16(-v)),
            (UnaryOp::LogicalNot, Self::Bool(b)) => Ok(Self::Bool(!b)),
            (UnaryOp::BitwiseNot, Self::AbstractInt(v)) => Ok(Self::AbstractInt(!v)),
            (UnaryOp::BitwiseNot, Self::I32(v)) => Ok(Self::I32(!v)),
            (UnaryOp::BitwiseNot, Self::U32(v)) => Ok(Self::U32(!v)),
            _ => Err(ConstError::Unsupported),
        })
    }

    /// Evaluates a binary operator. Operands must already share a scalar
    /// type; a scalar operand against a vector is splatted.
    pub fn binary(
        op: BinaryOp,
        left: &ConstantValue,
        right: &ConstantValue,
    ) -> Result<ConstantValue, ConstError> {
        match (left, right) {
            (Self::Vector(l), Self::Vector(r)) => {
                if l.len() != r.len() {
                    return Err(ConstError::Unsupported);
                }
                let components = l
                    .iter()
                    .zip(r)
                    .map(|(a, b)| Self::binary(op, a, b))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::Vector(components))
            }
            (Self::Vector(l), scalar) => Ok(Self::Vector(
                l.iter()
                    .map(|a| Self::binary(op, a, scalar))
                    .collect::<Result<_, _>>()?,
            )),
            (scalar, Self::Vector(r)) => Ok(Self::Vector(
                r.iter()
                    .map(|b| Self::binary(op, scalar, b))
                    .collect::<Result<_, _>>()?,
            )),
            (Self::Array(_), _) | (_, Self::Array(_)) => Err(ConstError::Unsupported),
            (l, r) => scalar_binary(op, l, r),
        }
    }

    /// `abs`, `min`, `max` and `clamp` over scalars and vectors.
    pub fn builtin(name: &str, args: &[ConstantValue]) -> Result<ConstantValue, ConstError> {
        match (name, args) {
            ("abs", [x]) => x.map_leaves(&mut |leaf| match *leaf {
                Self::AbstractInt(v) => v.checked_abs().map(Self::AbstractInt).ok_or(ConstError::Overflow),
                // abs(i32::MIN) wraps in WGSL.
                Self::I32(v) => Ok(Self::I32(v.wrapping_abs())),
                Self::U32(v) => Ok(Self::U32(v)),
                Self::AbstractFloat(v) => Ok(Self::AbstractFloat(v.abs())),
                Self::F32(v) => Ok(Self::F32(v.abs())),
                Self::F16(v) => Ok(Self::F16(v.abs())),
                _ => Err(ConstError::Unsupported),
            }),
            ("min", [a, b]) => pick(a, b, |l, r| r < l),
            ("max", [a, b]) => pick(a, b, |l, r| r > l),
            ("clamp", [x, lo, hi]) => {
                let lower = pick(x, lo, |l, r| r > l)?;
                pick(&lower, hi, |l, r| r < l)
            }
            _ => Err(ConstError::Unsupported),
        }
    }
}

fn float_leaf(value: f64, target: Scalar) -> Result<ConstantValue, ConstError> {
    if !value.is_finite() {
        return Err(ConstError::NotFinite);
    }
    match (target.kind, target.width) {
        (ScalarKind::AbstractFloat, _) => Ok(ConstantValue::AbstractFloat(value)),
        (ScalarKind::Float, 2) => {
            if value.abs() > F16_MAX {
                return Err(ConstError::OutOfRange {
                    value: value.to_string(),
                    ty: "f16",
                });
            }
            Ok(ConstantValue::F16(value as f32))
        }
        (ScalarKind::Float, _) => {
            let narrowed = value as f32;
            if !narrowed.is_finite() {
                return Err(ConstError::OutOfRange {
                    value: value.to_string(),
                    ty: "f32",
                });
            }
            Ok(ConstantValue::F32(narrowed))
        }
        _ => Err(ConstError::Unsupported),
    }
}

/// Selects `b` over `a` component-wise when `prefer(a, b)` holds.
fn pick(
    a: &ConstantValue,
    b: &ConstantValue,
    prefer: fn(f64, f64) -> bool,
) -> Result<ConstantValue, ConstError> {
    match (a, b) {
        (ConstantValue::Vector(l), ConstantValue::Vector(r)) if l.len() == r.len() => Ok(
            ConstantValue::Vector(
                l.iter()
                    .zip(r)
                    .map(|(x, y)| pick(x, y, prefer))
                    .collect::<Result<_, _>>()?,
            ),
        ),
        (l, r) if l.scalar() == r.scalar() => {
            let (x, y) = (
                l.as_f64().ok_or(ConstError::Unsupported)?,
                r.as_f64().ok_or(ConstError::Unsupported)?,
            );
            Ok(if prefer(x, y) { r.clone() } else { l.clone() })
        }
        _ => Err(ConstError::Unsupported),
    }
}

fn scalar_binary(
    op: BinaryOp,
    left: &ConstantValue,
    right: &ConstantValue,
) -> Result<ConstantValue, ConstError> {
    use ConstantValue as V;

    if let (V::Bool(a), V::Bool(b)) = (left, right) {
        let (a, b) = (*a, *b);
        return Ok(V::Bool(match op {
            BinaryOp::Equal => a == b,
            BinaryOp::NotEqual => a != b,
            BinaryOp::LogicalAnd | BinaryOp::BitwiseAnd => a && b,
            BinaryOp::LogicalOr | BinaryOp::BitwiseOr => a || b,
            BinaryOp::BitwiseXor => a ^ b,
            _ => return Err(ConstError::Unsupported),
        }));
    }

    if op.is_comparison() {
        let ordering = match (left, right) {
            (V::AbstractInt(_) | V::I32(_) | V::U32(_), _) => {
                let (a, b) = (left.as_i64(), right.as_i64());
                a.zip(b).map(|(a, b)| a.partial_cmp(&b))
            }
            _ => {
                let (a, b) = (left.as_f64(), right.as_f64());
                a.zip(b).map(|(a, b)| a.partial_cmp(&b))
            }
        }
        .ok_or(ConstError::Unsupported)?;
        use std::cmp::Ordering::*;
        return Ok(V::Bool(match op {
            BinaryOp::Equal => ordering == Some(Equal),
            BinaryOp::NotEqual => ordering != Some(Equal),
            BinaryOp::Less => ordering == Some(Less),
            BinaryOp::LessEqual => matches!(ordering, Some(Less | Equal)),
            BinaryOp::Greater => ordering == Some(Greater),
            BinaryOp::GreaterEqual => matches!(ordering, Some(Greater | Equal)),
            _ => unreachable!("is_comparison covers exactly these operators"),
        }));
    }

    match (left, right) {
        (V::AbstractInt(a), V::AbstractInt(b)) => int_op(op, *a, *b, 64).map(V::AbstractInt),
        (V::I32(a), V::I32(b)) => {
            int_op(op, i64::from(*a), i64::from(*b), 32).and_then(|v| {
                i32::try_from(v).map(V::I32).map_err(|_| ConstError::Overflow)
            })
        }
        (V::U32(a), V::U32(b)) => uint_op(op, *a, *b).map(V::U32),
        // Shift amounts are always u32.
        (V::AbstractInt(a), V::U32(b)) if op.is_shift() => {
            int_op(op, *a, i64::from(*b), 64).map(V::AbstractInt)
        }
        (V::I32(a), V::U32(b)) if op.is_shift() => {
            int_op(op, i64::from(*a), i64::from(*b), 32).and_then(|v| {
                i32::try_from(v).map(V::I32).map_err(|_| ConstError::Overflow)
            })
        }
        (V::AbstractFloat(a), V::AbstractFloat(b)) => {
            float_op(op, *a, *b).map(V::AbstractFloat)
        }
        (V::F32(a), V::F32(b)) => {
            let v = float_op(op, f64::from(*a), f64::from(*b))?;
            float_leaf(v, Scalar::F32)
        }
        (V::F16(a), V::F16(b)) => {
            let v = float_op(op, f64::from(*a), f64::from(*b))?;
            float_leaf(v, Scalar::F16)
        }
        _ => Err(ConstError::Unsupported),
    }
}

fn int_op(op: BinaryOp, a: i64, b: i64, bits: u32) -> Result<i64, ConstError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide | BinaryOp::Modulo if b == 0 => return Err(ConstError::DivisionByZero),
        BinaryOp::Divide => a.checked_div(b),
        BinaryOp::Modulo => a.checked_rem(b),
        BinaryOp::BitwiseAnd => Some(a & b),
        BinaryOp::BitwiseOr => Some(a | b),
        BinaryOp::BitwiseXor => Some(a ^ b),
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight => {
            let amount = u32::try_from(b).map_err(|_| ConstError::Unsupported)?;
            if amount >= bits {
                return Err(ConstError::ShiftOutOfRange(amount));
            }
            if op == BinaryOp::ShiftLeft {
                a.checked_mul(1i64 << amount)
            } else {
                Some(a >> amount)
            }
        }
        _ => return Err(ConstError::Unsupported),
    };
    result.ok_or(ConstError::Overflow)
}

fn uint_op(op: BinaryOp, a: u32, b: u32) -> Result<u32, ConstError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide | BinaryOp::Modulo if b == 0 => return Err(ConstError::DivisionByZero),
        BinaryOp::Divide => Some(a / b),
        BinaryOp::Modulo => Some(a % b),
        BinaryOp::BitwiseAnd => Some(a & b),
        BinaryOp::BitwiseOr => Some(a | b),
        BinaryOp::BitwiseXor => Some(a ^ b),
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight if b >= 32 => {
            return Err(ConstError::ShiftOutOfRange(b));
        }
        BinaryOp::ShiftLeft => a.checked_shl(b).filter(|v| v >> b == a),
        BinaryOp::ShiftRight => Some(a >> b),
        _ => return Err(ConstError::Unsupported),
    };
    result.ok_or(ConstError::Overflow)
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> Result<f64, ConstError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => a / b,
        BinaryOp::Modulo => a % b,
        _ => return Err(ConstError::Unsupported),
    };
    if result.is_finite() {
        Ok(result)
    } else {
        Err(ConstError::NotFinite)
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::AbstractInt(v) => write!(f, "{v}"),
            Self::AbstractFloat(v) => write!(f, "{v:?}"),
            Self::I32(v) => write!(f, "{v}i"),
            Self::U32(v) => write!(f, "{v}u"),
            Self::F32(v) => write!(f, "{v:?}f"),
            Self::F16(v) => write!(f, "{v:?}h"),
            Self::Vector(c) | Self::Array(c) => {
                f.write_str(if matches!(self, Self::Vector(_)) { "vec(" } else { "array(" })?;
                for (i, v) in c.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConstantValue as V;

    #[test]
    fn abstract_int_converts_with_range_checks() {
        assert_eq!(V::AbstractInt(8).convert(Scalar::U32), Ok(V::U32(8)));
        assert_eq!(V::AbstractInt(1).convert(Scalar::F32), Ok(V::F32(1.0)));
        assert!(matches!(
            V::AbstractInt(-1).convert(Scalar::U32),
            Err(ConstError::OutOfRange { ty: "u32", .. })
        ));
        assert!(V::AbstractInt(1 << 40).convert(Scalar::I32).is_err());
    }

    #[test]
    fn float_to_int_truncates() {
        assert_eq!(V::F32(2.75).convert(Scalar::I32), Ok(V::I32(2)));
        assert_eq!(V::AbstractFloat(-1.5).convert(Scalar::I32), Ok(V::I32(-1)));
        assert!(V::F32(-1.0).convert(Scalar::U32).is_err());
    }

    #[test]
    fn signedness_casts_reinterpret_bits() {
        assert_eq!(V::I32(-1).convert(Scalar::U32), Ok(V::U32(u32::MAX)));
        assert_eq!(V::U32(u32::MAX).convert(Scalar::I32), Ok(V::I32(-1)));
    }

    #[test]
    fn f16_range() {
        assert_eq!(V::AbstractFloat(1.5).convert(Scalar::F16), Ok(V::F16(1.5)));
        assert!(V::AbstractFloat(70000.0).convert(Scalar::F16).is_err());
    }

    #[test]
    fn vectors_convert_per_component() {
        let v = V::Vector(vec![V::AbstractInt(1), V::AbstractInt(2)]);
        assert_eq!(
            v.convert(Scalar::F32),
            Ok(V::Vector(vec![V::F32(1.0), V::F32(2.0)]))
        );
    }

    #[test]
    fn integer_arithmetic_checks_overflow() {
        assert_eq!(
            V::binary(BinaryOp::Multiply, &V::U32(4), &V::U32(2)),
            Ok(V::U32(8))
        );
        assert_eq!(
            V::binary(BinaryOp::Add, &V::I32(i32::MAX), &V::I32(1)),
            Err(ConstError::Overflow)
        );
        assert_eq!(
            V::binary(BinaryOp::Subtract, &V::U32(0), &V::U32(1)),
            Err(ConstError::Overflow)
        );
        assert_eq!(
            V::binary(BinaryOp::Divide, &V::AbstractInt(1), &V::AbstractInt(0)),
            Err(ConstError::DivisionByZero)
        );
    }

    #[test]
    fn shifts() {
        assert_eq!(
            V::binary(BinaryOp::ShiftLeft, &V::I32(1), &V::U32(4)),
            Ok(V::I32(16))
        );
        assert_eq!(
            V::binary(BinaryOp::ShiftRight, &V::U32(16), &V::U32(32)),
            Err(ConstError::ShiftOutOfRange(32))
        );
    }

    #[test]
    fn comparisons_produce_bools() {
        assert_eq!(
            V::binary(BinaryOp::Less, &V::AbstractInt(1), &V::AbstractInt(2)),
            Ok(V::Bool(true))
        );
        assert_eq!(
            V::binary(BinaryOp::Equal, &V::F32(1.0), &V::F32(2.0)),
            Ok(V::Bool(false))
        );
        assert_eq!(
            V::binary(BinaryOp::LogicalAnd, &V::Bool(true), &V::Bool(false)),
            Ok(V::Bool(false))
        );
    }

    #[test]
    fn vector_scalar_splat() {
        let v = V::Vector(vec![V::F32(1.0), V::F32(2.0)]);
        assert_eq!(
            V::binary(BinaryOp::Multiply, &v, &V::F32(2.0)),
            Ok(V::Vector(vec![V::F32(2.0), V::F32(4.0)]))
        );
    }

    #[test]
    fn float_overflow_is_not_finite() {
        assert_eq!(
            V::binary(BinaryOp::Multiply, &V::F32(f32::MAX), &V::F32(2.0)),
            Err(ConstError::OutOfRange {
                value: (f64::from(f32::MAX) * 2.0).to_string(),
                ty: "f32"
            })
        );
        assert_eq!(
            V::binary(BinaryOp::Divide, &V::AbstractFloat(1.0), &V::AbstractFloat(0.0)),
            Err(ConstError::NotFinite)
        );
    }

    #[test]
    fn unary_ops() {
        assert_eq!(V::I32(3).unary(UnaryOp::Negate), Ok(V::I32(-3)));
        assert_eq!(V::I32(i32::MIN).unary(UnaryOp::Negate), Err(ConstError::Overflow));
        assert_eq!(V::Bool(true).unary(UnaryOp::LogicalNot), Ok(V::Bool(false)));
        assert_eq!(V::U32(0).unary(UnaryOp::BitwiseNot), Ok(V::U32(u32::MAX)));
        assert_eq!(V::U32(1).unary(UnaryOp::Negate), Err(ConstError::Unsupported));
    }

    #[test]
    fn builtins() {
        assert_eq!(V::builtin("abs", &[V::I32(-4)]), Ok(V::I32(4)));
        assert_eq!(V::builtin("min", &[V::U32(3), V::U32(1)]), Ok(V::U32(1)));
        assert_eq!(
            V::builtin("clamp", &[V::F32(5.0), V::F32(0.0), V::F32(1.0)]),
            Ok(V::F32(1.0))
        );
        assert_eq!(V::builtin("sqrt", &[V::F32(4.0)]), Err(ConstError::Unsupported));
    }

    #[test]
    fn display_uses_suffixes() {
        assert_eq!(V::U32(8).to_string(), "8u");
        assert_eq!(V::F32(1.0).to_string(), "1.0f");
        assert_eq!(V::AbstractInt(-2).to_string(), "-2");
        assert_eq!(
            V::Vector(vec![V::I32(1), V::I32(2)]).to_string(),
            "vec(1i, 2i)"
        );
    }
}
