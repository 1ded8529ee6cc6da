//! Expressions.

use std::cell::OnceCell;

use crate::arena::Handle;
use crate::constant::ConstantValue;
use crate::decl::{Constant, Function, GlobalVariable, Ident, Local, TypeExpr};
use crate::span::Span;
use crate::types::{Scalar, Type};

/// A literal as written in source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    AbstractInt(i64),
    AbstractFloat(f64),
    I32(i32),
    U32(u32),
    F32(f32),
    F16(f32),
}

impl Literal {
    pub fn scalar(self) -> Scalar {
        match self {
            Self::Bool(_) => Scalar::BOOL,
            Self::AbstractInt(_) => Scalar::ABSTRACT_INT,
            Self::AbstractFloat(_) => Scalar::ABSTRACT_FLOAT,
            Self::I32(_) => Scalar::I32,
            Self::U32(_) => Scalar::U32,
            Self::F32(_) => Scalar::F32,
            Self::F16(_) => Scalar::F16,
        }
    }

    pub fn value(self) -> ConstantValue {
        match self {
            Self::Bool(v) => ConstantValue::Bool(v),
            Self::AbstractInt(v) => ConstantValue::AbstractInt(v),
            Self::AbstractFloat(v) => ConstantValue::AbstractFloat(v),
            Self::I32(v) => ConstantValue::I32(v),
            Self::U32(v) => ConstantValue::U32(v),
            Self::F32(v) => ConstantValue::F32(v),
            Self::F16(v) => ConstantValue::F16(v),
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
    BitwiseNot,
    AddressOf,
    Deref,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::LogicalNot => "!",
            Self::BitwiseNot => "~",
            Self::AddressOf => "&",
            Self::Deref => "*",
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
            Self::BitwiseAnd => "&",
            Self::BitwiseOr => "|",
            Self::BitwiseXor => "^",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::Less
                | Self::LessEqual
                | Self::Greater
                | Self::GreaterEqual
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulo
        )
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, Self::BitwiseAnd | Self::BitwiseOr | Self::BitwiseXor)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, Self::ShiftLeft | Self::ShiftRight)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::LogicalAnd | Self::LogicalOr)
    }
}

macro_rules! builtin_functions {
    ($($variant:ident => $name:literal,)*) => {
        /// A builtin function callable from shader code.
        #[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
        pub enum BuiltinFunction {
            $($variant,)*
        }

        impl BuiltinFunction {
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

builtin_functions! {
    Abs => "abs",
    Min => "min",
    Max => "max",
    Clamp => "clamp",
    Floor => "floor",
    Ceil => "ceil",
    Round => "round",
    Fract => "fract",
    Trunc => "trunc",
    Sqrt => "sqrt",
    InverseSqrt => "inverseSqrt",
    Exp => "exp",
    Exp2 => "exp2",
    Log => "log",
    Log2 => "log2",
    Pow => "pow",
    Sin => "sin",
    Cos => "cos",
    Tan => "tan",
    Step => "step",
    Mix => "mix",
    Smoothstep => "smoothstep",
    Fma => "fma",
    Dot => "dot",
    Cross => "cross",
    Length => "length",
    Distance => "distance",
    Normalize => "normalize",
    Select => "select",
    All => "all",
    Any => "any",
    ArrayLength => "arrayLength",
    WorkgroupBarrier => "workgroupBarrier",
    StorageBarrier => "storageBarrier",
    AtomicLoad => "atomicLoad",
    AtomicStore => "atomicStore",
    AtomicAdd => "atomicAdd",
    AtomicSub => "atomicSub",
    AtomicMax => "atomicMax",
    AtomicMin => "atomicMin",
    AtomicAnd => "atomicAnd",
    AtomicOr => "atomicOr",
    AtomicXor => "atomicXor",
    AtomicExchange => "atomicExchange",
    TextureSample => "textureSample",
    TextureLoad => "textureLoad",
    TextureDimensions => "textureDimensions",
}

impl BuiltinFunction {
    /// Builtins whose result may not be discarded by a call statement.
    pub fn must_use(self) -> bool {
        !matches!(
            self,
            Self::WorkgroupBarrier
                | Self::StorageBarrier
                | Self::AtomicStore
                | Self::AtomicAdd
                | Self::AtomicSub
                | Self::AtomicMax
                | Self::AtomicMin
                | Self::AtomicAnd
                | Self::AtomicOr
                | Self::AtomicXor
                | Self::AtomicExchange
        )
    }
}

/// What an identifier expression names, filled in by the type checker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolved {
    Local(Handle<Local>),
    Global(Handle<GlobalVariable>),
    Constant(Handle<Constant>),
}

/// The callee as written.
#[derive(Clone, Debug)]
pub enum CallTarget {
    /// A plain name: a function, builtin, struct, alias, or a predeclared or
    /// inferred type constructor such as `f32` or `vec3`.
    Named(Ident),
    /// A templated type such as `vec3<f32>` or `array<u32, 4>`.
    Type(TypeExpr),
}

/// The callee after resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Callee {
    Function(Handle<Function>),
    Builtin(BuiltinFunction),
    Constructor(Handle<Type>),
}

/// A resolved `.member` access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemberAccess {
    /// Index of the struct member.
    Field(u32),
    /// Vector components, each in `0..4`.
    Swizzle(Vec<u8>),
}

/// The bound an index is clamped against by a [`ExpressionKind::BoundsCheck`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundsLimit {
    /// Valid indices are `0..n`.
    Static(u32),
    /// The runtime-sized array named by `array`.
    RuntimeArray { array: Handle<Expression> },
}

#[derive(Clone, Debug)]
pub enum ExpressionKind {
    Literal(Literal),
    Identifier {
        name: Ident,
        resolved: Option<Resolved>,
    },
    Unary {
        op: UnaryOp,
        operand: Handle<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Handle<Expression>,
        right: Handle<Expression>,
    },
    Call {
        target: CallTarget,
        arguments: Vec<Handle<Expression>>,
        callee: Option<Callee>,
    },
    Index {
        base: Handle<Expression>,
        index: Handle<Expression>,
    },
    Member {
        base: Handle<Expression>,
        member: Ident,
        access: Option<MemberAccess>,
    },
    /// Inserted by the bounds-check pass around a dynamic index.
    BoundsCheck {
        index: Handle<Expression>,
        limit: BoundsLimit,
    },
}

impl ExpressionKind {
    /// Direct sub-expressions, in evaluation order.
    pub fn children(&self) -> Vec<Handle<Expression>> {
        match *self {
            Self::Literal(_) | Self::Identifier { .. } => Vec::new(),
            Self::Unary { operand, .. } => vec![operand],
            Self::Binary { left, right, .. } => vec![left, right],
            Self::Call { ref arguments, .. } => arguments.clone(),
            Self::Index { base, index } => vec![base, index],
            Self::Member { base, .. } => vec![base],
            Self::BoundsCheck { index, limit } => match limit {
                BoundsLimit::Static(_) => vec![index],
                BoundsLimit::RuntimeArray { array } => vec![index, array],
            },
        }
    }
}

/// An expression node.
#[derive(Clone, Debug)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
    /// Set by the type checker.
    pub ty: Option<Handle<Type>>,
    constant: OnceCell<ConstantValue>,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: None,
            constant: OnceCell::new(),
        }
    }

    pub fn constant_value(&self) -> Option<&ConstantValue> {
        self.constant.get()
    }

    pub fn is_constant(&self) -> bool {
        self.constant.get().is_some()
    }

    /// Caches `value` on a node that has none yet; returns the cached value.
    ///
    /// Panics if a different value is already cached.
    pub fn cache_constant(&self, value: ConstantValue) -> &ConstantValue {
        if let Some(existing) = self.constant.get() {
            assert_eq!(
                *existing, value,
                "expression at {:?} already caches a different constant",
                self.span
            );
            return existing;
        }
        self.constant.get_or_init(|| value)
    }

    /// Overwrites the cached value. Used while the type checker converts an
    /// abstract constant to its materialized type.
    pub fn replace_constant(&mut self, value: ConstantValue) {
        self.constant = OnceCell::from(value);
    }

    pub fn clear_constant(&mut self) {
        self.constant = OnceCell::new();
    }
}
