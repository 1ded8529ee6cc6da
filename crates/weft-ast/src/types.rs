//! Resolved shader types.
//!
//! The type checker resolves every written [`TypeExpr`](crate::TypeExpr) into
//! a [`Type`] stored in the module's deduplicating type arena.

use crate::arena::Handle;
use crate::decl::Struct;

/// The kind of a scalar type.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum ScalarKind {
    /// Boolean.
    Bool,
    /// Integer literal type before concretization.
    AbstractInt,
    /// Float literal type before concretization.
    AbstractFloat,
    /// Signed integer.
    Sint,
    /// Unsigned integer.
    Uint,
    /// Floating point.
    Float,
}

/// A scalar type: kind + byte width.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Scalar {
    pub kind: ScalarKind,
    pub width: u8,
}

impl Scalar {
    pub const BOOL: Self = Self {
        kind: ScalarKind::Bool,
        width: 1,
    };
    pub const ABSTRACT_INT: Self = Self {
        kind: ScalarKind::AbstractInt,
        width: 8,
    };
    pub const ABSTRACT_FLOAT: Self = Self {
        kind: ScalarKind::AbstractFloat,
        width: 8,
    };
    pub const I32: Self = Self {
        kind: ScalarKind::Sint,
        width: 4,
    };
    pub const U32: Self = Self {
        kind: ScalarKind::Uint,
        width: 4,
    };
    pub const F32: Self = Self {
        kind: ScalarKind::Float,
        width: 4,
    };
    pub const F16: Self = Self {
        kind: ScalarKind::Float,
        width: 2,
    };

    pub fn is_abstract(self) -> bool {
        matches!(self.kind, ScalarKind::AbstractInt | ScalarKind::AbstractFloat)
    }

    pub fn is_float(self) -> bool {
        matches!(self.kind, ScalarKind::Float | ScalarKind::AbstractFloat)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self.kind,
            ScalarKind::Sint | ScalarKind::Uint | ScalarKind::AbstractInt
        )
    }

    pub fn is_signed(self) -> bool {
        !matches!(self.kind, ScalarKind::Bool | ScalarKind::Uint)
    }

    pub fn is_numeric(self) -> bool {
        self.kind != ScalarKind::Bool
    }

    /// The concrete type an abstract scalar materializes as.
    pub fn concretize(self) -> Self {
        match self.kind {
            ScalarKind::AbstractInt => Self::I32,
            ScalarKind::AbstractFloat => Self::F32,
            _ => self,
        }
    }

    /// Whether a value of this type converts to `target` without an explicit
    /// conversion.
    pub fn automatically_converts_to(self, target: Self) -> bool {
        if self == target {
            return true;
        }
        match self.kind {
            ScalarKind::AbstractInt => target.is_numeric(),
            ScalarKind::AbstractFloat => target.is_float(),
            _ => false,
        }
    }

    /// WGSL spelling, with abstract types named the way diagnostics show them.
    pub fn name(self) -> &'static str {
        match (self.kind, self.width) {
            (ScalarKind::Bool, _) => "bool",
            (ScalarKind::AbstractInt, _) => "abstract-int",
            (ScalarKind::AbstractFloat, _) => "abstract-float",
            (ScalarKind::Sint, _) => "i32",
            (ScalarKind::Uint, _) => "u32",
            (ScalarKind::Float, 2) => "f16",
            (ScalarKind::Float, _) => "f32",
        }
    }
}

/// Number of components in a vector, or of columns/rows in a matrix.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum VectorSize {
    Bi = 2,
    Tri = 3,
    Quad = 4,
}

impl VectorSize {
    pub fn from_u32(n: u32) -> Option<Self> {
        match n {
            2 => Some(Self::Bi),
            3 => Some(Self::Tri),
            4 => Some(Self::Quad),
            _ => None,
        }
    }

    pub fn count(self) -> u32 {
        self as u32
    }
}

/// Element count of an array type.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ArraySize {
    Constant(u32),
    /// Sized by the bound buffer; only valid as the last member of a storage
    /// struct or as a storage variable's type.
    Runtime,
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum AddressSpace {
    Function,
    Private,
    Workgroup,
    Uniform,
    Storage,
    /// Samplers and textures.
    Handle,
}

impl AddressSpace {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "function" => Self::Function,
            "private" => Self::Private,
            "workgroup" => Self::Workgroup,
            "uniform" => Self::Uniform,
            "storage" => Self::Storage,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Private => "private",
            Self::Workgroup => "workgroup",
            Self::Uniform => "uniform",
            Self::Storage => "storage",
            Self::Handle => "handle",
        }
    }

    pub fn default_access(self) -> AccessMode {
        match self {
            Self::Function | Self::Private | Self::Workgroup => AccessMode::ReadWrite,
            Self::Uniform | Self::Storage | Self::Handle => AccessMode::Read,
        }
    }

    /// Whether the pointer type spells its access mode explicitly.
    pub fn has_access_mode(self) -> bool {
        self == Self::Storage
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "read" => Self::Read,
            "write" => Self::Write,
            "read_write" => Self::ReadWrite,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadWrite => "read_write",
        }
    }

    pub fn can_read(self) -> bool {
        self != Self::Write
    }

    pub fn can_write(self) -> bool {
        self != Self::Read
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum TextureDimension {
    D1,
    D2,
    D2Array,
    D3,
    Cube,
}

impl TextureDimension {
    pub fn from_type_name(name: &str) -> Option<Self> {
        Some(match name {
            "texture_1d" => Self::D1,
            "texture_2d" => Self::D2,
            "texture_2d_array" => Self::D2Array,
            "texture_3d" => Self::D3,
            "texture_cube" => Self::Cube,
            _ => return None,
        })
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::D1 => "texture_1d",
            Self::D2 => "texture_2d",
            Self::D2Array => "texture_2d_array",
            Self::D3 => "texture_3d",
            Self::Cube => "texture_cube",
        }
    }

    /// Number of coordinates `textureLoad`/`textureSample` take, without the
    /// array layer.
    pub fn coordinates(self) -> u32 {
        match self {
            Self::D1 => 1,
            Self::D2 | Self::D2Array => 2,
            Self::D3 | Self::Cube => 3,
        }
    }

    pub fn is_arrayed(self) -> bool {
        self == Self::D2Array
    }
}

/// A fully resolved type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum Type {
    Scalar(Scalar),
    Vector {
        size: VectorSize,
        scalar: Scalar,
    },
    Matrix {
        columns: VectorSize,
        rows: VectorSize,
        scalar: Scalar,
    },
    Atomic(Scalar),
    Array {
        base: Handle<Type>,
        size: ArraySize,
    },
    Struct(Handle<Struct>),
    /// A first-class pointer value (`ptr<space, T, access>`).
    Pointer {
        space: AddressSpace,
        base: Handle<Type>,
        access: AccessMode,
    },
    /// The type of an expression that names memory, such as a `var`.
    /// Never spelled in source.
    Reference {
        space: AddressSpace,
        base: Handle<Type>,
        access: AccessMode,
    },
    Sampler {
        comparison: bool,
    },
    Texture {
        dimension: TextureDimension,
        sample: Scalar,
    },
}

impl Type {
    /// The scalar at the leaves of scalars, vectors and matrices.
    pub fn scalar(&self) -> Option<Scalar> {
        match *self {
            Type::Scalar(s) => Some(s),
            Type::Vector { scalar, .. } | Type::Matrix { scalar, .. } => Some(scalar),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Scalar(_))
    }

    pub fn is_handle(&self) -> bool {
        matches!(self, Type::Sampler { .. } | Type::Texture { .. })
    }

    pub fn is_memory_view(&self) -> bool {
        matches!(self, Type::Pointer { .. } | Type::Reference { .. })
    }
}
