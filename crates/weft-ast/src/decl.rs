//! Declarations, attributes and written types.

use crate::arena::Handle;
use crate::expr::Expression;
use crate::span::Span;
use crate::stmt::Block;
use crate::types::{AccessMode, AddressSpace, TextureDimension, Type, VectorSize};

/// A name together with where it was written.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// A name for a node created by a pass.
    pub fn synthesized(name: impl Into<String>) -> Self {
        Self::new(name, Span::UNDEFINED)
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
        }
    }
}

macro_rules! builtin_values {
    ($($variant:ident => $name:literal,)*) => {
        /// Values passed through `@builtin(..)`.
        #[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
        pub enum BuiltinValue {
            $($variant,)*
        }

        impl BuiltinValue {
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

builtin_values! {
    Position => "position",
    VertexIndex => "vertex_index",
    InstanceIndex => "instance_index",
    FrontFacing => "front_facing",
    FragDepth => "frag_depth",
    SampleIndex => "sample_index",
    SampleMask => "sample_mask",
    LocalInvocationId => "local_invocation_id",
    LocalInvocationIndex => "local_invocation_index",
    GlobalInvocationId => "global_invocation_id",
    WorkgroupId => "workgroup_id",
    NumWorkgroups => "num_workgroups",
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum InterpolationType {
    Perspective,
    Linear,
    Flat,
}

impl InterpolationType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "perspective" => Self::Perspective,
            "linear" => Self::Linear,
            "flat" => Self::Flat,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Perspective => "perspective",
            Self::Linear => "linear",
            Self::Flat => "flat",
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum InterpolationSampling {
    Center,
    Centroid,
    Sample,
}

impl InterpolationSampling {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "center" => Self::Center,
            "centroid" => Self::Centroid,
            "sample" => Self::Sample,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Centroid => "centroid",
            Self::Sample => "sample",
        }
    }
}

#[derive(Clone, Debug)]
pub enum AttributeKind {
    Group(Handle<Expression>),
    Binding(Handle<Expression>),
    Location(Handle<Expression>),
    Builtin(BuiltinValue),
    /// One to three dimensions; missing ones default to 1.
    WorkgroupSize(Vec<Handle<Expression>>),
    Compute,
    Vertex,
    Fragment,
    Id(Handle<Expression>),
    Align(Handle<Expression>),
    Size(Handle<Expression>),
    Interpolate(InterpolationType, Option<InterpolationSampling>),
    Invariant,
    MustUse,
}

impl AttributeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Group(_) => "group",
            Self::Binding(_) => "binding",
            Self::Location(_) => "location",
            Self::Builtin(_) => "builtin",
            Self::WorkgroupSize(_) => "workgroup_size",
            Self::Compute => "compute",
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Id(_) => "id",
            Self::Align(_) => "align",
            Self::Size(_) => "size",
            Self::Interpolate(..) => "interpolate",
            Self::Invariant => "invariant",
            Self::MustUse => "must_use",
        }
    }

    /// Attributes describing a shader stage input or output.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Location(_) | Self::Builtin(_) | Self::Interpolate(..) | Self::Invariant
        )
    }

    /// Argument expressions, for passes that walk every expression.
    pub fn expressions(&self) -> Vec<Handle<Expression>> {
        match self {
            Self::Group(e)
            | Self::Binding(e)
            | Self::Location(e)
            | Self::Id(e)
            | Self::Align(e)
            | Self::Size(e) => vec![*e],
            Self::WorkgroupSize(dims) => dims.clone(),
            _ => Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Attribute {
    pub kind: AttributeKind,
    pub span: Span,
}

/// Finds the first attribute `f` maps to `Some`.
pub fn find_attribute<'a, T>(
    attributes: &'a [Attribute],
    f: impl Fn(&'a AttributeKind) -> Option<T>,
) -> Option<T> {
    attributes.iter().find_map(|a| f(&a.kind))
}

/// A type as written in source.
#[derive(Clone, Debug)]
pub enum TypeExprKind {
    /// Scalars, shorthands such as `vec3f`, `sampler`, structs and aliases.
    Named(Ident),
    Vector {
        size: VectorSize,
        element: Box<TypeExpr>,
    },
    Matrix {
        columns: VectorSize,
        rows: VectorSize,
        element: Box<TypeExpr>,
    },
    Array {
        element: Box<TypeExpr>,
        count: Option<Handle<Expression>>,
    },
    Atomic(Box<TypeExpr>),
    Pointer {
        space: Ident,
        element: Box<TypeExpr>,
        access: Option<Ident>,
    },
    Texture {
        dimension: TextureDimension,
        sample: Box<TypeExpr>,
    },
}

#[derive(Clone, Debug)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

impl TypeExpr {
    pub fn named(name: impl Into<String>, span: Span) -> Self {
        Self {
            kind: TypeExprKind::Named(Ident::new(name, span)),
            span,
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum LocalKind {
    Let,
    Var,
    Const,
    Parameter,
}

/// A function-scope name: parameter or local declaration.
#[derive(Clone, Debug)]
pub struct Local {
    pub name: Ident,
    pub kind: LocalKind,
    /// Value type for lets, consts and parameters; store type for vars.
    pub ty: Option<Handle<Type>>,
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub local: Handle<Local>,
    pub ty: TypeExpr,
    pub attributes: Vec<Attribute>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct FunctionResult {
    pub ty: TypeExpr,
    pub attributes: Vec<Attribute>,
    pub resolved: Option<Handle<Type>>,
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: Ident,
    pub attributes: Vec<Attribute>,
    pub parameters: Vec<Parameter>,
    pub result: Option<FunctionResult>,
    pub body: Block,
    pub span: Span,
}

impl Function {
    /// The stage this function is an entry point for, if any.
    pub fn stage(&self) -> Option<ShaderStage> {
        find_attribute(&self.attributes, |kind| match kind {
            AttributeKind::Compute => Some(ShaderStage::Compute),
            AttributeKind::Vertex => Some(ShaderStage::Vertex),
            AttributeKind::Fragment => Some(ShaderStage::Fragment),
            _ => None,
        })
    }

    pub fn workgroup_size(&self) -> Option<&[Handle<Expression>]> {
        find_attribute(&self.attributes, |kind| match kind {
            AttributeKind::WorkgroupSize(dims) => Some(dims.as_slice()),
            _ => None,
        })
    }

    pub fn result_type(&self) -> Option<Handle<Type>> {
        self.result.as_ref().and_then(|r| r.resolved)
    }
}

/// Group and binding numbers of a resource variable.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ResourceBinding {
    pub group: u32,
    pub binding: u32,
}

#[derive(Clone, Debug)]
pub struct GlobalVariable {
    pub name: Ident,
    pub address_space: Option<Ident>,
    pub access_mode: Option<Ident>,
    pub ty: Option<TypeExpr>,
    pub initializer: Option<Handle<Expression>>,
    pub attributes: Vec<Attribute>,
    pub span: Span,
    /// Store type, set by the type checker.
    pub resolved_ty: Option<Handle<Type>>,
    pub space: AddressSpace,
    pub access: AccessMode,
    /// Set by the attribute validator for resource variables.
    pub binding: Option<ResourceBinding>,
}

impl GlobalVariable {
    /// Uniform and storage buffers, samplers and textures.
    pub fn is_resource(&self) -> bool {
        matches!(
            self.space,
            AddressSpace::Uniform | AddressSpace::Storage | AddressSpace::Handle
        )
    }
}

/// A module-scope `const` or `override`.
#[derive(Clone, Debug)]
pub struct Constant {
    pub name: Ident,
    pub is_override: bool,
    pub ty: Option<TypeExpr>,
    pub initializer: Option<Handle<Expression>>,
    pub attributes: Vec<Attribute>,
    pub span: Span,
    pub resolved_ty: Option<Handle<Type>>,
    /// The `@id` of an override, set by the attribute validator.
    pub override_id: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct StructMember {
    pub name: Ident,
    pub ty: TypeExpr,
    pub attributes: Vec<Attribute>,
    pub span: Span,
    pub resolved_ty: Option<Handle<Type>>,
}

/// Offsets and size of a struct in host-shareable memory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructLayout {
    pub size: u32,
    pub align: u32,
    pub offsets: Vec<u32>,
}

#[derive(Clone, Debug)]
pub struct Struct {
    pub name: Ident,
    pub members: Vec<StructMember>,
    pub span: Span,
    pub layout: Option<StructLayout>,
}

impl Struct {
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct Alias {
    pub name: Ident,
    pub ty: TypeExpr,
    pub span: Span,
    pub resolved_ty: Option<Handle<Type>>,
}

/// A module-scope declaration, in module order.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Declaration {
    Constant(Handle<Constant>),
    Variable(Handle<GlobalVariable>),
    Struct(Handle<Struct>),
    Alias(Handle<Alias>),
    Function(Handle<Function>),
}
