//! Per-entry-point reflection.

use weft_ast::{
    AccessMode, AddressSpace, BuiltinValue, Expression, GlobalVariable, Handle, ScalarKind,
    ShaderModule, ShaderStage, TextureDimension, Type, layout,
};

use crate::layout::{BindingKind, BufferBindingType, TextureSampleType, TextureViewDimension};

/// What a resource variable is, as seen from the shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    UniformBuffer,
    StorageBuffer { read_only: bool },
    Sampler { comparison: bool },
    Texture {
        dimension: TextureDimension,
        sample: ScalarKind,
    },
}

impl ResourceKind {
    /// Classifies a checked resource variable.
    pub fn of(module: &ShaderModule, variable: &GlobalVariable) -> Self {
        let ty = variable
            .resolved_ty
            .expect("resource variables are typed after type checking");
        match (variable.space, &module.types[ty]) {
            (AddressSpace::Uniform, _) => Self::UniformBuffer,
            (AddressSpace::Storage, _) => Self::StorageBuffer {
                read_only: variable.access == AccessMode::Read,
            },
            (AddressSpace::Handle, Type::Sampler { comparison }) => Self::Sampler {
                comparison: *comparison,
            },
            (AddressSpace::Handle, Type::Texture { dimension, sample }) => Self::Texture {
                dimension: *dimension,
                sample: sample.kind,
            },
            (space, _) => unreachable!("'{}' in {space:?} is not a resource", variable.name.name),
        }
    }

    /// The layout kind a default layout assigns to this resource.
    pub fn default_binding(self, min_binding_size: u64) -> BindingKind {
        match self {
            Self::UniformBuffer => BindingKind::Buffer {
                ty: BufferBindingType::Uniform,
                min_binding_size: Some(min_binding_size),
            },
            Self::StorageBuffer { read_only } => BindingKind::Buffer {
                ty: if read_only {
                    BufferBindingType::ReadOnlyStorage
                } else {
                    BufferBindingType::Storage
                },
                min_binding_size: Some(min_binding_size),
            },
            Self::Sampler { comparison } => BindingKind::Sampler { comparison },
            Self::Texture { dimension, sample } => BindingKind::Texture {
                sample_type: match sample {
                    ScalarKind::Sint => TextureSampleType::Sint,
                    ScalarKind::Uint => TextureSampleType::Uint,
                    _ => TextureSampleType::Float { filterable: true },
                },
                view_dimension: dimension.into(),
            },
        }
    }

    /// Whether a layout slot of `kind` can hold this resource.
    pub fn accepts(self, kind: &BindingKind) -> bool {
        match (self, kind) {
            (Self::UniformBuffer, BindingKind::Buffer { ty, .. }) => {
                *ty == BufferBindingType::Uniform
            }
            (Self::StorageBuffer { read_only: false }, BindingKind::Buffer { ty, .. }) => {
                *ty == BufferBindingType::Storage
            }
            (Self::StorageBuffer { read_only: true }, BindingKind::Buffer { ty, .. }) => {
                matches!(
                    ty,
                    BufferBindingType::Storage | BufferBindingType::ReadOnlyStorage
                )
            }
            (Self::Sampler { comparison }, BindingKind::Sampler { comparison: other }) => {
                comparison == *other
            }
            (
                Self::Texture { dimension, sample },
                BindingKind::Texture {
                    sample_type,
                    view_dimension,
                },
            ) => {
                let sample_matches = match sample {
                    ScalarKind::Sint => *sample_type == TextureSampleType::Sint,
                    ScalarKind::Uint => *sample_type == TextureSampleType::Uint,
                    _ => matches!(sample_type, TextureSampleType::Float { .. }),
                };
                sample_matches && TextureViewDimension::from(dimension) == *view_dimension
            }
            _ => false,
        }
    }

    pub fn describe(self) -> String {
        match self {
            Self::UniformBuffer => "uniform buffer".to_string(),
            Self::StorageBuffer { read_only: true } => "read-only storage buffer".to_string(),
            Self::StorageBuffer { read_only: false } => "storage buffer".to_string(),
            Self::Sampler { comparison: false } => "sampler".to_string(),
            Self::Sampler { comparison: true } => "comparison sampler".to_string(),
            Self::Texture { dimension, .. } => dimension.type_name().replace('_', " "),
        }
    }
}

/// A resource variable used by an entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    /// Source name of the variable.
    pub name: String,
    pub variable: Handle<GlobalVariable>,
    pub group: u32,
    pub binding: u32,
    pub kind: ResourceKind,
    /// Host-shareable size of the buffer's store type; 0 for handles.
    pub min_binding_size: u64,
    /// Flattened layout slot, assigned by the global rewriter.
    pub slot: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IoBinding {
    Builtin(BuiltinValue),
    Location(u32),
}

/// An entry point input or output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceVariable {
    pub name: String,
    pub binding: IoBinding,
    /// WGSL spelling of the type.
    pub ty: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkgroupDimension {
    Constant(u32),
    /// Depends on overrides; resolve with [`crate::evaluate`] once values
    /// are known.
    Override(Handle<Expression>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntryPointInformation {
    pub original_name: String,
    /// Name of the entry point in generated code. Equal to the original
    /// name until mangling runs.
    pub mangled_name: String,
    pub stage: ShaderStage,
    /// Compute entry points only.
    pub workgroup_size: Option<[WorkgroupDimension; 3]>,
    pub resources: Vec<Resource>,
    pub inputs: Vec<InterfaceVariable>,
    pub outputs: Vec<InterfaceVariable>,
    /// Names of the overrides the entry point depends on.
    pub overrides: Vec<String>,
    /// Derived when the entry point was prepared without a layout.
    pub default_layout: Option<crate::PipelineLayout>,
}

impl EntryPointInformation {
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// Host-shareable size of a buffer's store type, used as its minimum
/// binding size.
pub(crate) fn buffer_size(module: &ShaderModule, variable: &GlobalVariable) -> u64 {
    if variable.space == AddressSpace::Handle {
        return 0;
    }
    variable
        .resolved_ty
        .and_then(|ty| layout::type_layout(module, ty))
        .map_or(0, |l| u64::from(l.size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_storage_accepts_both_storage_slots() {
        let kind = ResourceKind::StorageBuffer { read_only: true };
        for ty in [BufferBindingType::Storage, BufferBindingType::ReadOnlyStorage] {
            assert!(kind.accepts(&BindingKind::Buffer {
                ty,
                min_binding_size: None
            }));
        }
        let writable = ResourceKind::StorageBuffer { read_only: false };
        assert!(!writable.accepts(&BindingKind::Buffer {
            ty: BufferBindingType::ReadOnlyStorage,
            min_binding_size: None
        }));
    }

    #[test]
    fn texture_slot_must_match_dimension_and_sample_type() {
        let kind = ResourceKind::Texture {
            dimension: TextureDimension::D2,
            sample: ScalarKind::Float,
        };
        assert!(kind.accepts(&kind.default_binding(0)));
        assert!(!kind.accepts(&BindingKind::Texture {
            sample_type: TextureSampleType::Uint,
            view_dimension: TextureViewDimension::D2,
        }));
        assert!(!kind.accepts(&BindingKind::Texture {
            sample_type: TextureSampleType::Float { filterable: false },
            view_dimension: TextureViewDimension::D3,
        }));
        assert_eq!(kind.describe(), "texture 2d");
    }
}
