//! Pipeline layouts a checked module is specialized against.

use std::fmt;

use weft_ast::{ShaderStage, TextureDimension};

bitflags::bitflags! {
    /// Shader stages a binding is visible to.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

impl From<ShaderStage> for ShaderStages {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::VERTEX,
            ShaderStage::Fragment => Self::FRAGMENT,
            ShaderStage::Compute => Self::COMPUTE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferBindingType {
    Uniform,
    Storage,
    ReadOnlyStorage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSampleType {
    Float { filterable: bool },
    Sint,
    Uint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureViewDimension {
    D1,
    D2,
    D2Array,
    D3,
    Cube,
}

impl From<TextureDimension> for TextureViewDimension {
    fn from(dimension: TextureDimension) -> Self {
        match dimension {
            TextureDimension::D1 => Self::D1,
            TextureDimension::D2 => Self::D2,
            TextureDimension::D2Array => Self::D2Array,
            TextureDimension::D3 => Self::D3,
            TextureDimension::Cube => Self::Cube,
        }
    }
}

/// What occupies a binding slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Buffer {
        ty: BufferBindingType,
        /// Smallest buffer size the layout guarantees; `None` or `Some(0)`
        /// means unchecked.
        min_binding_size: Option<u64>,
    },
    Sampler {
        comparison: bool,
    },
    Texture {
        sample_type: TextureSampleType,
        view_dimension: TextureViewDimension,
    },
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Buffer { ty, .. } => f.write_str(match ty {
                BufferBindingType::Uniform => "uniform buffer",
                BufferBindingType::Storage => "storage buffer",
                BufferBindingType::ReadOnlyStorage => "read-only storage buffer",
            }),
            Self::Sampler { comparison: false } => f.write_str("sampler"),
            Self::Sampler { comparison: true } => f.write_str("comparison sampler"),
            Self::Texture {
                sample_type,
                view_dimension,
            } => {
                let sample = match sample_type {
                    TextureSampleType::Float { filterable: true } => "float",
                    TextureSampleType::Float { filterable: false } => "unfilterable-float",
                    TextureSampleType::Sint => "sint",
                    TextureSampleType::Uint => "uint",
                };
                let dimension = match view_dimension {
                    TextureViewDimension::D1 => "1d",
                    TextureViewDimension::D2 => "2d",
                    TextureViewDimension::D2Array => "2d-array",
                    TextureViewDimension::D3 => "3d",
                    TextureViewDimension::Cube => "cube",
                };
                write!(f, "{sample} {dimension} texture")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStages,
    pub kind: BindingKind,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindGroupLayout {
    pub entries: Vec<BindGroupLayoutEntry>,
}

/// Bind groups indexed by group number.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineLayout {
    pub bind_groups: Vec<BindGroupLayout>,
}

impl PipelineLayout {
    /// The entry at `group`/`binding` together with its flattened slot: its
    /// position counting every entry of the earlier groups first.
    pub fn entry(&self, group: u32, binding: u32) -> Option<(u32, &BindGroupLayoutEntry)> {
        let group = group as usize;
        let before: usize = self
            .bind_groups
            .iter()
            .take(group)
            .map(|g| g.entries.len())
            .sum();
        let entries = &self.bind_groups.get(group)?.entries;
        entries
            .iter()
            .position(|e| e.binding == binding)
            .map(|i| ((before + i) as u32, &entries[i]))
    }

    /// Adds an entry, growing the group list as needed. Entries within a
    /// group stay sorted by binding.
    pub fn insert(&mut self, group: u32, entry: BindGroupLayoutEntry) {
        let group = group as usize;
        if self.bind_groups.len() <= group {
            self.bind_groups.resize_with(group + 1, BindGroupLayout::default);
        }
        let entries = &mut self.bind_groups[group].entries;
        let at = entries.partition_point(|e| e.binding < entry.binding);
        entries.insert(at, entry);
    }

    pub fn entry_count(&self) -> usize {
        self.bind_groups.iter().map(|g| g.entries.len()).sum()
    }
}
