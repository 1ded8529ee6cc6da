//! Static checking and lowering passes for Weft.
//!
//! [`static_check`] turns WGSL source into a checked [`ShaderModule`].
//! [`prepare`] then rewrites a checked module for a set of entry points and
//! pipeline layouts, producing the [`PrepareResult`] a backend generates
//! code from.
//!
//! [`ShaderModule`]: weft_ast::ShaderModule

mod attributes;
mod bounds;
mod call_graph;
mod entry_points;
mod evaluate;
mod globals;
pub mod layout;
mod mangle;
mod pipeline;
mod pointers;
mod reflection;
mod reorder;
mod timing;
mod typecheck;

pub use call_graph::{CallGraph, EntryPointCalls};
pub use evaluate::evaluate;
pub use layout::{
    BindGroupLayout, BindGroupLayoutEntry, BindingKind, BufferBindingType, PipelineLayout,
    ShaderStages, TextureSampleType, TextureViewDimension,
};
pub use mangle::Namer;
pub use pipeline::{
    CheckPass, CompilationScope, PreparePass, PrepareResult, SuccessfulCheck, default_layouts,
    prepare, prepare_entry_point, static_check,
};
pub use reflection::{
    EntryPointInformation, InterfaceVariable, IoBinding, Resource, ResourceKind,
    WorkgroupDimension,
};
pub use timing::{PhaseTimer, PhaseTimes};

#[cfg(test)]
mod tests {
    use weft_ast::{Configuration, ShaderModule};

    /// The checked module of `source`, which must pass every static check.
    pub(crate) fn checked(source: &str) -> ShaderModule {
        checked_with(source, Configuration::default())
    }

    pub(crate) fn checked_with(source: &str, configuration: Configuration) -> ShaderModule {
        match crate::static_check(source, None, configuration) {
            Ok(checked) => checked.ast,
            Err(failed) => panic!("static check failed: {:#?}", failed.errors),
        }
    }
}
