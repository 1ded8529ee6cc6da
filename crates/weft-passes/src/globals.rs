//! Binding of resource globals to pipeline layout slots.

use indexmap::IndexMap;
use weft_ast::{Error, LayoutBindingError, ShaderModule};

use crate::layout::{BindGroupLayoutEntry, BindingKind, PipelineLayout, ShaderStages};
use crate::reflection::{EntryPointInformation, Resource};

/// Assigns every resource of every entry point its flattened slot in the
/// entry point's layout. Entry points without a layout get a default one,
/// recorded in their reflection.
pub fn rewrite_globals(
    module: &ShaderModule,
    entry_points: &mut IndexMap<String, EntryPointInformation>,
    layouts: &IndexMap<String, Option<PipelineLayout>>,
) -> Result<(), Error> {
    for (name, info) in entry_points.iter_mut() {
        let span = |resource: &Resource| module.global_variables[resource.variable].span;
        check_aliasing(module, name, &info.resources).map_err(|(error, r)| {
            Error::layout(error, span(&info.resources[r]))
        })?;

        let layout = match layouts.get(name) {
            Some(Some(layout)) => layout.clone(),
            _ => {
                let layout = default_layout(info);
                info.default_layout = Some(layout.clone());
                layout
            }
        };
        let stage = info.stage;
        for resource in &mut info.resources {
            let error = |error| Error::layout(error, span(resource));
            let Some((slot, entry)) = layout.entry(resource.group, resource.binding) else {
                return Err(error(LayoutBindingError::MissingBinding {
                    entry_point: name.clone(),
                    name: resource.name.clone(),
                    group: resource.group,
                    binding: resource.binding,
                }));
            };
            if !resource.kind.accepts(&entry.kind) {
                return Err(error(LayoutBindingError::IncompatibleBinding {
                    entry_point: name.clone(),
                    name: resource.name.clone(),
                    group: resource.group,
                    binding: resource.binding,
                    expected: resource.kind.describe(),
                    found: entry.kind.to_string(),
                }));
            }
            if !entry.visibility.contains(stage.into()) {
                return Err(error(LayoutBindingError::NotVisible {
                    entry_point: name.clone(),
                    name: resource.name.clone(),
                    group: resource.group,
                    binding: resource.binding,
                    stage: stage.name().to_string(),
                }));
            }
            if let BindingKind::Buffer {
                min_binding_size: Some(provided),
                ..
            } = entry.kind
            {
                if provided != 0 && provided < resource.min_binding_size {
                    return Err(error(LayoutBindingError::BufferTooSmall {
                        entry_point: name.clone(),
                        name: resource.name.clone(),
                        required: resource.min_binding_size,
                        provided,
                    }));
                }
            }
            resource.slot = Some(slot);
        }
        log::debug!(
            "rewrite globals: '{name}' binds {} resource(s) against {} layout entries",
            info.resources.len(),
            layout.entry_count()
        );
    }
    Ok(())
}

/// Two resources may share a slot only if they have the same type. On
/// failure, returns the index of the second resource.
fn check_aliasing(
    module: &ShaderModule,
    entry_point: &str,
    resources: &[Resource],
) -> Result<(), (LayoutBindingError, usize)> {
    for (i, second) in resources.iter().enumerate() {
        let Some(first) = resources[..i]
            .iter()
            .find(|r| r.group == second.group && r.binding == second.binding)
        else {
            continue;
        };
        let ty = |r: &Resource| module.global_variables[r.variable].resolved_ty;
        if first.kind != second.kind || ty(first) != ty(second) {
            let error = LayoutBindingError::AliasedBinding {
                entry_point: entry_point.to_string(),
                first: first.name.clone(),
                second: second.name.clone(),
                group: second.group,
                binding: second.binding,
            };
            return Err((error, i));
        }
    }
    Ok(())
}

fn default_layout(info: &EntryPointInformation) -> PipelineLayout {
    let mut layout = PipelineLayout::default();
    for resource in &info.resources {
        if layout.entry(resource.group, resource.binding).is_some() {
            continue;
        }
        layout.insert(
            resource.group,
            BindGroupLayoutEntry {
                binding: resource.binding,
                visibility: ShaderStages::from(info.stage),
                kind: resource.kind.default_binding(resource.min_binding_size),
            },
        );
    }
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_graph::CallGraph;
    use crate::layout::BufferBindingType;
    use crate::tests::checked;
    use weft_ast::ErrorKind;

    const SHADER: &str = "
        struct Params { scale: f32, offset: vec3f }
        @group(0) @binding(0) var<uniform> params: Params;
        @group(0) @binding(1) var<storage, read_write> data: array<f32>;
        @group(1) @binding(0) var<storage> input: array<f32>;
        @compute @workgroup_size(64)
        fn main(@builtin(global_invocation_id) id: vec3<u32>) {
            data[id.x] = input[id.x] * params.scale;
        }
    ";

    fn buffer(binding: u32, ty: BufferBindingType, min_binding_size: Option<u64>) -> BindGroupLayoutEntry {
        BindGroupLayoutEntry {
            binding,
            visibility: ShaderStages::COMPUTE,
            kind: BindingKind::Buffer { ty, min_binding_size },
        }
    }

    fn full_layout() -> PipelineLayout {
        let mut layout = PipelineLayout::default();
        layout.insert(0, buffer(0, BufferBindingType::Uniform, None));
        layout.insert(0, buffer(1, BufferBindingType::Storage, None));
        layout.insert(1, buffer(0, BufferBindingType::ReadOnlyStorage, None));
        layout
    }

    fn bind(source: &str, layout: Option<PipelineLayout>) -> Result<EntryPointInformation, Error> {
        let module = checked(source);
        let graph = CallGraph::build(&module, ["main"]);
        let mut info = graph.reflect(&module);
        let layouts = IndexMap::from([("main".to_string(), layout)]);
        rewrite_globals(&module, &mut info, &layouts)?;
        Ok(info.swap_remove("main").unwrap())
    }

    fn layout_error(layout: PipelineLayout) -> LayoutBindingError {
        match bind(SHADER, Some(layout)).unwrap_err().kind {
            ErrorKind::LayoutBinding(error) => error,
            other => panic!("expected a layout error, found {other:?}"),
        }
    }

    #[test]
    fn complete_layout_assigns_slots() {
        let info = bind(SHADER, Some(full_layout())).unwrap();
        let slots: Vec<_> = info.resources.iter().map(|r| (r.name.as_str(), r.slot)).collect();
        assert_eq!(slots, [("params", Some(0)), ("data", Some(1)), ("input", Some(2))]);
        assert!(info.default_layout.is_none());
    }

    #[test]
    fn missing_binding() {
        let mut layout = full_layout();
        layout.bind_groups.truncate(1);
        assert_eq!(
            layout_error(layout),
            LayoutBindingError::MissingBinding {
                entry_point: "main".into(),
                name: "input".into(),
                group: 1,
                binding: 0,
            }
        );
    }

    #[test]
    fn incompatible_and_invisible_bindings() {
        let mut layout = full_layout();
        layout.bind_groups[0].entries[1] = buffer(1, BufferBindingType::ReadOnlyStorage, None);
        assert!(matches!(
            layout_error(layout),
            LayoutBindingError::IncompatibleBinding { ref name, ref found, .. }
                if name == "data" && found == "read-only storage buffer"
        ));

        let mut layout = full_layout();
        layout.bind_groups[0].entries[0].visibility = ShaderStages::FRAGMENT;
        assert!(matches!(
            layout_error(layout),
            LayoutBindingError::NotVisible { ref stage, .. } if stage == "compute"
        ));
    }

    #[test]
    fn buffer_too_small() {
        let mut layout = full_layout();
        layout.bind_groups[0].entries[0] = buffer(0, BufferBindingType::Uniform, Some(16));
        assert_eq!(
            layout_error(layout),
            LayoutBindingError::BufferTooSmall {
                entry_point: "main".into(),
                name: "params".into(),
                required: 32,
                provided: 16,
            }
        );
    }

    #[test]
    fn aliased_bindings_need_the_same_type() {
        let source = "
            @group(0) @binding(0) var<storage> a: array<f32>;
            @group(0) @binding(0) var<storage> b: array<u32>;
            @compute @workgroup_size(1) fn main() { _ = a[0] + f32(b[0]); }
        ";
        let error = bind(source, None).unwrap_err();
        assert!(matches!(
            error.kind,
            ErrorKind::LayoutBinding(LayoutBindingError::AliasedBinding { ref first, ref second, .. })
                if first == "a" && second == "b"
        ));
    }

    #[test]
    fn default_layout_is_derived() {
        let info = bind(SHADER, None).unwrap();
        let layout = info.default_layout.unwrap();
        assert_eq!(layout.entry_count(), 3);
        assert_eq!(
            layout.entry(0, 0).unwrap().1.kind,
            BindingKind::Buffer {
                ty: BufferBindingType::Uniform,
                min_binding_size: Some(32),
            }
        );
        assert_eq!(
            layout.entry(1, 0).unwrap().1.kind,
            BindingKind::Buffer {
                ty: BufferBindingType::ReadOnlyStorage,
                min_binding_size: Some(4),
            }
        );
        assert!(info.resources.iter().all(|r| r.slot.is_some()));
    }
}
