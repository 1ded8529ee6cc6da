mod common;

use indexmap::IndexMap;
use weft_ast::{
    Configuration, ConstantMap, ErrorKind, LayoutBindingError, Limits, SourceMap,
};
use weft_codegen::BackendError;
use weft_passes::{
    BindGroupLayoutEntry, BindingKind, BufferBindingType, PipelineLayout, ShaderStages,
    default_layouts, prepare, static_check,
};

#[test]
fn syntax_errors_are_located() {
    let failed = common::check_err("const a = 1;\nfn main( {}");
    assert_eq!(failed.errors.len(), 1);
    let error = &failed.errors[0];
    assert_eq!(error.kind, ErrorKind::Syntax);
    assert_eq!(error.location.line, 2);
    assert!(!error.message.is_empty());
}

#[test]
fn source_maps_shift_locations() {
    let source_map = SourceMap::new("host.rs").with_offsets(40, 0);
    let failed = static_check(
        "const a = 1;\nfn main( {}",
        Some(&source_map),
        Configuration::default(),
    )
    .unwrap_err();
    assert_eq!(failed.errors[0].location.line, 42);
}

#[test]
fn mutual_recursion_is_a_cycle() {
    let failed = common::check_err("fn f() { g(); } fn g() { f(); }");
    assert!(!failed.errors.is_empty());
    assert!(
        failed.errors.iter().all(|e| e.kind == ErrorKind::DependencyCycle),
        "{:#?}",
        failed.errors
    );
}

#[test]
fn type_errors_accumulate_across_functions() {
    let failed = common::check_err(
        "fn a() { let x: i32 = 1.5; }
         fn b() { let y: u32 = true; }",
    );
    assert_eq!(failed.errors.len(), 2, "{:#?}", failed.errors);
    assert!(failed.errors.iter().all(|e| e.kind == ErrorKind::Type));
    assert!(failed.errors[0].location.line < failed.errors[1].location.line);
}

#[test]
fn workgroup_size_is_checked_against_limits() {
    let source = "@compute @workgroup_size(512) fn main() {}";
    let failed = common::check_err(source);
    assert_eq!(failed.errors.len(), 1);
    assert_eq!(failed.errors[0].kind, ErrorKind::Attribute);

    let limits = Limits {
        max_compute_workgroup_size_x: 1024,
        max_compute_invocations_per_workgroup: 1024,
        ..Limits::default()
    };
    common::check_with(source, Configuration::default().with_limits(limits));
}

#[test]
fn oversized_buffers_are_type_errors() {
    let failed = common::check_err(
        "@group(0) @binding(0) var<storage, read_write> big: array<vec4f, 1000000000>;
         @compute @workgroup_size(1) fn main() {}",
    );
    assert_eq!(failed.errors.len(), 1, "{:#?}", failed.errors);
    assert_eq!(failed.errors[0].kind, ErrorKind::Type);
}

fn particles_layout(params: BindGroupLayoutEntry) -> IndexMap<String, Option<PipelineLayout>> {
    let mut layout = PipelineLayout::default();
    layout.insert(
        0,
        BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStages::COMPUTE,
            kind: BindingKind::Buffer {
                ty: BufferBindingType::Storage,
                min_binding_size: None,
            },
        },
    );
    layout.insert(0, params);
    IndexMap::from([("main".to_string(), Some(layout))])
}

fn layout_error(params: BindGroupLayoutEntry) -> LayoutBindingError {
    let source = common::load_shader("particles");
    match common::prepare_err(&source, &particles_layout(params)).kind {
        ErrorKind::LayoutBinding(error) => error,
        other => panic!("expected a layout binding error, found {other:?}"),
    }
}

#[test]
fn storage_slot_for_a_uniform_is_incompatible() {
    let error = layout_error(BindGroupLayoutEntry {
        binding: 1,
        visibility: ShaderStages::COMPUTE,
        kind: BindingKind::Buffer {
            ty: BufferBindingType::Storage,
            min_binding_size: None,
        },
    });
    assert!(
        matches!(&error, LayoutBindingError::IncompatibleBinding { name, .. } if name == "params"),
        "{error:?}"
    );
}

#[test]
fn vertex_only_binding_is_not_visible_to_compute() {
    let error = layout_error(BindGroupLayoutEntry {
        binding: 1,
        visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
        kind: BindingKind::Buffer {
            ty: BufferBindingType::Uniform,
            min_binding_size: None,
        },
    });
    assert!(
        matches!(&error, LayoutBindingError::NotVisible { name, stage, .. }
            if name == "params" && stage == "compute"),
        "{error:?}"
    );
}

#[test]
fn undersized_buffer_is_rejected() {
    let error = layout_error(BindGroupLayoutEntry {
        binding: 1,
        visibility: ShaderStages::COMPUTE,
        kind: BindingKind::Buffer {
            ty: BufferBindingType::Uniform,
            min_binding_size: Some(4),
        },
    });
    assert!(
        matches!(error, LayoutBindingError::BufferTooSmall { provided: 4, .. }),
        "{error:?}"
    );
}

#[test]
fn failed_prepare_leaves_the_module_usable() {
    let source = common::load_shader("particles");
    let mut module = common::check(&source);
    let bad = particles_layout(BindGroupLayoutEntry {
        binding: 1,
        visibility: ShaderStages::COMPUTE,
        kind: BindingKind::Sampler { comparison: false },
    });
    assert!(prepare(&mut module, &bad).is_err());

    let layouts = default_layouts(&module);
    let prepared = prepare(&mut module, &layouts).unwrap();
    let text = weft_codegen::generate(&prepared, &ConstantMap::new()).unwrap();
    common::validate(&text);
}

#[test]
fn override_without_value_or_default_fails_generation() {
    let mut module = common::check(
        "override scale: f32;
         @group(0) @binding(0) var<storage, read_write> out: array<f32>;
         @compute @workgroup_size(1) fn main() { out[0] = scale; }",
    );
    let layouts = default_layouts(&module);
    let prepared = prepare(&mut module, &layouts).unwrap();
    assert_eq!(
        weft_codegen::generate(&prepared, &ConstantMap::new()),
        Err(BackendError::MissingOverride {
            name: "scale".into()
        })
    );
}
