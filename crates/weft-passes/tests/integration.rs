//! Static check and prepare, end to end through the public API.

use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use weft_ast::{
    Configuration, ConstantMap, ConstantValue, ErrorKind, ExpressionKind, LayoutBindingError,
    ShaderModule, ShaderStage, dump_module,
};
use weft_passes::{
    BindGroupLayoutEntry, BindingKind, BufferBindingType, PipelineLayout, ResourceKind,
    ShaderStages, default_layouts, evaluate, prepare, prepare_entry_point, static_check,
};

fn check(source: &str) -> ShaderModule {
    match static_check(source, None, Configuration::default()) {
        Ok(checked) => checked.ast,
        Err(failed) => panic!("static check failed: {:#?}", failed.errors),
    }
}

fn uniform_layout(group: u32, binding: u32) -> PipelineLayout {
    let mut layout = PipelineLayout::default();
    layout.insert(
        group,
        BindGroupLayoutEntry {
            binding,
            visibility: ShaderStages::COMPUTE,
            kind: BindingKind::Buffer {
                ty: BufferBindingType::Uniform,
                min_binding_size: None,
            },
        },
    );
    layout
}

const PARTICLES: &str = "
struct Particle { position: vec2f, velocity: vec2f }
override steps: u32 = 4;
@group(0) @binding(0) var<storage, read_write> particles: array<Particle>;
@group(0) @binding(1) var<uniform> dt: f32;
@group(1) @binding(0) var<uniform> unused: vec4f;

fn advance(p: ptr<function, Particle>) {
    (*p).position += (*p).velocity * dt;
}

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    var particle = particles[id.x];
    for (var i = 0u; i < steps; i++) {
        advance(&particle);
    }
    particles[id.x] = particle;
}
";

#[test]
fn compilation_is_deterministic() {
    let mut first = check(PARTICLES);
    let mut second = check(PARTICLES);
    assert_eq!(dump_module(&first), dump_module(&second));

    let layouts = default_layouts(&first);
    let a = prepare(&mut first, &layouts).unwrap();
    let b = prepare(&mut second, &layouts).unwrap();
    assert_eq!(dump_module(a.module()), dump_module(b.module()));
    assert_eq!(a.entry_points, b.entry_points);
    assert_eq!(a.call_graph, b.call_graph);
}

#[test]
fn cycles_fail_before_type_checking() {
    let failed = static_check("const a = b; const b = a;", None, Configuration::default())
        .unwrap_err();
    assert!(!failed.errors.is_empty());
    assert!(
        failed.errors.iter().all(|e| e.kind == ErrorKind::DependencyCycle),
        "{:#?}",
        failed.errors
    );
}

#[test]
fn float_in_integer_binding_is_a_type_error() {
    let failed = static_check("fn f() { let a: i32 = 1.5; }", None, Configuration::default())
        .unwrap_err();
    assert_eq!(failed.errors.len(), 1);
    assert_eq!(failed.errors[0].kind, ErrorKind::Type);
}

#[test]
fn evaluate_returns_the_cached_value() {
    let module = check(
        "const n = 2 * 3 + 1;
         var<private> table: array<f32, n>;",
    );
    let (_, n) = module.constants.iter().find(|(_, c)| c.name.name == "n").unwrap();
    let initializer = n.initializer.unwrap();
    assert!(matches!(
        module.expressions[initializer].kind,
        ExpressionKind::Binary { .. }
    ));

    let first = evaluate(&module, initializer, &ConstantMap::new()).clone();
    let second = evaluate(&module, initializer, &ConstantMap::new());
    assert_eq!(first, ConstantValue::AbstractInt(7));
    assert_eq!(&first, second);
}

#[test]
fn missing_binding_fails_prepare() {
    let mut module = check(PARTICLES);
    let error = prepare_entry_point(&mut module, "main", Some(uniform_layout(0, 1))).unwrap_err();
    match error.kind {
        ErrorKind::LayoutBinding(LayoutBindingError::MissingBinding { name, group, binding, .. }) => {
            assert_eq!((name.as_str(), group, binding), ("particles", 0, 0));
        }
        other => panic!("expected a missing binding, found {other:?}"),
    }
}

#[test]
fn complete_layout_lists_reachable_resources() {
    let mut module = check(PARTICLES);
    let mut layout = uniform_layout(0, 1);
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
    let prepared = prepare_entry_point(&mut module, "main", Some(layout)).unwrap();
    let main = prepared.entry_point("main").unwrap();

    let resources: Vec<_> = main
        .resources
        .iter()
        .map(|r| (r.name.as_str(), r.group, r.binding, r.slot))
        .collect();
    // `unused` is declared but never reached from main.
    assert_eq!(resources, [("particles", 0, 0, Some(0)), ("dt", 0, 1, Some(1))]);
    assert_eq!(main.overrides, ["steps"]);
    assert!(main.default_layout.is_none());

    let calls = prepared.call_graph.get("main").unwrap();
    let names: Vec<_> = calls
        .functions
        .iter()
        .map(|&f| prepared.scope.namer().original(&prepared.module().functions[f].name.name))
        .collect();
    assert_eq!(names, ["advance", "main"]);
}

#[test]
fn only_dynamic_indices_are_checked() {
    let mut module = check(
        "var<private> table: array<f32, 4>;
         @compute @workgroup_size(1)
         fn main(@builtin(local_invocation_index) i: u32) {
             let a = table[1];
             let b = table[i];
         }",
    );
    let layouts = default_layouts(&module);
    let prepared = prepare(&mut module, &layouts).unwrap();
    let checks = prepared
        .module()
        .expressions
        .iter()
        .filter(|(_, e)| matches!(e.kind, ExpressionKind::BoundsCheck { .. }))
        .count();
    assert_eq!(checks, 1);
}

#[test]
fn uniform_scalar_compute_example() {
    let source = "@group(0) @binding(0) var<uniform> x: f32;
                  @compute @workgroup_size(1) fn main() { let y = x + 1.0; }";
    let checked = static_check(source, None, Configuration::default()).unwrap();
    assert!(checked.warnings.is_empty());
    let mut module = checked.ast;

    let prepared = prepare_entry_point(&mut module, "main", Some(uniform_layout(0, 0))).unwrap();
    let entry_points: Vec<_> = prepared.call_graph.entry_points().map(|(name, _)| name).collect();
    assert_eq!(entry_points, ["main"]);
    assert_eq!(prepared.call_graph.get("main").unwrap().functions.len(), 1);

    let main = prepared.entry_point("main").unwrap();
    assert_eq!(main.stage, ShaderStage::Compute);
    assert_eq!(main.resources.len(), 1);
    let x = &main.resources[0];
    assert_eq!((x.name.as_str(), x.group, x.binding), ("x", 0, 0));
    assert_eq!(x.kind, ResourceKind::UniformBuffer);
    assert_eq!(x.min_binding_size, 4);
}

#[test]
fn several_entry_points_share_one_prepare() {
    let mut module = check(
        "@group(0) @binding(0) var<storage, read_write> out: array<u32>;
         @compute @workgroup_size(1) fn a() { out[0] = 1u; }
         @compute @workgroup_size(1) fn b() { out[1] = 2u; }",
    );
    let mut layouts: IndexMap<String, Option<PipelineLayout>> = IndexMap::new();
    layouts.insert("b".into(), None);
    layouts.insert("a".into(), None);
    let prepared = prepare(&mut module, &layouts).unwrap();
    let order: Vec<_> = prepared.entry_points.keys().map(String::as_str).collect();
    assert_eq!(order, ["b", "a"]);
    for info in prepared.entry_points.values() {
        let layout = info.default_layout.as_ref().unwrap();
        assert_eq!(layout.entry_count(), 1);
        assert_eq!(info.resources[0].slot, Some(0));
    }
}
