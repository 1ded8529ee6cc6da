mod common;

use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use weft_ast::{ConstantMap, dump_module};
use weft_passes::{default_layouts, prepare};

const SHADERS: [&str; 4] = ["particles", "textured_quad", "reduce", "luminance"];

#[test]
fn every_shader_compiles_to_valid_wgsl() {
    for name in SHADERS {
        let source = common::load_shader(name);
        let text = common::compile(&source);
        let module = common::validate(&text);
        let expected = common::check(&source).entry_points().count();
        assert_eq!(module.entry_points.len(), expected, "{name}:\n{text}");
    }
}

#[test]
fn output_is_deterministic() {
    for name in SHADERS {
        let source = common::load_shader(name);
        assert_eq!(common::compile(&source), common::compile(&source), "{name}");
    }
}

#[test]
fn a_checked_module_can_be_prepared_again() {
    let source = common::load_shader("particles");
    let mut module = common::check(&source);
    let checked = dump_module(&module);
    let layouts = default_layouts(&module);

    let first = {
        let prepared = prepare(&mut module, &layouts).unwrap();
        weft_codegen::generate(&prepared, &ConstantMap::new()).unwrap()
    };
    assert_eq!(dump_module(&module), checked);

    let second = {
        let prepared = prepare(&mut module, &layouts).unwrap();
        weft_codegen::generate(&prepared, &ConstantMap::new()).unwrap()
    };
    assert_eq!(first, second);
    assert_eq!(dump_module(&module), checked);
}

#[test]
fn source_names_do_not_leak() {
    let text = common::compile(&common::load_shader("particles"));
    for name in ["Particle", "particles", "advance", "damping", "velocity", "steps"] {
        assert!(!text.contains(name), "'{name}' survived:\n{text}");
    }
    assert!(text.contains("fn function"), "{text}");
}

#[test]
fn one_entry_point_can_be_prepared_alone() {
    let source = common::load_shader("textured_quad");
    let mut module = common::check(&source);
    let layouts = IndexMap::from([("fs_main".to_string(), None)]);
    let prepared = prepare(&mut module, &layouts).unwrap();
    let text = weft_codegen::generate(&prepared, &ConstantMap::new()).unwrap();

    let naga_module = common::validate(&text);
    assert_eq!(naga_module.entry_points.len(), 1);
    assert_eq!(naga_module.entry_points[0].stage, naga::ShaderStage::Fragment);
    assert!(!text.contains("@vertex"), "{text}");
}

#[test]
fn constants_are_folded_into_the_output() {
    let text = common::compile(&common::load_shader("luminance"));
    assert!(text.contains("0.2126f"), "{text}");
    assert!(text.contains("min(u32("), "{text}");
    assert!(!text.contains("const "), "{text}");
}

#[test]
fn override_defaults_are_inlined() {
    let text = common::compile(&common::load_shader("reduce"));
    assert!(text.contains("@workgroup_size(64u)"), "{text}");
    assert!(!text.contains("override"), "{text}");
    assert!(text.contains("var<workgroup>"), "{text}");
}

#[test]
fn unused_declarations_are_dropped() {
    let text = common::compile(
        "struct Unused { a: f32 }
         @group(3) @binding(7) var<uniform> unused: Unused;
         fn helper() -> f32 { return 1.0; }
         @group(0) @binding(0) var<storage, read_write> out: array<f32>;
         @compute @workgroup_size(1) fn main() { out[0] = 2.0; }",
    );
    assert!(!text.contains("@group(3)"), "{text}");
    assert!(!text.contains("struct"), "{text}");
    assert_eq!(text.matches("fn ").count(), 1, "{text}");
}
