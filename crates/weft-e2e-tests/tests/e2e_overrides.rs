mod common;

use weft_ast::{ConstantMap, ConstantValue};
use weft_codegen::{Backend, BackendError, DiagnosticLevel, WgslBackend};
use weft_passes::{WorkgroupDimension, default_layouts, prepare};

const SHADER: &str = "
@id(7) override block: u32 = 64;
override scale: f32;
@group(0) @binding(0) var<storage, read_write> out: array<f32>;

@compute @workgroup_size(block)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    out[id.x] = f32(id.x) * scale;
}
";

#[test]
fn values_are_keyed_by_name_or_id() {
    let mut constants = ConstantMap::new();
    constants.insert("7".into(), ConstantValue::AbstractInt(128));
    constants.insert("scale".into(), ConstantValue::AbstractFloat(2.0));
    let text = common::compile_with_constants(SHADER, &constants);
    assert!(text.contains("@workgroup_size(128u)"), "{text}");
    assert!(text.contains("2.0f"), "{text}");

    let mut by_name = ConstantMap::new();
    by_name.insert("block".into(), ConstantValue::U32(128));
    by_name.insert("scale".into(), ConstantValue::F32(2.0));
    assert_eq!(common::compile_with_constants(SHADER, &by_name), text);
}

#[test]
fn defaults_apply_and_missing_values_fail() {
    let mut module = common::check(SHADER);
    let layouts = default_layouts(&module);

    {
        let prepared = prepare(&mut module, &layouts).unwrap();
        assert_eq!(
            WgslBackend.generate(&prepared, &ConstantMap::new()).unwrap_err(),
            BackendError::MissingOverride {
                name: "scale".into()
            }
        );
    }

    let prepared = prepare(&mut module, &layouts).unwrap();
    let mut constants = ConstantMap::new();
    constants.insert("scale".into(), ConstantValue::AbstractFloat(1.0));
    let output = WgslBackend.generate(&prepared, &constants).unwrap();
    common::validate(&output.files[0].text);
    assert!(output.files[0].text.contains("@workgroup_size(64u)"));
    assert!(
        output
            .diagnostics
            .iter()
            .all(|d| d.level == DiagnosticLevel::Info)
    );
}

#[test]
fn reflection_marks_override_sized_workgroups() {
    let mut module = common::check(SHADER);
    let layouts = default_layouts(&module);
    let prepared = prepare(&mut module, &layouts).unwrap();
    let main = prepared.entry_point("main").unwrap();
    let size = main.workgroup_size.unwrap();
    assert!(matches!(size[0], WorkgroupDimension::Override(_)));
    assert_eq!(&size[1..], [WorkgroupDimension::Constant(1); 2]);
    let mut overrides = main.overrides.clone();
    overrides.sort();
    assert_eq!(overrides, ["block", "scale"]);
}

#[test]
fn workgroup_limits_apply_after_specialization() {
    let mut module = common::check(SHADER);
    let layouts = default_layouts(&module);
    let prepared = prepare(&mut module, &layouts).unwrap();
    let mut constants = ConstantMap::new();
    constants.insert("block".into(), ConstantValue::AbstractInt(1024));
    constants.insert("scale".into(), ConstantValue::AbstractFloat(1.0));
    assert!(matches!(
        WgslBackend.generate(&prepared, &constants),
        Err(BackendError::InvalidWorkgroupSize { .. })
    ));
}
