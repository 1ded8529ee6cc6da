//! Integration tests for the WGSL parser.

use pretty_assertions::assert_eq;
use weft_ast::{Configuration, Declaration, ErrorKind, ShaderStage, dump_module};
use weft_parser::parse;

const VECADD: &str = r#"
@group(0) @binding(0) var<storage, read> a: array<f32>;
@group(0) @binding(1) var<storage, read> b: array<f32>;
@group(0) @binding(2) var<storage, read_write> c: array<f32>;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>) {
    let i = gid.x;
    c[i] = a[i] + b[i];
}
"#;

#[test]
fn parse_vecadd() {
    let module = parse(VECADD, Configuration::default()).expect("vecadd should parse");

    assert_eq!(module.declarations.len(), 4);
    assert_eq!(module.global_variables.len(), 3);
    let entry_points: Vec<_> = module.entry_points().collect();
    assert_eq!(entry_points.len(), 1);
    let main = &module.functions[entry_points[0]];
    assert_eq!(main.name.name, "main");
    assert_eq!(main.stage(), Some(ShaderStage::Compute));
    assert_eq!(main.body.len(), 2);

    // Nothing is resolved before type checking.
    assert!(module.types.is_empty());
    assert!(module.expressions.iter().all(|(_, e)| e.ty.is_none()));
}

#[test]
fn dump_shows_unresolved_tree() {
    let module = parse(VECADD, Configuration::default()).unwrap();
    let dump = dump_module(&module);
    assert!(dump.contains("Declarations:"), "{dump}");
    assert!(dump.contains("[function0] @compute @workgroup_size(256) fn main("), "{dump}");
    assert!(dump.contains("a: array<f32>"), "{dump}");
}

#[test]
fn declaration_order_is_source_order() {
    let module = parse(
        "fn f() -> i32 { return g(); }
         fn g() -> i32 { return k; }
         const k = 3;",
        Configuration::default(),
    )
    .unwrap();
    let names: Vec<_> = module
        .declarations
        .iter()
        .map(|d| module.declaration_name(*d).name.as_str())
        .collect();
    assert_eq!(names, ["f", "g", "k"]);
    assert!(matches!(module.declarations[2], Declaration::Constant(_)));
}

#[test]
fn full_statement_set() {
    let source = r#"
enable f16;

struct Particle {
    pos: vec3<f32>,
    @size(16) vel: vec3<f32>,
};

alias Particles = array<Particle, 64>;
override scale: f32 = 2.0;
var<workgroup> tile: array<atomic<u32>, 64>;

@compute @workgroup_size(64, 1, 1)
fn step(@builtin(local_invocation_index) li: u32) {
    var p: Particle;
    let ptr_p = &p;
    (*ptr_p).pos += vec3f(1.0) * scale;
    for (var i = 0u; i < 4u; i++) {
        if i == 2u { continue; } else if i == 3u { break; }
    }
    loop {
        continuing { break if true; }
    }
    switch li % 3u {
        case 0u: { atomicAdd(&tile[li], 1u); }
        default: { }
    }
    while false { discard; }
    _ = tile[0];
    workgroupBarrier();
    let h = 1.5h;
    {
        let x = -h;
    }
}
"#;
    let module = parse(source, Configuration::default()).expect("should parse");
    assert_eq!(module.enables.len(), 1);
    assert_eq!(module.structs.len(), 1);
    assert_eq!(module.aliases.len(), 1);
    assert_eq!(module.constants.len(), 1);
    assert_eq!(module.functions.len(), 1);
}

#[test]
fn syntax_error_has_kind_and_span() {
    let source = "fn main() {\n    let x = ;\n}";
    let err = parse(source, Configuration::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(err.message, "expected an expression, found ';'");
    let located = err.locate(source, None);
    assert_eq!(located.to_string(), "2:13: syntax error: expected an expression, found ';'");
}

#[test]
fn unterminated_block() {
    let err = parse("fn main() { let x = 1;", Configuration::default()).unwrap_err();
    assert_eq!(err.message, "expected '}', found end of input");
}
