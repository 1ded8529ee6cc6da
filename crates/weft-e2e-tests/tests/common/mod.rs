use weft_ast::{Configuration, ConstantMap, Error, FailedCheck, ShaderModule};
use weft_passes::{default_layouts, prepare, static_check};

/// Load a shader from `shaders/` by name (without extension).
#[allow(dead_code)]
pub fn load_shader(name: &str) -> String {
    let path = format!("{}/shaders/{name}.wgsl", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to load {path}: {e}"))
}

/// Static check that must succeed.
#[allow(dead_code)]
pub fn check(source: &str) -> ShaderModule {
    check_with(source, Configuration::default())
}

#[allow(dead_code)]
pub fn check_with(source: &str, configuration: Configuration) -> ShaderModule {
    static_check(source, None, configuration)
        .unwrap_or_else(|failed| panic!("static check failed: {:#?}", failed.errors))
        .ast
}

/// Static check that must fail.
#[allow(dead_code)]
pub fn check_err(source: &str) -> FailedCheck {
    match static_check(source, None, Configuration::default()) {
        Ok(_) => panic!("static check unexpectedly succeeded"),
        Err(failed) => failed,
    }
}

/// Check, prepare every entry point with a default layout, generate with
/// `constants` and validate the result.
#[allow(dead_code)]
pub fn compile_with_constants(source: &str, constants: &ConstantMap) -> String {
    let mut module = check(source);
    let layouts = default_layouts(&module);
    let prepared = prepare(&mut module, &layouts).expect("prepare failed");
    let text = weft_codegen::generate(&prepared, constants).expect("generate failed");
    validate(&text);
    text
}

#[allow(dead_code)]
pub fn compile(source: &str) -> String {
    compile_with_constants(source, &ConstantMap::new())
}

/// Prepare error for a module checked from `source`.
#[allow(dead_code)]
pub fn prepare_err(
    source: &str,
    layouts: &indexmap::IndexMap<String, Option<weft_passes::PipelineLayout>>,
) -> Error {
    let mut module = check(source);
    match prepare(&mut module, layouts) {
        Ok(_) => panic!("prepare unexpectedly succeeded"),
        Err(error) => error,
    }
}

/// Parse and validate WGSL text with naga.
#[allow(dead_code)]
pub fn validate(text: &str) -> naga::Module {
    let module = naga::front::wgsl::parse_str(text)
        .unwrap_or_else(|e| panic!("naga rejected generated WGSL: {e}\n{text}"));
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .unwrap_or_else(|e| panic!("naga validation failed: {e:?}\n{text}"));
    module
}
