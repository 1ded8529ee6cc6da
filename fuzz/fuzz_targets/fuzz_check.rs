#![no_main]

use libfuzzer_sys::fuzz_target;
use weft_ast::Configuration;
use weft_passes::{default_layouts, prepare, static_check};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    // Checked modules go through prepare with their default layouts. Both
    // pipelines report errors as values.
    if let Ok(checked) = static_check(source, None, Configuration::default()) {
        let mut module = checked.ast;
        let layouts = default_layouts(&module);
        let _ = prepare(&mut module, &layouts);
    }
});
