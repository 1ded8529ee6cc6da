#![no_main]

use libfuzzer_sys::fuzz_target;
use weft_ast::Configuration;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        // The parser reports malformed input as a syntax error, never a panic.
        let _ = weft_parser::parse(source, Configuration::default());
    }
});
