//! Fuzz target: template compilation and path matching.
//!
//! The first line of the input is compiled as a template, the rest is matched
//! against it as a path. Neither step may panic.

#![no_main]

use ferrest_core::RouteTemplate;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (template, path) = text.split_once('\n').unwrap_or((text, "/"));
    if let Ok(compiled) = RouteTemplate::compile(template) {
        if let Some(params) = compiled.match_path(path) {
            assert_eq!(params.len(), compiled.param_names().count());
        }
    }
});
