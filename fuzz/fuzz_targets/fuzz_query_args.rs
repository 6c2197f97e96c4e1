//! Fuzz target: query string decoding.
//!
//! Decoding arbitrary bytes must never panic, and every `&`-separated
//! non-empty piece yields exactly one pair.

#![no_main]

use ferrest_core::QueryArgs;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let query = String::from_utf8_lossy(data);
    let args = QueryArgs::parse(&query);
    let pieces = query.split('&').filter(|p| !p.is_empty()).count();
    assert_eq!(args.len(), pieces);
});
