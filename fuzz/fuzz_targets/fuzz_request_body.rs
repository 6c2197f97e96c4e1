//! Fuzz target: lazy JSON body decoding on a request context.
//!
//! Arbitrary bodies declared as JSON either parse or report a malformed body;
//! the cached result must be identical on the second access.

#![no_main]

use bytes::Bytes;
use ferrest_core::{Origin, RequestContext};
use http::{header, HeaderMap, HeaderValue, Method, Uri, Version};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let ctx = RequestContext::new(
        Method::POST,
        &Uri::from_static("/fuzz"),
        Version::HTTP_11,
        headers,
        Bytes::copy_from_slice(data),
        &Origin::default(),
    );
    let first = ctx.json_body().map(|v| v.cloned()).map_err(|e| e.to_string());
    let second = ctx.json_body().map(|v| v.cloned()).map_err(|e| e.to_string());
    assert_eq!(first, second);
});
