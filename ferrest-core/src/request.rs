//! Per-request context handed to handlers.
//!
//! URL components are composed from the configured [`Origin`], the `Host`
//! header, the raw path and the raw query string. The JSON body is parsed at
//! most once, on first access.

use std::cell::OnceCell;

use bytes::Bytes;
use http::{header, request::Parts, HeaderMap, HeaderValue, Method, Uri, Version};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::HandlerError;

/// Scheme and hostname the server is reachable under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// URL scheme used when composing `host_url`, e.g. `"http"`.
    pub scheme: String,
    /// Host used when the request has no `Host` header.
    pub hostname: String,
}

impl Origin {
    /// Creates an origin from a scheme and hostname.
    pub fn new(scheme: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            hostname: hostname.into(),
        }
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self::new("http", "localhost")
    }
}

/// Ordered query arguments. Duplicate keys are kept as separate entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryArgs(Vec<(String, String)>);

impl QueryArgs {
    /// Decodes an `application/x-www-form-urlencoded` query string.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        Self(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        )
    }

    /// First value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in query order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0.iter().filter(move |(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Whether `key` appears at least once.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All pairs in query order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying pairs.
    #[must_use]
    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a QueryArgs {
    type Item = &'a (String, String);
    type IntoIter = std::slice::Iter<'a, (String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A single inbound request as seen by handlers.
///
/// Owned by the task serving the request; never shared.
#[derive(Debug)]
pub struct RequestContext {
    id: Uuid,
    method: Method,
    version: (u8, u8),
    path: String,
    query_string: String,
    host: String,
    scheme: String,
    headers: HeaderMap,
    body: Bytes,
    args: QueryArgs,
    json: OnceCell<Result<Option<Value>, String>>,
}

impl RequestContext {
    /// Builds a context from a request head and its fully read body.
    #[must_use]
    pub fn from_parts(parts: Parts, body: Bytes, origin: &Origin) -> Self {
        let Parts { method, uri, version, headers, .. } = parts;
        Self::new(method, &uri, version, headers, body, origin)
    }

    /// Builds a context from the individual request components.
    #[must_use]
    pub fn new(
        method: Method,
        uri: &Uri,
        version: Version,
        headers: HeaderMap,
        body: Bytes,
        origin: &Origin,
    ) -> Self {
        let query_string = uri.query().unwrap_or_default().to_owned();
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(strip_port)
            .filter(|h| !h.is_empty())
            .unwrap_or(origin.hostname.as_str())
            .to_owned();

        Self {
            id: Uuid::new_v4(),
            method,
            version: version_pair(version),
            path: uri.path().to_owned(),
            args: QueryArgs::parse(&query_string),
            query_string,
            host,
            scheme: origin.scheme.clone(),
            headers,
            body,
            json: OnceCell::new(),
        }
    }

    /// Identifier for log correlation.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.id
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// HTTP version as `(major, minor)`.
    #[must_use]
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// Raw request path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string, empty if the request had none.
    #[must_use]
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Path followed by `?query` when a query string is present.
    #[must_use]
    pub fn path_qs(&self) -> String {
        with_query(self.path.clone(), &self.query_string)
    }

    /// `Host` header without its port, or the origin's hostname.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Scheme taken from the configured origin.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// `scheme://host`.
    #[must_use]
    pub fn host_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// `host_url` followed by the path.
    #[must_use]
    pub fn path_url(&self) -> String {
        let mut url = self.host_url();
        url.push_str(&self.path);
        url
    }

    /// `path_url` followed by `?query` when a query string is present.
    #[must_use]
    pub fn url(&self) -> String {
        with_query(self.path_url(), &self.query_string)
    }

    /// Decoded query arguments in request order.
    #[must_use]
    pub fn args(&self) -> &QueryArgs {
        &self.args
    }

    /// All request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value as text, if present and valid visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The media type of the body, lowercased, without parameters.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.headers.get(header::CONTENT_TYPE).and_then(media_type)
    }

    /// Raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The decoded JSON body.
    ///
    /// `None` when the body is empty or the content type is not JSON. The
    /// result, including a parse failure, is computed once and cached.
    /// The dispatcher calls this before invoking any handler, so a malformed
    /// JSON body is rejected with 400 even when the handler ignores it.
    ///
    /// # Errors
    /// Returns [`HandlerError::MalformedBody`] if the body declares a JSON
    /// content type but is not valid JSON.
    pub fn json_body(&self) -> Result<Option<&Value>, HandlerError> {
        let parsed = self.json.get_or_init(|| {
            if self.body.is_empty() || !self.content_type().is_some_and(|t| is_json(&t)) {
                return Ok(None);
            }
            serde_json::from_slice(&self.body).map(Some).map_err(|e| e.to_string())
        });
        match parsed {
            Ok(value) => Ok(value.as_ref()),
            Err(reason) => Err(HandlerError::MalformedBody(reason.clone())),
        }
    }
}

fn with_query(mut base: String, query: &str) -> String {
    if !query.is_empty() {
        base.push('?');
        base.push_str(query);
    }
    base
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literals keep their brackets.
    if let Some(end) = host.find(']') {
        return &host[..=end];
    }
    host.split_once(':').map_or(host, |(name, _)| name)
}

fn version_pair(version: Version) -> (u8, u8) {
    match version {
        Version::HTTP_09 => (0, 9),
        Version::HTTP_10 => (1, 0),
        Version::HTTP_2 => (2, 0),
        Version::HTTP_3 => (3, 0),
        _ => (1, 1),
    }
}

fn media_type(value: &HeaderValue) -> Option<String> {
    let text = value.to_str().ok()?;
    let essence = text.split(';').next().unwrap_or_default().trim();
    (!essence.is_empty()).then(|| essence.to_ascii_lowercase())
}

fn is_json(media_type: &str) -> bool {
    media_type == "application/json"
        || media_type
            .split_once('/')
            .is_some_and(|(_, subtype)| subtype.ends_with("+json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(method: Method, uri: &str, headers: &[(&str, &str)], body: &str) -> RequestContext {
        let mut builder = http::Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let req = match builder.body(()) {
            Ok(r) => r,
            Err(e) => panic!("failed to build request: {e}"),
        };
        let (parts, ()) = req.into_parts();
        RequestContext::from_parts(parts, Bytes::from(body.to_owned()), &Origin::default())
    }

    #[test]
    fn url_components_compose_from_host_path_and_query() {
        let ctx = context(Method::GET, "/post/123/2?a=1&b=2", &[("host", "localhost:8080")], "");
        assert_eq!(ctx.host(), "localhost");
        assert_eq!(ctx.host_url(), "http://localhost");
        assert_eq!(ctx.path(), "/post/123/2");
        assert_eq!(ctx.query_string(), "a=1&b=2");
        assert_eq!(ctx.path_qs(), "/post/123/2?a=1&b=2");
        assert_eq!(ctx.path_url(), "http://localhost/post/123/2");
        assert_eq!(ctx.url(), "http://localhost/post/123/2?a=1&b=2");
        assert_eq!(ctx.version(), (1, 1));
        assert_eq!(*ctx.method(), Method::GET);
    }

    #[test]
    fn url_without_query_has_no_question_mark() {
        let ctx = context(Method::GET, "/post/1", &[("host", "example.org")], "");
        assert_eq!(ctx.path_qs(), "/post/1");
        assert_eq!(ctx.url(), "http://example.org/post/1");
    }

    #[test]
    fn missing_host_header_falls_back_to_origin_hostname() {
        let ctx = context(Method::GET, "/", &[], "");
        assert_eq!(ctx.host(), "localhost");
    }

    #[test]
    fn scheme_comes_from_origin() {
        let req = match http::Request::builder().uri("/a?b=1").body(()) {
            Ok(r) => r,
            Err(e) => panic!("failed to build request: {e}"),
        };
        let (parts, ()) = req.into_parts();
        let ctx = RequestContext::from_parts(parts, Bytes::new(), &Origin::new("https", "api.internal"));
        assert_eq!(ctx.scheme(), "https");
        assert_eq!(ctx.host(), "api.internal");
        assert_eq!(ctx.url(), "https://api.internal/a?b=1");
    }

    #[test]
    fn header_lookup_is_case_insensitive_text() {
        let ctx = context(Method::GET, "/", &[("X-Trace", "abc-1"), ("host", "localhost")], "");
        assert_eq!(ctx.header("x-trace"), Some("abc-1"));
        assert_eq!(ctx.header("X-TRACE"), Some("abc-1"));
        assert_eq!(ctx.header("x-missing"), None);
        assert_eq!(ctx.headers().len(), 2);
    }

    #[test]
    fn ipv6_host_keeps_brackets() {
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
        assert_eq!(strip_port("[::1]"), "[::1]");
        assert_eq!(strip_port("example.org"), "example.org");
    }

    #[test]
    fn args_preserve_order_and_duplicates() {
        let args = QueryArgs::parse("b=2&a=1&b=3&c=hello+world&d=%2F");
        let pairs: Vec<_> = args.iter().collect();
        assert_eq!(
            pairs,
            vec![("b", "2"), ("a", "1"), ("b", "3"), ("c", "hello world"), ("d", "/")]
        );
        assert_eq!(args.get("b"), Some("2"), "lookup by key returns the first match");
        assert_eq!(args.get_all("b").collect::<Vec<_>>(), vec!["2", "3"]);
        assert!(!args.contains_key("z"));
    }

    #[test]
    fn args_serialize_as_list_of_pairs() {
        let args = QueryArgs::parse("a=1&b=2");
        let json = match serde_json::to_value(&args) {
            Ok(v) => v,
            Err(e) => panic!("serialization failed: {e}"),
        };
        assert_eq!(json, serde_json::json!([["a", "1"], ["b", "2"]]));
    }

    #[test]
    fn json_body_parses_declared_json() {
        let ctx = context(
            Method::POST,
            "/post/123",
            &[("content-type", "application/json; charset=utf-8")],
            r#"{"q":"val"}"#,
        );
        let body = ctx.json_body().ok().flatten().cloned();
        assert_eq!(body, Some(serde_json::json!({"q": "val"})));
    }

    #[test]
    fn json_body_accepts_structured_suffix() {
        let ctx = context(Method::POST, "/", &[("content-type", "application/problem+json")], "[1]");
        assert!(matches!(ctx.json_body(), Ok(Some(_))));
    }

    #[test]
    fn json_body_absent_without_body_or_json_content_type() {
        let get = context(Method::GET, "/post/123", &[], "");
        assert!(matches!(get.json_body(), Ok(None)), "GET without body must have no JSON body");

        let empty_post = context(Method::POST, "/", &[("content-type", "application/json")], "");
        assert!(matches!(empty_post.json_body(), Ok(None)), "empty body is absent, not {{}}");

        let form = context(Method::POST, "/", &[("content-type", "text/plain")], r#"{"q":1}"#);
        assert!(matches!(form.json_body(), Ok(None)), "non-JSON content type is not parsed");
    }

    #[test]
    fn malformed_json_body_is_reported_every_time() {
        let ctx = context(Method::POST, "/", &[("content-type", "application/json")], "{nope");
        assert!(matches!(ctx.json_body(), Err(HandlerError::MalformedBody(_))));
        assert!(
            matches!(ctx.json_body(), Err(HandlerError::MalformedBody(_))),
            "cached failure must be returned on the second access"
        );
    }

    #[test]
    fn version_pairs_cover_known_versions() {
        assert_eq!(version_pair(Version::HTTP_10), (1, 0));
        assert_eq!(version_pair(Version::HTTP_11), (1, 1));
        assert_eq!(version_pair(Version::HTTP_2), (2, 0));
    }

    proptest::proptest! {
        #[test]
        fn proptest_args_keep_every_pair_in_order(
            pairs in proptest::collection::vec(("[a-z]{1,4}", "[a-z0-9]{0,4}"), 0..8usize),
        ) {
            let query = pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            let args = QueryArgs::parse(&query);
            let decoded: Vec<(String, String)> = args.as_pairs().to_vec();
            proptest::prop_assert_eq!(decoded, pairs);
        }
    }
}
