//! Route template compilation and path matching.
//!
//! A template is a `/`-separated list of segments. A segment that is exactly
//! `{name}` or `{name:type}` captures one non-empty path segment; every other
//! segment must match verbatim. Matching never spans segments: a template and
//! a path match only when they have the same number of segments.

use std::fmt;

use serde::Serialize;

use crate::error::RouteError;

/// Declared type of a path parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ParamType {
    /// Passed through as text (after percent-decoding).
    #[default]
    Str,
    /// Parsed as a base-10 signed 64-bit integer.
    Int,
}

impl ParamType {
    /// Looks up a type by the name used in `{name:type}` placeholders.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "str" | "string" => Some(Self::Str),
            "int" | "integer" => Some(Self::Int),
            _ => None,
        }
    }

    /// Canonical placeholder name of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
        }
    }

    /// Converts a decoded segment, or returns `None` if it does not fit the type.
    #[must_use]
    pub fn coerce(self, decoded: &str) -> Option<PathValue> {
        match self {
            Self::Str => Some(PathValue::Str(decoded.to_owned())),
            Self::Int => decoded.parse::<i64>().ok().map(PathValue::Int),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coerced path parameter value.
///
/// Serializes as a bare JSON string or number, so handlers can echo
/// parameters straight into their response body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathValue {
    /// A `str` parameter, percent-decoded.
    Str(String),
    /// An `int` parameter.
    Int(i64),
}

impl PathValue {
    /// Returns the text if this is a string parameter.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Int(_) => None,
        }
    }

    /// Returns the integer if this is an integer parameter.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(_) => None,
        }
    }
}

impl fmt::Display for PathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
        }
    }
}

/// One extracted parameter of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParam {
    /// Parameter name from the template.
    pub name: String,
    /// The segment exactly as it appeared in the request path.
    pub raw: String,
    /// The decoded and coerced value.
    pub value: PathValue,
}

/// One compiled template segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the path segment verbatim.
    Literal(String),
    /// Captures any non-empty path segment. `ty` is `None` when no type was declared.
    Param { name: String, ty: Option<ParamType> },
}

impl Segment {
    fn effective_type(ty: Option<ParamType>) -> ParamType {
        ty.unwrap_or_default()
    }
}

/// A compiled route template such as `/post/{id}/2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Compiles a template string.
    ///
    /// # Errors
    /// Returns [`RouteError::InvalidRouteSyntax`] if the template does not start
    /// with `/`, a placeholder is malformed (unbalanced braces, empty or invalid
    /// name, unknown type, braces not spanning a whole segment), or a parameter
    /// name repeats.
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        let Some(rest) = template.strip_prefix('/') else {
            return Err(RouteError::syntax(template, "template must start with '/'"));
        };

        let mut segments = Vec::new();
        for raw in rest.split('/') {
            let segment = parse_segment(template, raw)?;
            if let Segment::Param { name, .. } = &segment {
                let duplicate = segments
                    .iter()
                    .any(|s| matches!(s, Segment::Param { name: seen, .. } if seen == name));
                if duplicate {
                    return Err(RouteError::syntax(
                        template,
                        format!("duplicate parameter name '{name}'"),
                    ));
                }
            }
            segments.push(segment);
        }

        Ok(Self { source: template.to_owned(), segments })
    }

    /// The template text as registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Compiled segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parameter names in template order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Effective type of a parameter, or `None` if the template has no such parameter.
    #[must_use]
    pub fn param_type(&self, name: &str) -> Option<ParamType> {
        self.segments.iter().find_map(|s| match s {
            Segment::Param { name: n, ty } if n == name => Some(Segment::effective_type(*ty)),
            _ => None,
        })
    }

    /// Declares the type of an existing parameter.
    ///
    /// # Errors
    /// Returns [`RouteError::InvalidRouteSyntax`] if the parameter does not exist
    /// or already carries a different inline type.
    pub fn with_param_type(mut self, name: &str, declared: ParamType) -> Result<Self, RouteError> {
        let slot = self.segments.iter_mut().find_map(|s| match s {
            Segment::Param { name: n, ty } if n == name => Some(ty),
            _ => None,
        });
        let Some(ty) = slot else {
            return Err(RouteError::syntax(
                &self.source,
                format!("handler declares parameter '{name}' which the template does not contain"),
            ));
        };
        if let Some(existing) = *ty {
            if existing != declared {
                return Err(RouteError::syntax(
                    &self.source,
                    format!("parameter '{name}' declared as {declared} but template says {existing}"),
                ));
            }
        }
        *ty = Some(declared);
        Ok(self)
    }

    /// Whether two templates match exactly the same set of paths.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|pair| match pair {
                (Segment::Literal(a), Segment::Literal(b)) => a == b,
                (Segment::Param { ty: a, .. }, Segment::Param { ty: b, .. }) => {
                    Segment::effective_type(*a) == Segment::effective_type(*b)
                }
                _ => false,
            })
    }

    /// Matches a request path, returning the coerced parameters on success.
    ///
    /// A parameter segment that is empty, not valid percent-encoded UTF-8, or
    /// does not fit its declared type makes the whole template a non-match.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Vec<PathParam>> {
        let rest = path.strip_prefix('/')?;
        let mut candidate = rest.split('/');
        let mut params = Vec::new();

        for segment in &self.segments {
            let raw = candidate.next()?;
            match segment {
                Segment::Literal(lit) => {
                    if lit != raw {
                        return None;
                    }
                }
                Segment::Param { name, ty } => {
                    if raw.is_empty() {
                        return None;
                    }
                    let decoded = urlencoding::decode(raw).ok()?;
                    let value = Segment::effective_type(*ty).coerce(&decoded)?;
                    params.push(PathParam {
                        name: name.clone(),
                        raw: raw.to_owned(),
                        value,
                    });
                }
            }
        }

        if candidate.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_segment(template: &str, raw: &str) -> Result<Segment, RouteError> {
    let opens = raw.matches('{').count();
    let closes = raw.matches('}').count();

    if opens == 0 && closes == 0 {
        return Ok(Segment::Literal(raw.to_owned()));
    }
    if opens != closes {
        return Err(RouteError::syntax(template, format!("unbalanced braces in segment '{raw}'")));
    }

    let inner = raw
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .filter(|s| !s.contains(['{', '}']))
        .ok_or_else(|| {
            RouteError::syntax(
                template,
                format!("placeholder must span the whole segment, got '{raw}'"),
            )
        })?;

    let (name, ty) = match inner.split_once(':') {
        Some((name, ty_name)) => {
            let ty = ParamType::from_name(ty_name).ok_or_else(|| {
                RouteError::syntax(template, format!("unknown parameter type '{ty_name}'"))
            })?;
            (name, Some(ty))
        }
        None => (inner, None),
    };

    if name.is_empty() {
        return Err(RouteError::syntax(template, "empty parameter name"));
    }
    if !is_identifier(name) {
        return Err(RouteError::syntax(template, format!("invalid parameter name '{name}'")));
    }

    Ok(Segment::Param { name: name.to_owned(), ty })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(template: &str) -> RouteTemplate {
        match RouteTemplate::compile(template) {
            Ok(t) => t,
            Err(e) => panic!("template {template} should compile: {e}"),
        }
    }

    #[test]
    fn path_values_serialize_untagged() {
        let echoed = serde_json::json!({
            "id": PathValue::Int(7),
            "slug": PathValue::Str("hello world".to_owned()),
        });
        assert_eq!(echoed, serde_json::json!({"id": 7, "slug": "hello world"}));
    }

    #[test]
    fn compile_splits_literals_and_params() {
        let t = compile("/post/{id}/2");
        assert_eq!(
            t.segments(),
            &[
                Segment::Literal("post".to_owned()),
                Segment::Param { name: "id".to_owned(), ty: None },
                Segment::Literal("2".to_owned()),
            ]
        );
        assert_eq!(t.param_names().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(t.param_type("id"), Some(ParamType::Str));
    }

    #[test]
    fn compile_reads_inline_type() {
        let t = compile("/user/{uid:int}");
        assert_eq!(t.param_type("uid"), Some(ParamType::Int));
    }

    #[test]
    fn compile_rejects_malformed_placeholders() {
        for bad in [
            "post/{id}",
            "/post/{id",
            "/post/id}",
            "/post/{}",
            "/post/{:int}",
            "/post/{1d}",
            "/post/{id:float}",
            "/post/x{id}",
            "/post/{a}{b}",
            "/post/{{id}}",
            "/post/{id}/{id}",
        ] {
            assert!(
                matches!(RouteTemplate::compile(bad), Err(RouteError::InvalidRouteSyntax { .. })),
                "template {bad} must be rejected"
            );
        }
    }

    #[test]
    fn match_extracts_string_param_unconverted() {
        let t = compile("/post/{id}");
        let params = t.match_path("/post/123").unwrap_or_default();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "id");
        assert_eq!(params[0].raw, "123");
        assert_eq!(params[0].value, PathValue::Str("123".to_owned()));
    }

    #[test]
    fn match_coerces_int_param() {
        let t = compile("/post/{id:int}");
        let params = t.match_path("/post/123").unwrap_or_default();
        assert_eq!(params[0].value, PathValue::Int(123));
        assert!(t.match_path("/post/abc").is_none(), "non-numeric segment must not match");
        assert!(t.match_path("/post/12.5").is_none());
        assert!(t.match_path("/post/99999999999999999999").is_none(), "overflow must not match");
    }

    #[test]
    fn match_requires_equal_segment_count() {
        let t = compile("/post/{id}");
        assert!(t.match_path("/post/123/2").is_none());
        assert!(t.match_path("/post").is_none());
        assert!(t.match_path("/post/123/").is_none(), "trailing slash adds a segment");
    }

    #[test]
    fn match_rejects_empty_param_segment() {
        let t = compile("/post/{id}/2");
        assert!(t.match_path("/post//2").is_none());
    }

    #[test]
    fn match_compares_literals_verbatim() {
        let t = compile("/post/{id}/2");
        assert!(t.match_path("/Post/1/2").is_none());
        assert!(t.match_path("/post/1/3").is_none());
        assert!(t.match_path("/post/1/2").is_some());
    }

    #[test]
    fn match_percent_decodes_param_values() {
        let t = compile("/tag/{name}");
        let params = t.match_path("/tag/hello%20world").unwrap_or_default();
        assert_eq!(params[0].value, PathValue::Str("hello world".to_owned()));
        assert_eq!(params[0].raw, "hello%20world");
    }

    #[test]
    fn root_template_matches_only_root() {
        let t = compile("/");
        assert!(t.match_path("/").is_some());
        assert!(t.match_path("/x").is_none());
        assert!(t.match_path("").is_none());
    }

    #[test]
    fn with_param_type_rejects_unknown_and_conflicting() {
        let t = compile("/post/{id:str}");
        assert!(t.clone().with_param_type("id", ParamType::Str).is_ok());
        assert!(t.clone().with_param_type("id", ParamType::Int).is_err());
        assert!(t.with_param_type("other", ParamType::Int).is_err());
    }

    #[test]
    fn same_shape_ignores_param_names() {
        let a = compile("/post/{id}");
        let b = compile("/post/{slug}");
        let c = compile("/post/{id:int}");
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
        assert!(!a.same_shape(&compile("/post/{id}/2")));
    }

    proptest::proptest! {
        #[test]
        fn proptest_int_param_never_sees_non_numeric_text(segment in "[^/]{1,12}") {
            let t = compile("/post/{id:int}");
            let path = format!("/post/{}", urlencoding::encode(&segment));
            match t.match_path(&path) {
                Some(params) => {
                    proptest::prop_assert!(segment.parse::<i64>().is_ok());
                    proptest::prop_assert_eq!(params[0].value.as_int(), segment.parse::<i64>().ok());
                }
                None => proptest::prop_assert!(segment.parse::<i64>().is_err()),
            }
        }

        #[test]
        fn proptest_int_param_round_trips_any_i64(n in proptest::prelude::any::<i64>()) {
            let t = compile("/post/{id:int}");
            let params = t.match_path(&format!("/post/{n}"));
            proptest::prop_assert_eq!(params.map(|p| p[0].value.clone()), Some(PathValue::Int(n)));
        }
    }
}
