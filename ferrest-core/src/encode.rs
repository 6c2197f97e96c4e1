//! JSON text encoding for response bodies.
//!
//! Bodies use `", "` between items and `": "` between a key and its value,
//! on a single line: `{"success": true, "args": [["a", "1"]]}`.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

/// Single-line formatter with a space after every separator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Serializes `value` to spaced JSON bytes.
///
/// # Errors
/// Returns the serializer error if `value` cannot be represented as JSON
/// (e.g. a map with non-string keys).
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>, serde_json::Error>
where
    T: ?Sized + Serialize,
{
    let mut buf = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Serializes `value` to a spaced JSON string.
///
/// # Errors
/// See [`to_vec`].
pub fn to_string<T>(value: &T) -> Result<String, serde_json::Error>
where
    T: ?Sized + Serialize,
{
    let bytes = to_vec(value)?;
    // The serializer only ever emits UTF-8.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn encode(value: &serde_json::Value) -> String {
        match to_string(value) {
            Ok(s) => s,
            Err(e) => panic!("encoding failed: {e}"),
        }
    }

    #[test]
    fn object_uses_spaced_separators() {
        assert_eq!(encode(&json!({"success": true})), r#"{"success": true}"#);
    }

    #[test]
    fn keys_keep_construction_order() {
        let value = json!({"success": true, "args": [["a", "1"], ["b", "2"]]});
        assert_eq!(
            encode(&value),
            r#"{"success": true, "args": [["a", "1"], ["b", "2"]]}"#
        );
    }

    #[test]
    fn empty_containers_have_no_padding() {
        assert_eq!(encode(&json!({})), "{}");
        assert_eq!(encode(&json!([])), "[]");
        assert_eq!(encode(&json!({"a": [], "b": {}})), r#"{"a": [], "b": {}}"#);
    }

    #[test]
    fn scalars_encode_like_compact_json() {
        assert_eq!(encode(&json!(null)), "null");
        assert_eq!(encode(&json!(false)), "false");
        assert_eq!(encode(&json!(-7)), "-7");
        assert_eq!(encode(&json!("a\"b")), r#""a\"b""#);
    }

    #[test]
    fn output_parses_back_to_same_value() {
        let value = json!({"n": 1.5, "nested": {"x": [1, 2, {"y": null}]}});
        let text = encode(&value);
        let back: serde_json::Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => panic!("invalid JSON {text}: {e}"),
        };
        assert_eq!(back, value);
    }
}
