//! `encode_document(doc, check_keys) -> bytes` (§4.1).

use super::buffer::Buffer;
use super::document::Document;
use super::key::{validate_key, validate_no_embedded_nul};
use super::value::{Binary, DbRef, JsCodeWithScope, Regex, Value, BINARY_SUBTYPE_OLD};
use crate::error::{Error, Result};

/// The recursion cap from §9: turns pathological nesting into a clean `InvalidDocument` instead
/// of a native stack overflow.
pub const MAX_BSON_DEPTH: u32 = 100;

/// Encoder knobs that aren't fixed wire rules: `check_keys` and the recursion cap.
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    /// When set, reject keys starting with `$` or containing `.` (§4.1).
    pub check_keys: bool,
    /// Maximum document/array nesting depth before `InvalidDocument` ("nesting too deep").
    pub max_depth: u32,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            check_keys: false,
            max_depth: MAX_BSON_DEPTH,
        }
    }
}

/// Encodes `doc` to its BSON byte representation. `_id`, if present, is written first
/// regardless of insertion order (§4.1, §8 invariant 4).
pub fn encode_document(doc: &Document, check_keys: bool) -> Result<Vec<u8>> {
    encode_document_with(
        doc,
        EncodeOptions {
            check_keys,
            ..Default::default()
        },
    )
}

/// Like [`encode_document`], with full control over [`EncodeOptions`].
pub fn encode_document_with(doc: &Document, opts: EncodeOptions) -> Result<Vec<u8>> {
    tracing::trace!(check_keys = opts.check_keys, "encoding top-level document");
    let mut buf = Buffer::new();
    write_document_body(&mut buf, doc, true, &opts, 0)?;
    Ok(buf.into_vec())
}

/// Chooses the narrowest BSON integer width that represents `n` losslessly, raising
/// [`Error::Overflow`] if it exceeds signed 64-bit range (§4.1 integer-width-selection, §8
/// invariant 6). Useful for callers building a `Value` from an arbitrary-precision source; the
/// typed `Value::Int32`/`Value::Int64` constructors make this unreachable otherwise.
pub fn checked_int_value(n: i128) -> Result<Value> {
    if let Ok(n32) = i32::try_from(n) {
        Ok(Value::Int32(n32))
    } else if let Ok(n64) = i64::try_from(n) {
        Ok(Value::Int64(n64))
    } else {
        tracing::debug!(n = %n, "integer exceeds signed 64-bit range");
        Err(Error::Overflow)
    }
}

fn write_document_body(
    buf: &mut Buffer,
    doc: &Document,
    id_first: bool,
    opts: &EncodeOptions,
    depth: u32,
) -> Result<()> {
    if depth > opts.max_depth {
        tracing::debug!(depth, max_depth = opts.max_depth, "nesting too deep");
        return Err(Error::invalid_document("nesting too deep"));
    }
    let length_offset = buf.save_space(4)?;
    let elements: Box<dyn Iterator<Item = (&String, &Value)> + '_> = if id_first {
        Box::new(doc.iter_id_first())
    } else {
        Box::new(doc.iter())
    };
    for (key, value) in elements {
        validate_key(key, opts.check_keys)?;
        write_element(buf, key, value, opts, depth)?;
    }
    buf.write_u8(0)?;
    let total_len = (buf.position() - length_offset) as i32;
    buf.patch_i32_le(length_offset, total_len);
    Ok(())
}

fn write_array_body(buf: &mut Buffer, items: &[Value], opts: &EncodeOptions, depth: u32) -> Result<()> {
    if depth > opts.max_depth {
        tracing::debug!(depth, max_depth = opts.max_depth, "nesting too deep");
        return Err(Error::invalid_document("nesting too deep"));
    }
    let length_offset = buf.save_space(4)?;
    for (index, value) in items.iter().enumerate() {
        // Array keys are positional decimal strings, not subject to check_keys (§4.1).
        write_element(buf, &index.to_string(), value, opts, depth)?;
    }
    buf.write_u8(0)?;
    let total_len = (buf.position() - length_offset) as i32;
    buf.patch_i32_le(length_offset, total_len);
    Ok(())
}

fn write_element(buf: &mut Buffer, key: &str, value: &Value, opts: &EncodeOptions, depth: u32) -> Result<()> {
    buf.write_u8(type_tag(value))?;
    write_cstring(buf, key)?;
    write_value_payload(buf, value, opts, depth)
}

fn type_tag(value: &Value) -> u8 {
    match value {
        Value::Double(_) => 0x01,
        Value::String(_) => 0x02,
        Value::Document(_) | Value::DbRef(_) => 0x03,
        Value::Array(_) => 0x04,
        Value::Binary(_) => 0x05,
        Value::ObjectId(_) => 0x07,
        Value::Bool(_) => 0x08,
        Value::DateTime(_) => 0x09,
        Value::Null => 0x0A,
        Value::Regex(_) => 0x0B,
        Value::JsCode(_) => 0x0D,
        Value::JsCodeWithScope(_) => 0x0F,
        Value::Int32(_) => 0x10,
        Value::Timestamp(_) => 0x11,
        Value::Int64(_) => 0x12,
        Value::MinKey => 0xFF,
        Value::MaxKey => 0x7F,
    }
}

fn write_value_payload(buf: &mut Buffer, value: &Value, opts: &EncodeOptions, depth: u32) -> Result<()> {
    match value {
        Value::Double(d) => buf.write(&d.to_le_bytes()),
        Value::String(s) => write_bson_string(buf, s),
        Value::Document(d) => write_document_body(buf, d, false, opts, depth + 1),
        Value::Array(items) => write_array_body(buf, items, opts, depth + 1),
        Value::Binary(b) => write_binary(buf, b),
        Value::ObjectId(oid) => buf.write(&oid.bytes()),
        Value::Bool(b) => buf.write_u8(u8::from(*b)),
        Value::DateTime(dt) => buf.write(&dt.to_millis().to_le_bytes()),
        Value::Null => Ok(()),
        Value::Regex(r) => write_regex(buf, r),
        Value::DbRef(r) => write_dbref(buf, r, opts, depth),
        Value::JsCode(s) => write_bson_string(buf, s),
        Value::JsCodeWithScope(c) => write_js_code_with_scope(buf, c, opts, depth),
        Value::Int32(i) => buf.write(&i.to_le_bytes()),
        Value::Timestamp(t) => {
            buf.write(&t.increment.to_le_bytes())?;
            buf.write(&t.time.to_le_bytes())
        }
        Value::Int64(i) => buf.write(&i.to_le_bytes()),
        Value::MinKey | Value::MaxKey => Ok(()),
    }
}

fn write_binary(buf: &mut Buffer, b: &Binary) -> Result<()> {
    if b.subtype == BINARY_SUBTYPE_OLD {
        let inner_len = b.bytes.len() as i32;
        let outer_len = inner_len + 4;
        buf.write(&outer_len.to_le_bytes())?;
        buf.write_u8(b.subtype)?;
        buf.write(&inner_len.to_le_bytes())?;
        buf.write(&b.bytes)
    } else {
        let outer_len = b.bytes.len() as i32;
        buf.write(&outer_len.to_le_bytes())?;
        buf.write_u8(b.subtype)?;
        buf.write(&b.bytes)
    }
}

fn write_regex(buf: &mut Buffer, r: &Regex) -> Result<()> {
    write_cstring(buf, &r.pattern)?;
    write_cstring(buf, &r.emitted_flags())
}

fn write_dbref(buf: &mut Buffer, r: &DbRef, opts: &EncodeOptions, depth: u32) -> Result<()> {
    // $ref/$id/$db are the DBRef convention itself, not a check_keys violation, so this
    // sub-document is always encoded with check_keys disabled regardless of the caller's opts.
    let mut doc = Document::new();
    doc.insert("$ref", r.collection.clone());
    doc.insert("$id", (*r.id).clone());
    if let Some(db) = &r.database {
        doc.insert("$db", db.clone());
    }
    for (k, v) in r.extra.iter() {
        doc.insert(k.clone(), v.clone());
    }
    let inner_opts = EncodeOptions {
        check_keys: false,
        max_depth: opts.max_depth,
    };
    write_document_body(buf, &doc, false, &inner_opts, depth + 1)
}

fn write_js_code_with_scope(
    buf: &mut Buffer,
    c: &JsCodeWithScope,
    opts: &EncodeOptions,
    depth: u32,
) -> Result<()> {
    let outer_offset = buf.save_space(4)?;
    write_bson_string(buf, &c.code)?;
    write_document_body(buf, &c.scope, false, opts, depth + 1)?;
    let total = (buf.position() - outer_offset) as i32;
    buf.patch_i32_le(outer_offset, total);
    Ok(())
}

fn write_bson_string(buf: &mut Buffer, s: &str) -> Result<()> {
    let len = s.len() as i32 + 1;
    buf.write(&len.to_le_bytes())?;
    buf.write(s.as_bytes())?;
    buf.write_u8(0)
}

fn write_cstring(buf: &mut Buffer, s: &str) -> Result<()> {
    validate_no_embedded_nul(s, "a cstring")?;
    buf.write(s.as_bytes())?;
    buf.write_u8(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hex_bytes(s: &str) -> Vec<u8> {
        hex::decode(s.replace(' ', "")).unwrap()
    }

    #[test]
    fn empty_document() {
        crate::test_support::init_tracing();
        let doc = Document::new();
        assert_eq!(encode_document(&doc, false).unwrap(), hex_bytes("05 00 00 00 00"));
    }

    #[test]
    fn hello_world_string() {
        crate::test_support::init_tracing();
        let mut doc = Document::new();
        doc.insert("hello", "world");
        assert_eq!(
            encode_document(&doc, false).unwrap(),
            hex_bytes("16 00 00 00 02 68 65 6C 6C 6F 00 06 00 00 00 77 6F 72 6C 64 00 00")
        );
    }

    #[test]
    fn int32_promotion() {
        crate::test_support::init_tracing();
        let mut doc = Document::new();
        doc.insert("x", Value::from_i64_autosize(1));
        assert_eq!(
            encode_document(&doc, false).unwrap(),
            hex_bytes("0C 00 00 00 10 78 00 01 00 00 00 00")
        );
    }

    #[test]
    fn forced_int64() {
        crate::test_support::init_tracing();
        let mut doc = Document::new();
        doc.insert("x", Value::from_i64_autosize(2147483648));
        assert_eq!(
            encode_document(&doc, false).unwrap(),
            hex_bytes("10 00 00 00 12 78 00 00 00 00 80 00 00 00 00 00")
        );
    }

    #[test]
    fn bool_and_null() {
        crate::test_support::init_tracing();
        let mut doc = Document::new();
        doc.insert("b", true);
        doc.insert("n", Value::Null);
        assert_eq!(
            encode_document(&doc, false).unwrap(),
            hex_bytes("0C 00 00 00 08 62 00 01 0A 6E 00 00")
        );
    }

    #[test]
    fn overflow_beyond_i64() {
        crate::test_support::init_tracing();
        assert!(matches!(checked_int_value(i128::from(i64::MAX) + 1), Err(Error::Overflow)));
    }

    #[test]
    fn id_is_promoted_to_front_at_top_level() {
        crate::test_support::init_tracing();
        let mut doc = Document::new();
        doc.insert("a", 1i32);
        doc.insert("_id", 2i32);
        doc.insert("b", 3i32);
        let bytes = encode_document(&doc, false).unwrap();
        // type byte 0x10, key "_id\0" starts right after the 4-byte length prefix.
        assert_eq!(&bytes[4..9], b"\x10_id\0");
    }

    #[test]
    fn nested_document_does_not_get_id_promoted() {
        crate::test_support::init_tracing();
        let mut inner = Document::new();
        inner.insert("a", 1i32);
        inner.insert("_id", 2i32);
        let mut outer = Document::new();
        outer.insert("inner", inner);
        let bytes = encode_document(&outer, false).unwrap();
        // The nested document's first key should still be "a", not "_id".
        let needle = b"\x10a\0";
        let haystack_after_inner_header = &bytes[bytes.len() - 20..];
        assert!(haystack_after_inner_header
            .windows(needle.len())
            .any(|w| w == needle));
    }

    #[test]
    fn check_keys_rejects_dollar_and_dot() {
        crate::test_support::init_tracing();
        let mut doc = Document::new();
        doc.insert("$bad", 1i32);
        assert!(encode_document(&doc, true).is_err());

        let mut doc = Document::new();
        doc.insert("a.b", 1i32);
        assert!(encode_document(&doc, true).is_err());
    }

    #[test]
    fn check_keys_allows_dbref_dollar_keys() {
        crate::test_support::init_tracing();
        let mut doc = Document::new();
        doc.insert(
            "ref",
            Value::DbRef(DbRef {
                collection: "things".into(),
                id: Box::new(Value::Int32(1)),
                database: None,
                extra: Document::new(),
            }),
        );
        assert!(encode_document(&doc, true).is_ok());
    }

    #[test]
    fn array_keys_are_positional() {
        crate::test_support::init_tracing();
        let mut doc = Document::new();
        doc.insert("a", vec![Value::Int32(10), Value::Int32(20)]);
        let bytes = encode_document(&doc, false).unwrap();
        assert!(bytes.windows(2).any(|w| w == b"0\0"));
        assert!(bytes.windows(2).any(|w| w == b"1\0"));
    }

    #[test]
    fn binary_subtype_two_has_inner_length() {
        crate::test_support::init_tracing();
        let mut doc = Document::new();
        doc.insert(
            "b",
            Value::Binary(Binary {
                subtype: BINARY_SUBTYPE_OLD,
                bytes: vec![1, 2, 3, 4],
            }),
        );
        let bytes = encode_document(&doc, false).unwrap();
        // type(1) + key "b\0"(2) follow the 4-byte length prefix, so the outer binary length
        // starts at offset 7; subtype follows at 11, inner length at 12..16.
        let outer_len = i32::from_le_bytes(bytes[7..11].try_into().unwrap());
        assert_eq!(outer_len, 8);
        let inner_len = i32::from_le_bytes(bytes[12..16].try_into().unwrap());
        assert_eq!(inner_len, 4);
    }

    #[test]
    fn excessive_nesting_is_rejected() {
        crate::test_support::init_tracing();
        let mut doc = Document::new();
        for _ in 0..=MAX_BSON_DEPTH + 1 {
            let mut next = Document::new();
            next.insert("d", doc);
            doc = next;
        }
        assert!(matches!(
            encode_document(&doc, false),
            Err(Error::InvalidDocument { .. })
        ));
    }

    #[test]
    fn key_with_embedded_nul_is_rejected() {
        crate::test_support::init_tracing();
        let mut doc = Document::new();
        doc.insert("a\0b", 1i32);
        assert!(encode_document(&doc, false).is_err());
    }
}
