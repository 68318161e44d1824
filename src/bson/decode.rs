//! `decode_one`/`decode_all` (§4.2): parse BSON bytes back into [`Document`]s.

use super::document::{Document, FromDocument};
use super::key::validate_utf8;
use super::value::{Binary, DbRef, JsCodeWithScope, Regex, Timestamp, UtcDateTime, Value, BINARY_SUBTYPE_OLD, BINARY_SUBTYPE_UUID};
use crate::bson::document::Document as BsonDocument;
use crate::error::{Error, Result};

/// The recursion cap from §9, mirrored on the decode side so a deeply-nested malformed input
/// fails cleanly with `InvalidBson` instead of overflowing the native stack.
pub const MAX_BSON_DEPTH: u32 = 100;

/// Decoder knobs: whether `DateTime` values decode as timezone-aware or naive, and the
/// recursion cap.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// See [`UtcDateTime`].
    pub tz_aware: bool,
    /// Maximum document/array nesting depth before `InvalidBson`.
    pub max_depth: u32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            tz_aware: true,
            max_depth: MAX_BSON_DEPTH,
        }
    }
}

/// Parses exactly one top-level document from the front of `bytes`, returning it along with the
/// unread tail.
pub fn decode_one(bytes: &[u8], tz_aware: bool) -> Result<(Document, &[u8])> {
    decode_one_into::<Document>(bytes, tz_aware)
}

/// Generic form of [`decode_one`], standing in for the source's `as_mapping_factory` — the
/// output container is chosen by type (`D: FromDocument`) rather than a runtime factory
/// callback. Parsing always happens into this crate's own `Document` first (nested DBRef
/// detection depends on it), then the pairs are transplanted into `D`.
pub fn decode_one_into<D: FromDocument>(bytes: &[u8], tz_aware: bool) -> Result<(D, &[u8])> {
    let opts = DecodeOptions {
        tz_aware,
        ..Default::default()
    };
    let (doc, consumed) = decode_document_bytes(bytes, &opts, 0)?;
    tracing::trace!(consumed, "decoded one document");
    let mut out = D::default();
    for (key, value) in doc {
        out.insert_pair(key, value);
    }
    Ok((out, &bytes[consumed..]))
}

/// Parses a concatenation of documents until the input is exhausted.
pub fn decode_all(bytes: &[u8], tz_aware: bool) -> Result<Vec<Document>> {
    decode_all_into::<Document>(bytes, tz_aware)
}

/// Generic form of [`decode_all`]; see [`decode_one_into`].
pub fn decode_all_into<D: FromDocument>(bytes: &[u8], tz_aware: bool) -> Result<Vec<D>> {
    let mut docs = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let (doc, tail) = decode_one_into::<D>(rest, tz_aware)?;
        docs.push(doc);
        rest = tail;
    }
    Ok(docs)
}

/// Parses one document's bytes at the front of `bytes`. Returns the document and the number of
/// bytes consumed (the declared length, including the 4-byte size prefix and trailing NUL).
fn decode_document_bytes(bytes: &[u8], opts: &DecodeOptions, depth: u32) -> Result<(BsonDocument, usize)> {
    if depth > opts.max_depth {
        tracing::debug!(depth, max_depth = opts.max_depth, "nesting too deep");
        return Err(Error::invalid_bson("nesting too deep"));
    }
    if bytes.len() < 5 {
        tracing::debug!(len = bytes.len(), "input too short to contain a BSON document");
        return Err(Error::invalid_bson("input too short to contain a BSON document"));
    }
    let declared_size = i32::from_le_bytes(bytes[0..4].try_into().unwrap());
    if declared_size < 5 {
        tracing::debug!(declared_size, "declared size is too small");
        return Err(Error::invalid_bson("declared size is too small"));
    }
    let declared_size = declared_size as usize;
    if declared_size > bytes.len() {
        tracing::debug!(declared_size, available = bytes.len(), "objsize too large");
        return Err(Error::invalid_bson("objsize too large"));
    }
    if bytes[declared_size - 1] != 0 {
        tracing::debug!(offset = declared_size - 1, "bad eoo: document does not end in a NUL byte");
        return Err(Error::invalid_bson("bad eoo: document does not end in a NUL byte"));
    }

    let mut offset = 4usize;
    let body_end = declared_size - 1;
    let mut doc = BsonDocument::new();
    while offset < body_end {
        let type_byte = bytes[offset];
        offset += 1;
        let (key, key_len) = read_cstring(&bytes[offset..body_end])?;
        offset += key_len;
        if offset > body_end {
            tracing::debug!(offset, "element key overran declared document size");
            return Err(Error::invalid_bson("element key overran declared document size"));
        }
        let (value, consumed) = read_value(type_byte, &bytes[offset..body_end], opts, depth)?;
        offset += consumed;
        if offset > body_end {
            tracing::debug!(type_byte, offset, "element payload overran declared document size");
            return Err(Error::invalid_bson("element payload overran declared document size"));
        }
        doc.insert(key, value);
    }
    if offset != body_end {
        tracing::debug!(offset, body_end, "trailing bytes before document terminator");
        return Err(Error::invalid_bson("trailing bytes before document terminator"));
    }

    Ok((doc, declared_size))
}

/// If `doc`'s first key is `"$ref"` with a string value and it also has an `"$id"`, removes
/// `$ref`/`$id`/`$db` from it and returns the constructed `DbRef` with the remaining fields as
/// `extra`. Returns `None` (leaving `doc` untouched) otherwise, in which case the caller falls
/// back to decoding it as an ordinary sub-document. Only called from the type-0x03 dispatch
/// ([`decode_document_value`]); the top level and `JSCodeWithScope` scopes always decode as
/// plain documents (§4.2, §9).
fn try_build_dbref(doc: &mut BsonDocument) -> Option<DbRef> {
    match doc.iter().next() {
        Some((k, Value::String(_))) if k == "$ref" => {}
        _ => return None,
    }
    if !doc.contains_key("$id") {
        return None;
    }
    let collection = match doc.remove("$ref") {
        Some(Value::String(s)) => s,
        _ => unreachable!("checked above"),
    };
    let id = Box::new(doc.remove("$id").expect("checked above"));
    let database = match doc.remove("$db") {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            // Not a string $db: put it back as an extra field rather than discarding data.
            doc.insert("$db", other);
            None
        }
        None => None,
    };
    Some(DbRef {
        collection,
        id,
        database,
        extra: std::mem::take(doc),
    })
}

fn decode_document_value(rest: &[u8], opts: &DecodeOptions, depth: u32) -> Result<(Value, usize)> {
    let (mut doc, consumed) = decode_document_bytes(rest, opts, depth + 1)?;
    // DBRef detection (§4.2, §9): only recognized when "$ref" is literally the first decoded
    // key of a *sub-document*, matching the source's behavior exactly rather than scanning for
    // $ref anywhere, and never applied at the top level.
    if let Some(dbref) = try_build_dbref(&mut doc) {
        return Ok((Value::DbRef(dbref), consumed));
    }
    Ok((Value::Document(doc), consumed))
}

fn read_array_bytes(bytes: &[u8], opts: &DecodeOptions, depth: u32) -> Result<(Vec<Value>, usize)> {
    let (doc, consumed) = decode_document_bytes(bytes, opts, depth)?;
    // Array element keys are just positional index strings; only the insertion order matters.
    Ok((doc.into_iter().map(|(_, v)| v).collect(), consumed))
}

fn read_value(type_byte: u8, rest: &[u8], opts: &DecodeOptions, depth: u32) -> Result<(Value, usize)> {
    match type_byte {
        0x01 => {
            require_len(rest, 8, "double")?;
            Ok((Value::Double(f64::from_le_bytes(rest[0..8].try_into().unwrap())), 8))
        }
        0x02 => {
            let (s, consumed) = read_bson_string(rest)?;
            Ok((Value::String(s), consumed))
        }
        0x03 => decode_document_value(rest, opts, depth),
        0x04 => {
            let (items, consumed) = read_array_bytes(rest, opts, depth + 1)?;
            Ok((Value::Array(items), consumed))
        }
        0x05 => read_binary(rest),
        0x06 => Ok((Value::Null, 0)), // legacy Undefined -> Null
        0x07 => {
            require_len(rest, 12, "objectId")?;
            let mut id = [0u8; 12];
            id.copy_from_slice(&rest[0..12]);
            Ok((Value::ObjectId(super::value::ObjectId::from_bytes(id)), 12))
        }
        0x08 => {
            require_len(rest, 1, "bool")?;
            Ok((Value::Bool(rest[0] != 0), 1))
        }
        0x09 => {
            require_len(rest, 8, "dateTime")?;
            let millis = i64::from_le_bytes(rest[0..8].try_into().unwrap());
            Ok((Value::DateTime(UtcDateTime::from_millis(millis, opts.tz_aware)), 8))
        }
        0x0A => Ok((Value::Null, 0)),
        0x0B => read_regex(rest),
        0x0C => read_dbpointer(rest),
        0x0D => {
            let (code, consumed) = read_bson_string(rest)?;
            Ok((Value::JsCode(code), consumed))
        }
        0x0E => {
            // legacy Symbol -> String
            let (s, consumed) = read_bson_string(rest)?;
            Ok((Value::String(s), consumed))
        }
        0x0F => read_js_code_with_scope(rest, opts, depth),
        0x10 => {
            require_len(rest, 4, "int32")?;
            Ok((Value::Int32(i32::from_le_bytes(rest[0..4].try_into().unwrap())), 4))
        }
        0x11 => {
            require_len(rest, 8, "timestamp")?;
            let increment = u32::from_le_bytes(rest[0..4].try_into().unwrap());
            let time = u32::from_le_bytes(rest[4..8].try_into().unwrap());
            Ok((Value::Timestamp(Timestamp { time, increment }), 8))
        }
        0x12 => {
            require_len(rest, 8, "int64")?;
            Ok((Value::Int64(i64::from_le_bytes(rest[0..8].try_into().unwrap())), 8))
        }
        0xFF => Ok((Value::MinKey, 0)),
        0x7F => Ok((Value::MaxKey, 0)),
        other => {
            tracing::debug!(type_byte = %format!("0x{other:02X}"), "unknown BSON type byte");
            Err(Error::invalid_bson(format!("unknown BSON type byte 0x{other:02X}")))
        }
    }
}

fn require_len(rest: &[u8], n: usize, what: &str) -> Result<()> {
    if rest.len() < n {
        tracing::debug!(what, needed = n, available = rest.len(), "element payload exceeds remaining bytes");
        return Err(Error::invalid_bson(format!(
            "element payload for {what} exceeds remaining bytes"
        )));
    }
    Ok(())
}

fn read_cstring(bytes: &[u8]) -> Result<(String, usize)> {
    let nul_pos = bytes.iter().position(|&b| b == 0).ok_or_else(|| {
        tracing::debug!(len = bytes.len(), "cstring is missing its NUL terminator");
        Error::invalid_bson("cstring is missing its NUL terminator")
    })?;
    let s = validate_utf8(&bytes[..nul_pos])?;
    Ok((s, nul_pos + 1))
}

fn read_bson_string(rest: &[u8]) -> Result<(String, usize)> {
    require_len(rest, 4, "string length prefix")?;
    let declared = i32::from_le_bytes(rest[0..4].try_into().unwrap());
    if declared < 1 {
        tracing::debug!(declared, "string length prefix must be at least 1");
        return Err(Error::invalid_bson("string length prefix must be at least 1"));
    }
    let declared = declared as usize;
    require_len(&rest[4..], declared, "string body")?;
    if rest[4 + declared - 1] != 0 {
        tracing::debug!(declared, "string is not NUL-terminated");
        return Err(Error::invalid_bson("string is not NUL-terminated"));
    }
    let s = validate_utf8(&rest[4..4 + declared - 1])?;
    Ok((s, 4 + declared))
}

fn read_binary(rest: &[u8]) -> Result<(Value, usize)> {
    require_len(rest, 5, "binary length+subtype")?;
    let declared = i32::from_le_bytes(rest[0..4].try_into().unwrap());
    if declared < 0 {
        tracing::debug!(declared, "binary length prefix is negative");
        return Err(Error::invalid_bson("binary length prefix is negative"));
    }
    let declared = declared as usize;
    let subtype = rest[4];
    require_len(&rest[5..], declared, "binary payload")?;
    let payload = &rest[5..5 + declared];

    let value = match subtype {
        BINARY_SUBTYPE_OLD => {
            require_len(payload, 4, "old-binary inner length")?;
            let inner_len = i32::from_le_bytes(payload[0..4].try_into().unwrap());
            if inner_len < 0 || inner_len as usize + 4 != declared {
                tracing::debug!(inner_len, declared, "old-binary inner length does not match outer length");
                return Err(Error::invalid_bson(
                    "old-binary inner length does not match outer length",
                ));
            }
            Binary {
                subtype,
                bytes: payload[4..].to_vec(),
            }
        }
        BINARY_SUBTYPE_UUID => {
            if declared != 16 {
                tracing::debug!(declared, "UUID binary payload must be exactly 16 bytes");
                return Err(Error::invalid_bson("UUID binary payload must be exactly 16 bytes"));
            }
            Binary {
                subtype,
                bytes: payload.to_vec(),
            }
        }
        _ => Binary {
            subtype,
            bytes: payload.to_vec(),
        },
    };
    Ok((Value::Binary(value), 5 + declared))
}

fn read_regex(rest: &[u8]) -> Result<(Value, usize)> {
    let (pattern, pattern_len) = read_cstring(rest)?;
    let (flags, flags_len) = read_cstring(&rest[pattern_len..])?;
    Ok((Value::Regex(Regex { pattern, flags }), pattern_len + flags_len))
}

fn read_dbpointer(rest: &[u8]) -> Result<(Value, usize)> {
    // Legacy DBPointer (0x0C): a namespace string followed by a 12-byte ObjectId. Maps to DbRef
    // with no extra fields and no $db (the namespace is carried whole in $ref, matching the
    // source, which does not attempt to split "db.collection").
    let (ns, ns_len) = read_bson_string(rest)?;
    require_len(&rest[ns_len..], 12, "DBPointer objectId")?;
    let mut id = [0u8; 12];
    id.copy_from_slice(&rest[ns_len..ns_len + 12]);
    let dbref = DbRef {
        collection: ns,
        id: Box::new(Value::ObjectId(super::value::ObjectId::from_bytes(id))),
        database: None,
        extra: BsonDocument::new(),
    };
    Ok((Value::DbRef(dbref), ns_len + 12))
}

fn read_js_code_with_scope(rest: &[u8], opts: &DecodeOptions, depth: u32) -> Result<(Value, usize)> {
    require_len(rest, 4, "codeWithScope total length")?;
    let declared_total = i32::from_le_bytes(rest[0..4].try_into().unwrap());
    if declared_total < 0 {
        tracing::debug!(declared_total, "codeWithScope length prefix is negative");
        return Err(Error::invalid_bson("codeWithScope length prefix is negative"));
    }
    let declared_total = declared_total as usize;
    require_len(rest, declared_total, "codeWithScope body")?;

    let (code, code_len) = read_bson_string(&rest[4..])?;
    let (scope, scope_len) = decode_document_bytes(&rest[4 + code_len..declared_total], opts, depth + 1)?;
    let consumed = 4 + code_len + scope_len;
    if consumed != declared_total {
        tracing::debug!(consumed, declared_total, "codeWithScope declared length does not match code+scope length");
        return Err(Error::invalid_bson(
            "codeWithScope declared length does not match code+scope length",
        ));
    }
    Ok((Value::JsCodeWithScope(JsCodeWithScope { code, scope }), consumed))
}
