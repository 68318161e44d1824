//! The tagged value universe a [`Document`](super::Document) is built from.
//!
//! Host-defined types from the source implementation (`ObjectId`, `DBRef`, `Timestamp`, `UUID`,
//! `Regex`, `MinKey`, `MaxKey`, `Binary`, `Code`) are ordinary variants here with concrete
//! fields, not host objects.

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use super::document::Document;

/// Binary subtype: generic byte string.
pub const BINARY_SUBTYPE_GENERIC: u8 = 0x00;
/// Binary subtype: "old binary", carrying a redundant inner length prefix.
pub const BINARY_SUBTYPE_OLD: u8 = 0x02;
/// Binary subtype: a 16-byte UUID, stored little-endian.
pub const BINARY_SUBTYPE_UUID: u8 = 0x03;

/// A 12-byte MongoDB object identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub [u8; 12]);

impl ObjectId {
    /// Wraps 12 raw bytes as an `ObjectId`.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    /// Returns the 12 raw bytes.
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }
}

/// A replication timestamp: a seconds-since-epoch `time` and a monotonic `inc`rement used to
/// order operations within the same second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    /// Seconds since the Unix epoch.
    pub time: u32,
    /// Ordinal within `time`.
    pub increment: u32,
}

/// A BSON regular expression: a pattern plus a set of flag letters.
///
/// Per the fixed flag table, `u` is accepted on decode but has no emitter bit, so a regex
/// decoded with the `u` flag loses it on re-encode. This is an intentional, documented
/// asymmetry inherited from the source implementation, not a bug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regex {
    /// The pattern text (C-string framed on the wire: no embedded NUL).
    pub pattern: String,
    /// Flag letters, in any order. Unknown letters are preserved verbatim but ignored by
    /// [`Regex::flag_mask`].
    pub flags: String,
}

impl Regex {
    /// Creates a regex value from a pattern and flag-letter string.
    pub fn new(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Regex {
            pattern: pattern.into(),
            flags: flags.into(),
        }
    }

    /// Folds the flag letters into the integer mask from the spec's flag table. Unknown letters
    /// are ignored.
    pub fn flag_mask(&self) -> u32 {
        let mut mask = 0;
        for letter in self.flags.chars() {
            mask |= match letter {
                'i' => 2,
                'l' => 4,
                'm' => 8,
                's' => 16,
                'u' => 32,
                'x' => 64,
                _ => 0,
            };
        }
        mask
    }

    /// Emits the flag letters the encoder supports, in the fixed alphabetical order from the
    /// flag table (`i`, `l`, `m`, `s`, `x` — note `u` has no emitter bit).
    pub fn emitted_flags(&self) -> String {
        const EMITTABLE: [char; 5] = ['i', 'l', 'm', 's', 'x'];
        let present: std::collections::HashSet<char> = self.flags.chars().collect();
        EMITTABLE.iter().filter(|c| present.contains(c)).collect()
    }
}

/// A logical reference to a document in another collection: `$ref` (collection), `$id`
/// (identifier), optional `$db` (database), plus any extra carry-over fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DbRef {
    /// The `$ref` collection name.
    pub collection: String,
    /// The `$id` value; typically an `ObjectId` but any `Value` is legal.
    pub id: Box<Value>,
    /// The optional `$db` database name.
    pub database: Option<String>,
    /// Any fields beyond `$ref`/`$id`/`$db` carried in the sub-document.
    pub extra: Document,
}

/// JavaScript code paired with a variable scope document.
#[derive(Debug, Clone, PartialEq)]
pub struct JsCodeWithScope {
    /// The code string.
    pub code: String,
    /// The scope document the code executes against.
    pub scope: Document,
}

/// An opaque binary blob tagged with a BSON binary subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    /// The subtype byte.
    pub subtype: u8,
    /// The payload. For subtype 2 this is the inner (unwrapped) payload, not including the
    /// redundant inner length prefix the wire format carries.
    pub bytes: Vec<u8>,
}

impl Binary {
    /// Wraps a UUID as Binary subtype 3, little-endian.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Binary {
            subtype: BINARY_SUBTYPE_UUID,
            bytes: uuid.to_bytes_le().to_vec(),
        }
    }

    /// Interprets this value as a UUID if it is subtype 3 of the correct length.
    pub fn as_uuid(&self) -> Option<Uuid> {
        if self.subtype != BINARY_SUBTYPE_UUID || self.bytes.len() != 16 {
            return None;
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&self.bytes);
        Some(Uuid::from_bytes_le(buf))
    }
}

/// An instant at millisecond precision since the Unix epoch.
///
/// The `Aware`/`Naive` split mirrors the source's `tz_aware` decoder flag directly in the type:
/// decoding with `tz_aware = true` produces `Aware`, decoding with `tz_aware = false` produces
/// `Naive`, matching "attach a UTC zone marker; otherwise return naive UTC components" (§4.2). A
/// timezone-aware `chrono::DateTime<Utc>` is already normalized to UTC by construction, so the
/// source's "subtract the offset" step (§4.1) has no separate action to take here — the type
/// system enforces it. Both variants carry the same millisecond value on the wire; only the
/// round-trip shape differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtcDateTime {
    /// A timezone-aware UTC instant.
    Aware(DateTime<Utc>),
    /// A naive instant whose components are implicitly UTC.
    Naive(NaiveDateTime),
}

impl UtcDateTime {
    /// Builds a value from milliseconds since the Unix epoch, per the `tz_aware` flag.
    pub fn from_millis(millis: i64, tz_aware: bool) -> Self {
        let dt = DateTime::from_timestamp_millis(millis).unwrap_or_else(|| DateTime::from_timestamp(0, 0).unwrap());
        if tz_aware {
            UtcDateTime::Aware(dt)
        } else {
            UtcDateTime::Naive(dt.naive_utc())
        }
    }

    /// The milliseconds-since-epoch representation written to the wire, common to both variants.
    pub fn to_millis(self) -> i64 {
        match self {
            UtcDateTime::Aware(dt) => dt.timestamp_millis(),
            UtcDateTime::Naive(dt) => dt.and_utc().timestamp_millis(),
        }
    }
}

/// The tagged value a [`Document`] element holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// IEEE-754 binary64 (type 0x01).
    Double(f64),
    /// UTF-8 text (type 0x02).
    String(String),
    /// Ordered sub-document (type 0x03).
    Document(Document),
    /// Ordered sequence (type 0x04).
    Array(Vec<Value>),
    /// Opaque tagged blob (type 0x05).
    Binary(Binary),
    /// 12-byte object id (type 0x07).
    ObjectId(ObjectId),
    /// Boolean (type 0x08).
    Bool(bool),
    /// Millisecond-precision instant since the Unix epoch (type 0x09).
    DateTime(UtcDateTime),
    /// Absent value (type 0x0A); also the decode target of legacy Undefined (0x06).
    Null,
    /// Pattern + flags (type 0x0B).
    Regex(Regex),
    /// Reference to another document; also the decode target of legacy DBPointer (0x0C).
    DbRef(DbRef),
    /// Code without a scope (type 0x0D, decode-only per the source).
    JsCode(String),
    /// Code with a scope document (type 0x0F).
    JsCodeWithScope(JsCodeWithScope),
    /// Signed 32-bit integer (type 0x10).
    Int32(i32),
    /// Replication timestamp (type 0x11).
    Timestamp(Timestamp),
    /// Signed 64-bit integer (type 0x12).
    Int64(i64),
    /// Sorts below all other values (type 0xFF).
    MinKey,
    /// Sorts above all other values (type 0x7F).
    MaxKey,
}

impl Value {
    /// Chooses the narrowest BSON integer width that can represent `n` losslessly, per the
    /// encoder's integer-width-selection rule: Int32 if it fits, else Int64, else overflow.
    /// Returns `None` for the (impossible in 64-bit `i64`) overflow case — callers that need the
    /// `Overflow` error should use [`crate::bson::encode::checked_int_value`] instead.
    pub fn from_i64_autosize(n: i64) -> Value {
        if let Ok(n32) = i32::try_from(n) {
            Value::Int32(n32)
        } else {
            Value::Int64(n)
        }
    }

    /// Returns a type name suitable for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Document(_) => "document",
            Value::Array(_) => "array",
            Value::Binary(_) => "binary",
            Value::ObjectId(_) => "objectId",
            Value::Bool(_) => "bool",
            Value::DateTime(_) => "dateTime",
            Value::Null => "null",
            Value::Regex(_) => "regex",
            Value::DbRef(_) => "dbRef",
            Value::JsCode(_) => "jsCode",
            Value::JsCodeWithScope(_) => "jsCodeWithScope",
            Value::Int32(_) => "int32",
            Value::Timestamp(_) => "timestamp",
            Value::Int64(_) => "int64",
            Value::MinKey => "minKey",
            Value::MaxKey => "maxKey",
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}
