//! The BSON codec (§1, §4): a tagged [`Value`] universe, an ordered [`Document`] map, and
//! single-pass encode/decode over it.

pub mod buffer;
pub mod decode;
pub mod document;
pub mod encode;
pub mod key;
pub mod value;

pub use buffer::Buffer;
pub use decode::{decode_all, decode_all_into, decode_one, decode_one_into, DecodeOptions};
pub use document::{Document, FromDocument};
pub use encode::{checked_int_value, encode_document, encode_document_with, EncodeOptions};
pub use value::{Binary, DbRef, JsCodeWithScope, ObjectId, Regex, Timestamp, UtcDateTime, Value};
