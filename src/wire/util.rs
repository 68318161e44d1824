//! Shared helpers for the per-opcode message builders.

use std::sync::atomic::{AtomicI32, Ordering};

use crate::bson::buffer::Buffer;
use crate::bson::document::Document;
use crate::bson::encode::encode_document;
use crate::bson::key::validate_no_embedded_nul;
use crate::error::Result;
use crate::wire::header::{self, OpCode};

static REQUEST_ID: AtomicI32 = AtomicI32::new(0);

/// Returns a fresh, process-unique request id for a new outgoing message. The source generates
/// these randomly; a monotonic counter gives the same uniqueness guarantee without pulling a
/// random number generator into a synchronous, allocation-light builder.
pub fn next_request_id() -> i32 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// Writes `s` as a NUL-terminated cstring, rejecting embedded NUL bytes.
pub(crate) fn write_cstring(buf: &mut Buffer, s: &str) -> Result<()> {
    validate_no_embedded_nul(s, "a collection name")?;
    buf.write(s.as_bytes())?;
    buf.write_u8(0)
}

/// Encodes `doc` and appends it to `buf`, returning its encoded length so callers can track
/// `max_size`.
pub(crate) fn write_document(buf: &mut Buffer, doc: &Document, check_keys: bool) -> Result<usize> {
    let bytes = encode_document(doc, check_keys)?;
    let len = bytes.len();
    buf.write(&bytes)?;
    Ok(len)
}

/// Appends the getLastError "safe mode" piggyback message (§4.4) to `buf`, reusing
/// `request_id` from the primary message it follows. This is a complete OP_QUERY message against
/// `admin.$cmd` with a fixed 31-byte prologue (header + reserved + the `admin.$cmd` cstring)
/// ahead of the `numToSkip`/`numToReturn` pair and the command document.
pub(crate) fn write_get_last_error(buf: &mut Buffer, request_id: i32, last_error_args: Option<&Document>) -> Result<()> {
    let length_offset = header::write_header(buf, request_id, OpCode::Query)?;
    buf.write(&0i32.to_le_bytes())?; // reserved
    write_cstring(buf, "admin.$cmd")?;
    buf.write(&0i32.to_le_bytes())?; // numToSkip
    buf.write(&(-1i32).to_le_bytes())?; // numToReturn

    let mut command = Document::new();
    command.insert("getlasterror", 1i32);
    if let Some(extra) = last_error_args {
        for (key, value) in extra.iter() {
            if key != "getlasterror" {
                command.insert(key.clone(), value.clone());
            }
        }
    }
    write_document(buf, &command, false)?;

    header::patch_length(buf, length_offset);
    Ok(())
}
