//! `build_query` (§4.4): OP_QUERY, the one opcode without a safe-mode piggyback (it's already a
//! read).

use crate::bson::buffer::Buffer;
use crate::bson::document::Document;
use crate::error::Result;
use crate::wire::header::{self, OpCode};
use crate::wire::util::{next_request_id, write_cstring, write_document};

/// Builds an OP_QUERY message. `flags` is passed through from the caller verbatim (it is a
/// caller-owned bitmask, unlike UPDATE's upsert/multi bits which this crate computes).
///
/// Returns `(request_id, bytes, max_size)`, where `max_size` is the larger of the query
/// document's and the optional field selector's encoded lengths.
pub fn build_query(
    flags: i32,
    collection: &str,
    num_to_skip: i32,
    num_to_return: i32,
    query: &Document,
    field_selector: Option<&Document>,
) -> Result<(i32, Vec<u8>, usize)> {
    let request_id = next_request_id();
    let mut buf = Buffer::new();

    let length_offset = header::write_header(&mut buf, request_id, OpCode::Query)?;
    buf.write(&flags.to_le_bytes())?;
    write_cstring(&mut buf, collection)?;
    buf.write(&num_to_skip.to_le_bytes())?;
    buf.write(&num_to_return.to_le_bytes())?;

    let query_size = write_document(&mut buf, query, false)?;
    let mut max_size = query_size;
    if let Some(selector) = field_selector {
        let selector_size = write_document(&mut buf, selector, false)?;
        max_size = max_size.max(selector_size);
    }
    header::patch_length(&mut buf, length_offset);

    Ok((request_id, buf.into_vec(), max_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_skip_and_limit() {
        let query = Document::new();
        let (_, bytes, _) = build_query(0, "db.c", 5, 100, &query, None).unwrap();
        // header(16) + flags(4) + "db.c\0"(5) = 25.
        let skip = i32::from_le_bytes(bytes[25..29].try_into().unwrap());
        let limit = i32::from_le_bytes(bytes[29..33].try_into().unwrap());
        assert_eq!(skip, 5);
        assert_eq!(limit, 100);
    }

    #[test]
    fn field_selector_is_optional() {
        let query = Document::new();
        let (_, with_selector, _) = build_query(0, "db.c", 0, 0, &query, Some(&Document::new())).unwrap();
        let (_, without_selector, _) = build_query(0, "db.c", 0, 0, &query, None).unwrap();
        assert!(with_selector.len() > without_selector.len());
    }
}
