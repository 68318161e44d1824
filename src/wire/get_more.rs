//! `build_get_more` (§4.4): OP_GET_MORE, the only opcode with no body document.

use crate::bson::buffer::Buffer;
use crate::error::Result;
use crate::wire::header::{self, OpCode};
use crate::wire::util::{next_request_id, write_cstring};

/// Builds an OP_GET_MORE message requesting up to `num_to_return` more documents from
/// `cursor_id` on `collection`.
pub fn build_get_more(collection: &str, num_to_return: i32, cursor_id: i64) -> Result<(i32, Vec<u8>)> {
    let request_id = next_request_id();
    let mut buf = Buffer::new();

    let length_offset = header::write_header(&mut buf, request_id, OpCode::GetMore)?;
    buf.write(&0i32.to_le_bytes())?; // reserved
    write_cstring(&mut buf, collection)?;
    buf.write(&num_to_return.to_le_bytes())?;
    buf.write(&cursor_id.to_le_bytes())?;
    header::patch_length(&mut buf, length_offset);

    Ok((request_id, buf.into_vec()))
}
