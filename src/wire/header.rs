//! The 16-byte wire protocol message header shared by all four opcode builders (§4.4).

use crate::bson::buffer::Buffer;
use crate::error::Result;

/// The legacy wire protocol operation codes this crate assembles messages for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Update = 2001,
    Insert = 2002,
    Query = 2004,
    GetMore = 2005,
}

impl OpCode {
    fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Writes the 16-byte header (length placeholder, `request_id`, `response_to = 0`, `op_code`),
/// returning the offset of the length field for later back-patching with [`patch_length`].
pub(crate) fn write_header(buf: &mut Buffer, request_id: i32, op_code: OpCode) -> Result<usize> {
    let length_offset = buf.save_space(4)?;
    buf.write(&request_id.to_le_bytes())?;
    buf.write(&0i32.to_le_bytes())?;
    buf.write(&op_code.as_i32().to_le_bytes())?;
    Ok(length_offset)
}

/// Back-patches the message length field once the header and body have both been written.
pub(crate) fn patch_length(buf: &mut Buffer, length_offset: usize) {
    let total = (buf.position() - length_offset) as i32;
    buf.patch_i32_le(length_offset, total);
}
