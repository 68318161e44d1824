//! `build_update` (§4.4): OP_UPDATE plus an optional getLastError piggyback ("safe mode").

use bitflags::bitflags;

use crate::bson::buffer::Buffer;
use crate::bson::document::Document;
use crate::error::Result;
use crate::wire::header::{self, OpCode};
use crate::wire::util::{next_request_id, write_cstring, write_document, write_get_last_error};

bitflags! {
    /// The bitwise options field of an OP_UPDATE message.
    struct UpdateOptions: i32 {
        const UPSERT = 0b01;
        const MULTI_UPDATE = 0b10;
    }
}

/// Builds an OP_UPDATE message. Update documents are always encoded with `check_keys = false`
/// since their top-level keys are modifier operators (`$set`, `$inc`, ...) by convention, not
/// plain field names.
///
/// Returns `(request_id, bytes, max_size)`, where `max_size` is the larger of the two documents'
/// encoded lengths.
pub fn build_update(
    collection: &str,
    upsert: bool,
    multi: bool,
    selector: &Document,
    update: &Document,
    safe: bool,
    last_error_args: Option<&Document>,
) -> Result<(i32, Vec<u8>, usize)> {
    let request_id = next_request_id();
    let mut buf = Buffer::new();

    let length_offset = header::write_header(&mut buf, request_id, OpCode::Update)?;
    buf.write(&0i32.to_le_bytes())?; // reserved
    write_cstring(&mut buf, collection)?;

    let mut options = UpdateOptions::empty();
    options.set(UpdateOptions::UPSERT, upsert);
    options.set(UpdateOptions::MULTI_UPDATE, multi);
    buf.write(&options.bits().to_le_bytes())?;

    let selector_size = write_document(&mut buf, selector, false)?;
    let update_size = write_document(&mut buf, update, false)?;
    header::patch_length(&mut buf, length_offset);

    if safe {
        write_get_last_error(&mut buf, request_id, last_error_args)?;
    }

    Ok((request_id, buf.into_vec(), selector_size.max(update_size)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_upsert_and_multi_bits() {
        let selector = Document::new();
        let update = Document::new();
        let (_, bytes, _) = build_update("db.c", true, true, &selector, &update, false, None).unwrap();
        // header(16) + reserved(4) + "db.c\0"(5) = 25, then the 4-byte options field.
        let options = i32::from_le_bytes(bytes[25..29].try_into().unwrap());
        assert_eq!(options, (UpdateOptions::UPSERT | UpdateOptions::MULTI_UPDATE).bits());
    }

    #[test]
    fn no_flags_produces_zero_options() {
        let selector = Document::new();
        let update = Document::new();
        let (_, bytes, _) = build_update("db.c", false, false, &selector, &update, false, None).unwrap();
        let options = i32::from_le_bytes(bytes[25..29].try_into().unwrap());
        assert_eq!(options, 0);
    }
}
