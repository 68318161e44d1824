//! `build_insert` (§4.4): OP_INSERT plus an optional getLastError piggyback ("safe mode").

use crate::bson::buffer::Buffer;
use crate::bson::document::Document;
use crate::error::{Error, Result};
use crate::wire::header::{self, OpCode};
use crate::wire::util::{next_request_id, write_cstring, write_document, write_get_last_error};

/// Builds an OP_INSERT message for `docs` against `collection`. At least one document is
/// required. When `safe` is set, a getLastError command is appended as a second message sharing
/// the same request id, merged with any caller-supplied `last_error_args`.
///
/// Returns `(request_id, bytes, max_size)`, where `max_size` is the encoded length of the
/// largest single document written, for callers to validate against the server's max BSON size.
pub fn build_insert(
    collection: &str,
    docs: &[Document],
    check_keys: bool,
    safe: bool,
    last_error_args: Option<&Document>,
) -> Result<(i32, Vec<u8>, usize)> {
    if docs.is_empty() {
        return Err(Error::invalid_operation("cannot do an empty bulk insert"));
    }

    let request_id = next_request_id();
    let mut buf = Buffer::new();

    let length_offset = header::write_header(&mut buf, request_id, OpCode::Insert)?;
    buf.write(&0i32.to_le_bytes())?; // flags
    write_cstring(&mut buf, collection)?;
    let mut max_size = 0usize;
    for doc in docs {
        let size = write_document(&mut buf, doc, check_keys)?;
        max_size = max_size.max(size);
    }
    header::patch_length(&mut buf, length_offset);

    if safe {
        write_get_last_error(&mut buf, request_id, last_error_args)?;
    }

    Ok((request_id, buf.into_vec(), max_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_document_list() {
        assert!(matches!(
            build_insert("db.c", &[], false, false, None),
            Err(Error::InvalidOperation { .. })
        ));
    }

    #[test]
    fn encodes_collection_and_flags() {
        let mut doc = Document::new();
        doc.insert("x", 1i32);
        let (_, bytes, max_size) = build_insert("db.c", &[doc], false, false, None).unwrap();

        assert_eq!(&bytes[12..16], &2002i32.to_le_bytes());
        assert_eq!(&bytes[16..20], &0i32.to_le_bytes());
        assert!(bytes[20..].starts_with(b"db.c\0"));
        assert_eq!(max_size, 12);

        let declared_len = i32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        assert_eq!(declared_len, bytes.len());
    }

    #[test]
    fn safe_mode_appends_get_last_error_with_shared_request_id() {
        let mut doc = Document::new();
        doc.insert("x", 1i32);
        let (request_id, bytes, _) = build_insert("db.c", &[doc], false, true, None).unwrap();

        let first_len = i32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let second = &bytes[first_len..];

        assert_eq!(&second[4..8], &request_id.to_le_bytes());
        assert_eq!(&second[12..16], &2004i32.to_le_bytes());
        assert!(second[20..].starts_with(b"admin.$cmd\0"));
    }
}
