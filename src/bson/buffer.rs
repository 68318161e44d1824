//! A growable, append-only byte buffer with reservation support for back-patched length
//! prefixes (§4.3).
//!
//! Grounded on the cursor-tracking `Reader`/`Writer` pattern from the pack's binary-buffer
//! crate, adapted with the `save_space` reservation primitive the encoder needs that a plain
//! growable writer does not: BSON lengths are computed *after* the body they prefix is written,
//! so the encoder reserves the 4 bytes up front and comes back to fill them in once the body's
//! length is known (§9: "do not attempt two-pass measurement").

use crate::error::{Error, Result};

/// A growable byte buffer. Offsets returned by [`Buffer::save_space`] remain valid across
/// subsequent writes: the buffer may reallocate, but offsets are stable indices into the
/// logical byte stream, not pointers.
#[derive(Debug, Default)]
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    /// Returns an empty buffer.
    pub fn new() -> Self {
        Buffer { data: Vec::new() }
    }

    /// Appends `bytes`, growing the buffer as needed.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.data.try_reserve(bytes.len()).map_err(|_| Error::OutOfMemory)?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Appends a single byte.
    pub fn write_u8(&mut self, byte: u8) -> Result<()> {
        self.write(&[byte])
    }

    /// Appends `n` zeroed bytes and returns the offset they start at, for later back-patching
    /// via [`Buffer::patch_i32_le`].
    pub fn save_space(&mut self, n: usize) -> Result<usize> {
        let offset = self.data.len();
        self.data.try_reserve(n).map_err(|_| Error::OutOfMemory)?;
        self.data.resize(offset + n, 0);
        Ok(offset)
    }

    /// Overwrites the 4 bytes at `offset` with `value` encoded little-endian. Used to back-patch
    /// a length prefix reserved with [`Buffer::save_space`] once the body's length is known.
    pub fn patch_i32_le(&mut self, offset: usize, value: i32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// The current length of the buffer in bytes.
    pub fn position(&self) -> usize {
        self.data.len()
    }

    /// The buffer's contents so far.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the buffer, handing ownership of its bytes to the caller.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}
