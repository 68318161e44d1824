//! A BSON codec and MongoDB legacy wire protocol message builder.
//!
//! [`bson`] implements the encoder/decoder for the BSON value universe. [`wire`] assembles
//! INSERT/UPDATE/QUERY/GET_MORE messages over it, including the getLastError "safe mode"
//! piggyback.

pub mod bson;
pub mod error;
#[cfg(test)]
mod test_support;
pub mod wire;

pub use error::{Error, Result};
