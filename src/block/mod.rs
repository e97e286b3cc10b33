//! Pipeline payload types.
//!
//! - [`Block`] - Fixed-size, position-tagged slice of the source file
//! - [`BlockHash`] - Hex-encoded digest of one block, tagged with its position

mod data;
mod hash;

pub use data::Block;
pub use hash::BlockHash;
