//! Output buffering for the signature writer.
//!
//! Digests arrive out of order; [`GroupedWriter`] collects them into
//! fixed-size [`GroupBuffer`]s keyed by group index and writes each group
//! with a single positioned write. Backing regions of written groups are
//! recycled through a [`RegionPool`].

mod group;
mod pool;
mod writer;

pub use group::GroupBuffer;
pub use pool::RegionPool;
pub use writer::GroupedWriter;
