//! In-memory metadata archives and their extraction to disk.
//!
//! Archives are read fully into memory so that rewrite passes can build a fresh archive
//! without touching the original, and so that extraction only starts once every pass has
//! succeeded.

mod entry;
mod extract;

pub use entry::{Archive, ArchiveEntry};
pub use extract::extract_archive;
