//! Storage building blocks for the global database
//!
//! `EntryStore` is the live in-memory index, `SnapshotFile` the durable
//! JSON copy on disk.

pub mod entry_store;
pub mod snapshot_file;

pub use entry_store::EntryStore;
pub use snapshot_file::SnapshotFile;
