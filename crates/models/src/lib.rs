//! Persisted record types for the package index.
//!
//! The service crate owns the live, concurrent representation; everything
//! here is the plain data that crosses the disk boundary.

pub mod errors;
pub mod record;
pub mod server_list;

pub use record::{AppId, AppPackages, DatabaseRecord, PackageId};
pub use server_list::{ServerListState, ServerRecord};
