//! Durable AppID -> PackageID index.
//! - `storage` holds the concurrent entry store and the atomic snapshot file.
//! - `database` ties them together with the server-list provider.
//! - `refresh` implements the single-flight enrichment pipeline.

pub mod errors;
pub mod diagnostics;
pub mod storage;
pub mod server_list;
pub mod notifier;
pub mod refresh;
pub mod database;
#[cfg(test)]
pub mod test_support;

pub use database::{DatabaseOptions, GlobalDatabase, LoadOutcome};
pub use diagnostics::{DiagnosticSink, TracingDiagnostics};
pub use errors::DatabaseError;
pub use refresh::{PackageResolver, RefreshOutcome};
pub use server_list::{InMemoryServerListProvider, ServerListEmitter, Subscription};
