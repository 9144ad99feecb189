//! Shared runtime plumbing for the package index binaries: logging setup and
//! filesystem sanity checks performed before the database is opened.

pub mod env;
pub mod utils;
