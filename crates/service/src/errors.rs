use std::path::PathBuf;
use std::time::Duration;

use models::errors::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot encode database: {0}")]
    Encode(#[source] ModelError),
    #[error("database file {} is unusable: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: ModelError,
    },
    #[error("gave up after {0:?} waiting for the in-flight refresh")]
    RefreshTimeout(Duration),
}

impl DatabaseError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
