//! Environment/runtime helpers
//!
//! Sanity checks to ensure the database directory exists at startup.

use std::path::Path;
use tracing::{debug, warn};

/// Ensure the directory holding `database_path` exists.
///
/// A bare file name (no parent component) needs no directory and is accepted
/// as-is.
pub async fn ensure_data_dir(database_path: &Path) -> anyhow::Result<()> {
    let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };

    if tokio::fs::metadata(parent).await.is_ok() {
        debug!(dir = %parent.display(), "data directory present");
        return Ok(());
    }

    warn!(dir = %parent.display(), "data directory missing; creating it");
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
    Ok(())
}
