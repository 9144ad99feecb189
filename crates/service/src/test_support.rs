#![cfg(test)]
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use models::{AppId, PackageId};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::diagnostics::DiagnosticSink;
use crate::refresh::PackageResolver;
use crate::storage::snapshot_file::TEMP_SUFFIX;

/// Unique database path under the system temp dir.
pub fn temp_db_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{tag}_{}.db", Uuid::new_v4()))
}

/// Remove a database file and any staged temp file next to it.
pub fn cleanup(path: &Path) {
    let _ = std::fs::remove_file(path);
    let mut temp = path.as_os_str().to_owned();
    temp.push(TEMP_SUFFIX);
    let _ = std::fs::remove_file(PathBuf::from(temp));
}

/// Records what the database reports instead of logging it.
#[derive(Default)]
pub struct RecordingDiagnostics {
    invalid: Mutex<Vec<String>>,
    exceptions: Mutex<Vec<String>>,
}

impl RecordingDiagnostics {
    pub fn invalid_arguments(&self) -> Vec<String> {
        self.invalid.lock().clone()
    }

    /// Contexts of the reported failures, in order.
    pub fn exceptions(&self) -> Vec<String> {
        self.exceptions.lock().clone()
    }
}

impl DiagnosticSink for RecordingDiagnostics {
    fn invalid_argument(&self, name: &str) {
        self.invalid.lock().push(name.to_string());
    }

    fn exception(&self, context: &str, _error: &(dyn Error + 'static)) {
        self.exceptions.lock().push(context.to_string());
    }
}

/// Resolver backed by a fixed package -> app table that counts calls and
/// tracks how many ran at once.
#[derive(Default)]
pub struct CountingResolver {
    owners: HashMap<PackageId, AppId>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<HashSet<PackageId>>>,
}

impl CountingResolver {
    pub fn new<I>(owners: I) -> Self
    where
        I: IntoIterator<Item = (PackageId, AppId)>,
    {
        Self { owners: owners.into_iter().collect(), ..Self::default() }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HashSet<PackageId>> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PackageResolver for CountingResolver {
    async fn resolve_app_ids(
        &self,
        package_ids: &HashSet<PackageId>,
    ) -> Option<HashMap<AppId, HashSet<PackageId>>> {
        assert!(!package_ids.is_empty(), "resolver called with an empty set");
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.requests.lock().push(package_ids.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut resolved: HashMap<AppId, HashSet<PackageId>> = HashMap::new();
        for package_id in package_ids {
            if let Some(app_id) = self.owners.get(package_id) {
                resolved.entry(*app_id).or_default().insert(*package_id);
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (!resolved.is_empty()).then_some(resolved)
    }
}
