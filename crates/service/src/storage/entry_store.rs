use std::collections::HashSet;

use dashmap::{DashMap, DashSet};
use models::{AppId, AppPackages, PackageId};

/// Concurrent AppID -> PackageID index.
///
/// Sets only ever grow: `merge` unions, nothing removes. Readers and writers
/// need no outer lock, and a merged package is visible to the next read.
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: DashMap<AppId, DashSet<PackageId>>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the live index from a decoded snapshot.
    pub fn from_snapshot(snapshot: &AppPackages) -> Self {
        let store = Self::new();
        store.merge(snapshot.iter().map(|(app_id, packages)| (*app_id, packages.iter().copied())));
        store
    }

    /// Packages granting `app_id`; empty when the app is unknown.
    pub fn get(&self, app_id: AppId) -> HashSet<PackageId> {
        self.entries
            .get(&app_id)
            .map(|packages| packages.iter().map(|p| *p.key()).collect())
            .unwrap_or_default()
    }

    /// Whether any app lists `package_id`.
    pub fn contains_package(&self, package_id: PackageId) -> bool {
        self.entries.iter().any(|entry| entry.value().contains(&package_id))
    }

    /// Union `additions` into the index, creating app entries on demand.
    /// Merging the same data again changes nothing.
    pub fn merge<I, P>(&self, additions: I)
    where
        I: IntoIterator<Item = (AppId, P)>,
        P: IntoIterator<Item = PackageId>,
    {
        for (app_id, packages) in additions {
            // downgrade so readers of the same shard are not held off while we insert
            let set = self.entries.entry(app_id).or_default().downgrade();
            for package_id in packages {
                set.insert(package_id);
            }
        }
    }

    /// Number of apps with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ordered copy of the whole index, as written to disk.
    pub fn snapshot(&self) -> AppPackages {
        self.entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().iter().map(|p| *p.key()).collect()))
            .collect()
    }
}
