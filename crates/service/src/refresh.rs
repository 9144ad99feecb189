//! Incremental enrichment of the index.
//!
//! A refresh filters the requested package IDs down to those no app lists
//! yet, asks a [`PackageResolver`] who owns them, merges the answer and saves.
//! Refreshes on one database run strictly one at a time.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use models::{AppId, PackageId};
use tokio::sync::SemaphorePermit;
use tracing::debug;

use crate::database::{save_blocking, GlobalDatabase};
use crate::errors::DatabaseError;

/// Resolves package IDs to the apps they grant.
#[async_trait]
pub trait PackageResolver: Send + Sync {
    /// Never called with an empty set. `None` or an empty map means nothing
    /// could be resolved.
    async fn resolve_app_ids(
        &self,
        package_ids: &HashSet<PackageId>,
    ) -> Option<HashMap<AppId, HashSet<PackageId>>>;
}

/// What a call to [`GlobalDatabase::refresh_package_ids`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Empty request; reported as an invalid argument.
    Rejected,
    /// Every requested package is already indexed. Nothing was called or saved.
    AlreadyKnown,
    /// The resolver returned nothing. Nothing was saved.
    NothingResolved,
    /// The resolver's answer was merged and saved.
    Merged { apps: usize, packages: usize },
    /// Waiting for the in-flight refresh exceeded the configured timeout.
    TimedOut,
}

impl GlobalDatabase {
    /// Make sure every package in `package_ids` is indexed, asking `resolver`
    /// about the ones that are not.
    ///
    /// Callers queue behind a refresh already in progress; the resolver is
    /// awaited while the slot is held so concurrent callers never ask about
    /// the same packages twice.
    pub async fn refresh_package_ids<R>(&self, resolver: &R, package_ids: &HashSet<PackageId>) -> RefreshOutcome
    where
        R: PackageResolver + ?Sized,
    {
        let state = &self.state;
        if package_ids.is_empty() {
            state.diagnostics.invalid_argument("package_ids");
            return RefreshOutcome::Rejected;
        }

        let _permit = match self.enter_refresh().await {
            Ok(permit) => permit,
            Err(outcome) => return outcome,
        };

        let missing: HashSet<PackageId> =
            package_ids.iter().copied().filter(|id| !state.entries.contains_package(*id)).collect();
        if missing.is_empty() {
            debug!(requested = package_ids.len(), "all requested packages already indexed");
            return RefreshOutcome::AlreadyKnown;
        }

        debug!(requested = package_ids.len(), missing = missing.len(), "resolving unknown packages");
        let resolved = match resolver.resolve_app_ids(&missing).await {
            Some(resolved) if !resolved.is_empty() => resolved,
            _ => {
                debug!(missing = missing.len(), "resolver returned nothing");
                return RefreshOutcome::NothingResolved;
            }
        };

        let apps = resolved.len();
        let packages: usize = resolved.values().map(HashSet::len).sum();
        state.entries.merge(resolved);
        // still under the refresh permit so the next caller sees the committed file
        save_blocking(state).await;

        debug!(apps, packages, "merged resolved packages");
        RefreshOutcome::Merged { apps, packages }
    }

    async fn enter_refresh(&self) -> Result<SemaphorePermit<'_>, RefreshOutcome> {
        let state = &self.state;
        let acquire = state.refresh_gate.acquire();
        let permit = match state.refresh_wait_timeout {
            Some(limit) => match tokio::time::timeout(limit, acquire).await {
                Ok(permit) => permit,
                Err(_) => {
                    state.diagnostics.exception("refresh", &DatabaseError::RefreshTimeout(limit));
                    return Err(RefreshOutcome::TimedOut);
                }
            },
            None => acquire.await,
        };

        // the gate is never closed, but stay graceful if that ever changes
        permit.map_err(|e| {
            state.diagnostics.exception("refresh", &e);
            RefreshOutcome::Rejected
        })
    }
}
