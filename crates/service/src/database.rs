use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use models::{AppId, DatabaseRecord, PackageId};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, info};
use uuid::Uuid;

use crate::diagnostics::{DiagnosticSink, TracingDiagnostics};
use crate::errors::DatabaseError;
use crate::notifier::ChangeNotifierBridge;
use crate::server_list::InMemoryServerListProvider;
use crate::storage::{EntryStore, SnapshotFile};

/// Knobs that are not part of the persisted state.
#[derive(Clone)]
pub struct DatabaseOptions {
    /// How long a refresh may wait for the one already in flight.
    /// `None` waits indefinitely.
    pub refresh_wait_timeout: Option<Duration>,
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self { refresh_wait_timeout: None, diagnostics: Arc::new(TracingDiagnostics) }
    }
}

impl DatabaseOptions {
    pub fn with_refresh_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.refresh_wait_timeout = timeout;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// Result of [`GlobalDatabase::load`].
pub enum LoadOutcome {
    /// No file existed; a fresh database was created and saved.
    Created(GlobalDatabase),
    /// An existing file was decoded.
    Loaded(GlobalDatabase),
    /// The file exists but cannot be used. Already reported to the sink.
    Unusable(DatabaseError),
}

impl LoadOutcome {
    pub fn into_database(self) -> Option<GlobalDatabase> {
        match self {
            Self::Created(db) | Self::Loaded(db) => Some(db),
            Self::Unusable(_) => None,
        }
    }

    pub fn into_result(self) -> Result<GlobalDatabase, DatabaseError> {
        match self {
            Self::Created(db) | Self::Loaded(db) => Ok(db),
            Self::Unusable(e) => Err(e),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Loaded(_) => "loaded",
            Self::Unusable(_) => "unusable",
        }
    }
}

impl fmt::Debug for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(db) => f.debug_tuple("Created").field(db).finish(),
            Self::Loaded(db) => f.debug_tuple("Loaded").field(db).finish(),
            Self::Unusable(e) => f.debug_tuple("Unusable").field(e).finish(),
        }
    }
}

pub(crate) struct DatabaseState {
    guid: Uuid,
    cell_id: AtomicU32,
    pub(crate) entries: EntryStore,
    server_list: Arc<InMemoryServerListProvider>,
    file: SnapshotFile,
    pub(crate) refresh_gate: Semaphore,
    pub(crate) refresh_wait_timeout: Option<Duration>,
    pub(crate) diagnostics: Arc<dyn DiagnosticSink>,
}

impl DatabaseState {
    fn to_record(&self) -> DatabaseRecord {
        DatabaseRecord {
            app_ids_to_package_ids: self.entries.snapshot(),
            guid: self.guid,
            server_list: self.server_list.state(),
            cell_id: self.cell_id.load(Ordering::SeqCst),
        }
    }

    /// Persist the current state. Failures are reported, never returned:
    /// memory and disk may then differ until the next successful save.
    pub(crate) fn save(&self) {
        if let Err(e) = self.file.commit(|| self.to_record()) {
            self.diagnostics.exception("save", &e);
        }
    }
}

/// [`DatabaseState::save`] for async callers: the commit does blocking file
/// I/O, so it runs on the blocking pool and is awaited.
pub(crate) async fn save_blocking(state: &Arc<DatabaseState>) {
    let committing = Arc::clone(state);
    if let Err(e) = tokio::task::spawn_blocking(move || committing.save()).await {
        state.diagnostics.exception("save", &e);
    }
}

/// Process-wide AppID -> PackageID index backed by an atomically replaced
/// JSON file.
///
/// Saves are triggered by merged refreshes, cell ID changes and server-list
/// updates. They share one file lock but are otherwise independent.
pub struct GlobalDatabase {
    pub(crate) state: Arc<DatabaseState>,
    bridge: Mutex<ChangeNotifierBridge>,
}

impl GlobalDatabase {
    /// Open the database at `path`, creating and saving an empty one when no
    /// file exists there.
    pub fn load<P: AsRef<Path>>(path: P, options: DatabaseOptions) -> LoadOutcome {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            options.diagnostics.invalid_argument("path");
            return LoadOutcome::Unusable(DatabaseError::InvalidArgument("path"));
        }

        let file = SnapshotFile::new(path);
        let exists = match file.exists() {
            Ok(exists) => exists,
            Err(e) => {
                options.diagnostics.exception("load", &e);
                return LoadOutcome::Unusable(e);
            }
        };

        if !exists {
            let db = Self::from_record(DatabaseRecord::fresh(), file, options);
            db.save();
            info!(path = %path.display(), guid = %db.guid(), "created global database");
            return LoadOutcome::Created(db);
        }

        match file.read() {
            Ok(record) => {
                let db = Self::from_record(record, file, options);
                info!(path = %path.display(), guid = %db.guid(), apps = db.app_count(), "loaded global database");
                LoadOutcome::Loaded(db)
            }
            Err(e) => {
                options.diagnostics.exception("load", &e);
                LoadOutcome::Unusable(e)
            }
        }
    }

    fn from_record(record: DatabaseRecord, file: SnapshotFile, options: DatabaseOptions) -> Self {
        let server_list = Arc::new(InMemoryServerListProvider::from_state(record.server_list));
        let state = Arc::new(DatabaseState {
            guid: record.guid,
            cell_id: AtomicU32::new(record.cell_id),
            entries: EntryStore::from_snapshot(&record.app_ids_to_package_ids),
            server_list: Arc::clone(&server_list),
            file,
            refresh_gate: Semaphore::new(1),
            refresh_wait_timeout: options.refresh_wait_timeout,
            diagnostics: options.diagnostics,
        });

        // weak so a forgotten subscription never keeps the state alive
        let weak: Weak<DatabaseState> = Arc::downgrade(&state);
        let bridge = ChangeNotifierBridge::attach(server_list, move || {
            if let Some(state) = weak.upgrade() {
                state.save();
            }
        });

        Self { state, bridge: Mutex::new(bridge) }
    }

    pub fn guid(&self) -> Uuid {
        self.state.guid
    }

    pub fn path(&self) -> &Path {
        self.state.file.path()
    }

    pub fn cell_id(&self) -> u32 {
        self.state.cell_id.load(Ordering::SeqCst)
    }

    /// Store a new cell ID and save. Zero and the current value are ignored.
    pub fn set_cell_id(&self, cell_id: u32) {
        if cell_id == 0 {
            return;
        }
        if self.state.cell_id.swap(cell_id, Ordering::SeqCst) == cell_id {
            return;
        }
        debug!(cell_id, "cell id changed");
        self.save();
    }

    pub fn package_ids(&self, app_id: AppId) -> HashSet<PackageId> {
        self.state.entries.get(app_id)
    }

    pub fn contains_package(&self, package_id: PackageId) -> bool {
        self.state.entries.contains_package(package_id)
    }

    pub fn app_count(&self) -> usize {
        self.state.entries.len()
    }

    pub fn server_list(&self) -> &Arc<InMemoryServerListProvider> {
        &self.state.server_list
    }

    /// Number of successful saves since this instance was opened.
    pub fn generation(&self) -> u64 {
        self.state.file.generation()
    }

    pub fn save(&self) {
        self.state.save();
    }

    /// Stop saving on server-list updates. Returns `false` when already
    /// disposed.
    pub fn dispose(&self) -> bool {
        let detached = self.bridge.lock().detach();
        if detached {
            debug!(guid = %self.state.guid, "global database disposed");
        }
        detached
    }

    pub fn is_disposed(&self) -> bool {
        !self.bridge.lock().is_attached()
    }
}

impl fmt::Debug for GlobalDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalDatabase")
            .field("path", &self.path())
            .field("guid", &self.guid())
            .field("cell_id", &self.cell_id())
            .field("apps", &self.app_count())
            .finish()
    }
}
