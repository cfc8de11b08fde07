use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::db::LocalDb;
use crate::error::{CashplanError, Result};
use crate::models::Snapshot;
use crate::period::Period;
use crate::settings::SyncSettings;
use crate::state::LocalStateStore;
use crate::store::{DocKey, DocumentStore};

use super::scheduler::{TaskKey, TaskScheduler};
use super::types::{is_conflict, LoadOutcome, ResyncOutcome, SaveOutcome, SyncStatus};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

struct Shared<S> {
    store: S,
    local: LocalDb,
    device_id: String,
    timing: SyncSettings,
    user: Mutex<Option<String>>,
    state: Mutex<LocalStateStore>,
    /// Set by user edits, cleared when a snapshot is taken for writing.
    dirty: AtomicBool,
    /// Document whose load found local edits ahead of the shared copy.
    /// Saves stay off while it is set, whatever the displayed status says.
    conflict: Mutex<Option<DocKey>>,
    loads_in_flight: AtomicUsize,
    status: watch::Sender<SyncStatus>,
    tasks: Mutex<TaskScheduler>,
}

/// Keeps one device's working state and the shared per-period documents
/// in step.
///
/// Edits go through [`edit`](Self::edit) and are saved after a quiet
/// period; cell edits also get a short-fuse save. Switching periods flushes
/// the outgoing period and loads the incoming one. Applying a remote
/// snapshot never schedules a save, so loads cannot echo back as writes.
///
/// Store failures are logged and reflected in [`status`](Self::status);
/// they are never retried automatically. Without a signed-in user every
/// load and save is a no-op.
pub struct SyncCoordinator<S: DocumentStore> {
    shared: Arc<Shared<S>>,
}

impl<S: DocumentStore> Clone for SyncCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: DocumentStore> SyncCoordinator<S> {
    pub fn new(
        store: S,
        local: LocalDb,
        state: LocalStateStore,
        timing: SyncSettings,
    ) -> Result<Self> {
        let device_id = local.device_id()?;
        let (status, _) = watch::channel(SyncStatus::Idle);
        Ok(Self {
            shared: Arc::new(Shared {
                store,
                local,
                device_id,
                timing,
                user: Mutex::new(None),
                state: Mutex::new(state),
                dirty: AtomicBool::new(false),
                conflict: Mutex::new(None),
                loads_in_flight: AtomicUsize::new(0),
                status,
                tasks: Mutex::new(TaskScheduler::default()),
            }),
        })
    }

    /// Set the identity up front without scheduling anything.
    pub fn with_user(self, user: Option<String>) -> Self {
        *lock(&self.shared.user) = user;
        self
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn store(&self) -> &S {
        &self.shared.store
    }

    pub fn device_id(&self) -> &str {
        &self.shared.device_id
    }

    pub fn user(&self) -> Option<String> {
        lock(&self.shared.user).clone()
    }

    pub fn status(&self) -> SyncStatus {
        *self.shared.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.shared.status.subscribe()
    }

    pub fn active_period(&self) -> Period {
        lock(&self.shared.state).active_period()
    }

    pub fn is_dirty(&self) -> bool {
        self.shared.dirty.load(Ordering::SeqCst)
    }

    /// The document an unresolved conflict was found on, if any.
    pub fn conflict(&self) -> Option<DocKey> {
        lock(&self.shared.conflict).clone()
    }

    /// True while a save timer is still waiting to fire.
    pub fn save_pending(&self) -> bool {
        let tasks = lock(&self.shared.tasks);
        tasks.is_pending(TaskKey::Save) || tasks.is_pending(TaskKey::SaveImmediate)
    }

    /// Last reconciled `lastModified` for `period`, if any.
    pub fn watermark(&self, period: Period) -> Result<Option<i64>> {
        match self.user() {
            Some(user) => self.shared.local.watermark(&user, period),
            None => Ok(None),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&LocalStateStore) -> R) -> R {
        f(&lock(&self.shared.state))
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    /// Run a mutation against the working state. A successful edit marks
    /// the state dirty and restarts the debounce timer.
    pub fn edit<R>(&self, f: impl FnOnce(&mut LocalStateStore) -> Result<R>) -> Result<R> {
        let (out, period) = {
            let mut state = lock(&self.shared.state);
            let out = f(&mut state)?;
            (out, state.active_period())
        };
        self.shared.dirty.store(true, Ordering::SeqCst);
        self.schedule_save(TaskKey::Save, self.shared.timing.debounce(), period);
        Ok(out)
    }

    /// Cell edits are saved sooner than other edits.
    pub fn set_cell(&self, category: &str, account: &str, value: &str) -> Result<()> {
        self.edit(|state| state.set_cell(category, account, value))?;
        let period = self.active_period();
        self.schedule_save(
            TaskKey::SaveImmediate,
            self.shared.timing.immediate_save(),
            period,
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Identity and navigation
    // ------------------------------------------------------------------

    /// Identity change from the sign-in collaborator. Pending timers and any
    /// conflict belong to the previous identity and are dropped; signing in
    /// loads the active period.
    pub fn set_user(&self, user: Option<String>) {
        lock(&self.shared.tasks).cancel_all();
        self.clear_conflict();
        let signed_in = user.is_some();
        log::info!("identity changed: {}", user.as_deref().unwrap_or("<none>"));
        *lock(&self.shared.user) = user;
        if signed_in {
            self.schedule_load();
        }
    }

    /// Move to another period. Unsaved edits of the outgoing period are
    /// written right away, then the incoming period is loaded.
    pub fn switch_period(&self, next: Period) {
        let previous = self.active_period();
        if previous == next {
            return;
        }
        let pending = self.take_pending(previous);
        {
            let mut tasks = lock(&self.shared.tasks);
            tasks.cancel(TaskKey::Save);
            tasks.cancel(TaskKey::SaveImmediate);
            tasks.cancel(TaskKey::LoadPeriod);
        }
        lock(&self.shared.state).set_active_period(next);
        log::debug!("switched {previous} -> {next}");
        if let Ok((user, snapshot)) = pending {
            let this = self.clone();
            tokio::spawn(async move {
                this.write(user, previous, snapshot).await;
            });
        }
        self.schedule_load();
    }

    /// Write unsaved edits now instead of waiting for the debounce.
    pub async fn flush(&self) -> SaveOutcome {
        let period = self.active_period();
        self.cancel_saves();
        match self.take_pending(period) {
            Ok((user, snapshot)) => self.write(user, period, snapshot).await,
            Err(outcome) => outcome,
        }
    }

    /// Best-effort flush before the process goes away. The handle can be
    /// awaited or dropped.
    pub fn flush_on_exit(&self) -> JoinHandle<SaveOutcome> {
        let this = self.clone();
        tokio::spawn(async move { this.flush().await })
    }

    /// Drop every pending timer. In-flight store calls still complete.
    pub fn shutdown(&self) {
        lock(&self.shared.tasks).cancel_all();
    }

    // ------------------------------------------------------------------
    // Load / save cycles
    // ------------------------------------------------------------------

    pub async fn load(&self) -> LoadOutcome {
        lock(&self.shared.tasks).cancel(TaskKey::LoadPeriod);
        let period = self.active_period();
        self.load_period(period, false).await
    }

    /// Save the active period now, unless a conflict is waiting.
    pub async fn save(&self) -> SaveOutcome {
        let Some(user) = self.user() else {
            return SaveOutcome::Inert;
        };
        if let Some(key) = self.conflict() {
            log::warn!("save suppressed: unresolved conflict on {key}");
            return SaveOutcome::Suppressed;
        }
        self.shared.dirty.store(false, Ordering::SeqCst);
        let (period, snapshot) = {
            let state = lock(&self.shared.state);
            let period = state.active_period();
            (period, state.snapshot(period, now_millis(), &self.shared.device_id))
        };
        self.write(user, period, snapshot).await
    }

    /// Accept the shared copy regardless of the conflict guard, then publish
    /// the result. A failed load skips the save. A conflict on another
    /// period still suppresses the save.
    pub async fn forced_resync(&self) -> ResyncOutcome {
        if self.user().is_none() {
            return ResyncOutcome {
                load: LoadOutcome::Inert,
                save: None,
            };
        }
        {
            let mut tasks = lock(&self.shared.tasks);
            tasks.cancel(TaskKey::LoadPeriod);
            tasks.cancel(TaskKey::Save);
            tasks.cancel(TaskKey::SaveImmediate);
        }
        let period = self.active_period();
        let load = self.load_period(period, true).await;
        let save = match load {
            LoadOutcome::Failed(_) | LoadOutcome::Stale | LoadOutcome::Inert => None,
            _ => Some(self.save().await),
        };
        ResyncOutcome { load, save }
    }

    /// Delete every shared document of the signed-in user and forget the
    /// local watermarks. Returns the number of documents removed.
    pub async fn purge_all(&self) -> Result<usize> {
        let user = self.user().ok_or(CashplanError::NotSignedIn)?;
        self.shutdown();
        let keys = self.shared.store.list(&user).await?;
        for key in &keys {
            self.shared.store.delete(key).await?;
        }
        let cleared = self.shared.local.clear_watermarks(&user)?;
        self.clear_conflict();
        log::info!("purged {} documents and {cleared} watermarks for {user}", keys.len());
        self.shared.dirty.store(false, Ordering::SeqCst);
        Ok(keys.len())
    }

    /// Periods the signed-in user has shared documents for.
    pub async fn remote_periods(&self) -> Result<Vec<Period>> {
        let user = self.user().ok_or(CashplanError::NotSignedIn)?;
        let keys = self.shared.store.list(&user).await?;
        Ok(keys.into_iter().map(|k| k.period).collect())
    }

    async fn load_period(&self, period: Period, force: bool) -> LoadOutcome {
        let Some(user) = self.user() else {
            return LoadOutcome::Inert;
        };
        let key = DocKey::new(&user, period);
        self.set_status(SyncStatus::Loading);
        self.shared.loads_in_flight.fetch_add(1, Ordering::SeqCst);
        let fetched = self.shared.store.get(&key).await;
        let others = self.shared.loads_in_flight.fetch_sub(1, Ordering::SeqCst) - 1;

        if self.active_period() != period || self.user().as_deref() != Some(user.as_str()) {
            log::debug!("discarding load of {key}: no longer active");
            if others == 0 {
                self.settle_from(SyncStatus::Loading);
            }
            return LoadOutcome::Stale;
        }

        let remote = match fetched {
            Ok(Some(remote)) => remote,
            Ok(None) => {
                log::debug!("{key} not found, keeping local grid");
                lock(&self.shared.state).ensure_period(period);
                self.resolve_conflict(&key);
                self.set_status(self.settled_status());
                return LoadOutcome::Absent;
            }
            Err(e) => {
                log::error!("load of {key} failed: {e}");
                self.flash_status(SyncStatus::Error);
                return LoadOutcome::Failed(e.to_string());
            }
        };

        let watermark = self.shared.local.watermark(&user, period).unwrap_or_else(|e| {
            log::warn!("could not read watermark for {key}: {e}");
            None
        });
        if !force
            && is_conflict(
                watermark,
                remote.last_modified,
                self.shared.timing.conflict_threshold_ms,
            )
        {
            let local = watermark.unwrap_or_default();
            log::warn!(
                "conflict on {key}: local watermark {local} ahead of remote {} (device {})",
                remote.last_modified,
                remote.device_id
            );
            *lock(&self.shared.conflict) = Some(key);
            self.set_status(SyncStatus::Conflict);
            return LoadOutcome::Conflict {
                local,
                remote: remote.last_modified,
            };
        }

        lock(&self.shared.state).apply_snapshot(period, &remote);
        self.remember(&user, period, remote.last_modified);
        self.resolve_conflict(&key);
        log::info!(
            "applied {key} from device {} at {}",
            remote.device_id,
            remote.last_modified
        );
        self.flash_status(SyncStatus::Applied);
        LoadOutcome::Applied(remote.last_modified)
    }

    async fn write(&self, user: String, period: Period, snapshot: Snapshot) -> SaveOutcome {
        let key = DocKey::new(&user, period);
        self.set_status(SyncStatus::Syncing);
        match self.shared.store.set(&key, &snapshot).await {
            Ok(()) => {
                self.remember(&user, period, snapshot.last_modified);
                log::info!("saved {key} at {}", snapshot.last_modified);
                self.flash_status(SyncStatus::Success);
                SaveOutcome::Saved(snapshot.last_modified)
            }
            Err(e) => {
                log::error!("save of {key} failed: {e}");
                self.flash_status(SyncStatus::Error);
                SaveOutcome::Failed(e.to_string())
            }
        }
    }

    async fn save_scheduled(&self, period: Period) -> SaveOutcome {
        if self.active_period() != period {
            log::debug!("dropping scheduled save for inactive {period}");
            return SaveOutcome::Stale;
        }
        self.save().await
    }

    /// Snapshot of unsaved edits for `period`, or the reason there is none.
    fn take_pending(&self, period: Period) -> std::result::Result<(String, Snapshot), SaveOutcome> {
        let user = self.user().ok_or(SaveOutcome::Inert)?;
        if !self.is_dirty() {
            return Err(SaveOutcome::Clean);
        }
        if let Some(key) = self.conflict() {
            log::warn!("unsaved edits for {period} not written: unresolved conflict on {key}");
            return Err(SaveOutcome::Suppressed);
        }
        self.shared.dirty.store(false, Ordering::SeqCst);
        let snapshot =
            lock(&self.shared.state).snapshot(period, now_millis(), &self.shared.device_id);
        Ok((user, snapshot))
    }

    /// A successful load of the conflicted document resolves the conflict.
    fn resolve_conflict(&self, key: &DocKey) {
        let mut conflict = lock(&self.shared.conflict);
        if conflict.as_ref() == Some(key) {
            log::info!("conflict on {key} resolved");
            *conflict = None;
        }
    }

    fn clear_conflict(&self) {
        *lock(&self.shared.conflict) = None;
        self.settle_from(SyncStatus::Conflict);
    }

    fn remember(&self, user: &str, period: Period, last_modified: i64) {
        if let Err(e) = self.shared.local.set_watermark(user, period, last_modified) {
            log::warn!("could not record watermark for {period}: {e}");
        }
    }

    // ------------------------------------------------------------------
    // Timers and status
    // ------------------------------------------------------------------

    fn schedule_save(&self, key: TaskKey, delay: Duration, period: Period) {
        let this = self.clone();
        lock(&self.shared.tasks).schedule(key, delay, async move {
            this.save_scheduled(period).await;
        });
    }

    fn schedule_load(&self) {
        let this = self.clone();
        let period = self.active_period();
        lock(&self.shared.tasks).schedule(TaskKey::LoadPeriod, Duration::ZERO, async move {
            this.load_period(period, false).await;
        });
    }

    fn cancel_saves(&self) {
        let mut tasks = lock(&self.shared.tasks);
        tasks.cancel(TaskKey::Save);
        tasks.cancel(TaskKey::SaveImmediate);
    }

    fn set_status(&self, status: SyncStatus) {
        let previous = self.shared.status.send_replace(status);
        if previous != status {
            log::debug!("sync status {previous} -> {status}");
        }
    }

    /// Where transient statuses come to rest: `Conflict` while one is
    /// unresolved, `Idle` otherwise.
    fn settled_status(&self) -> SyncStatus {
        if lock(&self.shared.conflict).is_some() {
            SyncStatus::Conflict
        } else {
            SyncStatus::Idle
        }
    }

    /// Replace `status` with the settled status, unless something else
    /// replaced it first.
    fn settle_from(&self, status: SyncStatus) {
        let settled = self.settled_status();
        self.shared.status.send_if_modified(|current| {
            if *current == status && *current != settled {
                *current = settled;
                true
            } else {
                false
            }
        });
    }

    /// Show a transient status, reverting to the settled one unless
    /// something else replaced it in the meantime.
    fn flash_status(&self, status: SyncStatus) {
        self.set_status(status);
        let this = self.clone();
        lock(&self.shared.tasks).schedule(
            TaskKey::StatusReset,
            self.shared.timing.status_reset(),
            async move { this.settle_from(status) },
        );
    }
}
