use std::future::Future;

use tokio::runtime::Runtime;

use crate::db::LocalDb;
use crate::error::{CashplanError, Result};
use crate::period::parse_month_opt;
use crate::settings::load_settings;
use crate::state::LocalStateStore;
use crate::store::SqliteStore;
use crate::sync::{LoadOutcome, SaveOutcome, SyncCoordinator};

pub type Coordinator = SyncCoordinator<SqliteStore>;

/// A signed-in coordinator on a single-threaded runtime, positioned on one
/// month.
pub struct Workspace {
    runtime: Runtime,
    coord: Coordinator,
}

impl Workspace {
    /// Connect and load the month. A conflict is an error here.
    pub fn open(month: Option<&str>) -> Result<Self> {
        let ws = Self::connect(month)?;
        ws.load()?;
        Ok(ws)
    }

    /// Connect without loading anything.
    pub fn connect(month: Option<&str>) -> Result<Self> {
        let settings = load_settings();
        let user = settings.user.clone().ok_or(CashplanError::NotSignedIn)?;
        let period = parse_month_opt(month)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let local = LocalDb::open(&settings.local_db_path())?;
        let store = SqliteStore::open(&settings.store_path())?;
        let coord = SyncCoordinator::new(
            store,
            local,
            LocalStateStore::new(period),
            settings.sync.clone(),
        )?
        .with_user(Some(user));
        Ok(Self { runtime, coord })
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coord
    }

    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    pub fn read<R>(&self, f: impl FnOnce(&LocalStateStore) -> R) -> R {
        self.coord.read(f)
    }

    pub fn load(&self) -> Result<LoadOutcome> {
        match self.block_on(self.coord.load()) {
            LoadOutcome::Conflict { .. } => Err(CashplanError::Conflict(self.coord.active_period())),
            LoadOutcome::Failed(e) => Err(CashplanError::Load(e)),
            outcome => Ok(outcome),
        }
    }

    /// Apply one edit and write it out before returning.
    pub fn edit<R>(&self, f: impl FnOnce(&mut LocalStateStore) -> Result<R>) -> Result<R> {
        let out = {
            let _guard = self.runtime.enter();
            self.coord.edit(f)?
        };
        self.save()?;
        Ok(out)
    }

    fn save(&self) -> Result<()> {
        match self.block_on(self.coord.flush()) {
            SaveOutcome::Failed(e) => Err(CashplanError::Save(e)),
            SaveOutcome::Suppressed => Err(CashplanError::Conflict(self.coord.active_period())),
            _ => Ok(()),
        }
    }
}
