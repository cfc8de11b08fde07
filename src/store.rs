use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension};

use crate::db::get_connection;
use crate::error::{CashplanError, Result};
use crate::models::Snapshot;
use crate::period::Period;

/// Address of one shared document: a user's snapshot for one period.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocKey {
    pub user: String,
    pub period: Period,
}

impl DocKey {
    pub fn new(user: &str, period: Period) -> Self {
        Self {
            user: user.to_string(),
            period,
        }
    }
}

impl std::fmt::Display for DocKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "users/{}/periods/{}", self.user, self.period)
    }
}

/// Keyed document store shared by every device of a user.
///
/// `set` replaces the whole document; there is no partial update and no
/// concurrency token. Read errors surface as `CashplanError::Load`, write
/// errors as `CashplanError::Save`.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    async fn get(&self, key: &DocKey) -> Result<Option<Snapshot>>;
    async fn set(&self, key: &DocKey, doc: &Snapshot) -> Result<()>;
    async fn delete(&self, key: &DocKey) -> Result<()>;
    async fn list(&self, user: &str) -> Result<Vec<DocKey>>;
}

const STORE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    user_id TEXT NOT NULL,
    period TEXT NOT NULL,
    body TEXT NOT NULL,
    PRIMARY KEY (user_id, period)
);
";

/// Document store backed by a SQLite file, typically on a folder every
/// device can reach.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = get_connection(path)?;
        conn.execute_batch(STORE_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CashplanError::Other("document store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, key: &DocKey) -> Result<Option<Snapshot>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE user_id = ?1 AND period = ?2",
                rusqlite::params![key.user, key.period.to_string()],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| CashplanError::Load(format!("{key}: {e}")))?;
        body.map(|b| {
            serde_json::from_str(&b)
                .map_err(|e| CashplanError::Load(format!("{key}: malformed document: {e}")))
        })
        .transpose()
    }

    async fn set(&self, key: &DocKey, doc: &Snapshot) -> Result<()> {
        let body = serde_json::to_string(doc)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO documents (user_id, period, body) VALUES (?1, ?2, ?3) \
             ON CONFLICT(user_id, period) DO UPDATE SET body = excluded.body",
            rusqlite::params![key.user, key.period.to_string(), body],
        )
        .map_err(|e| CashplanError::Save(format!("{key}: {e}")))?;
        Ok(())
    }

    async fn delete(&self, key: &DocKey) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM documents WHERE user_id = ?1 AND period = ?2",
            rusqlite::params![key.user, key.period.to_string()],
        )
        .map_err(|e| CashplanError::Save(format!("{key}: {e}")))?;
        Ok(())
    }

    async fn list(&self, user: &str) -> Result<Vec<DocKey>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT period FROM documents WHERE user_id = ?1 ORDER BY period")
            .map_err(|e| CashplanError::Load(e.to_string()))?;
        let periods: Vec<String> = stmt
            .query_map([user], |row| row.get(0))
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|e| CashplanError::Load(e.to_string()))?;
        periods
            .iter()
            .map(|p| Ok(DocKey::new(user, p.parse()?)))
            .collect()
    }
}

/// In-memory store with switchable failures.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<std::collections::BTreeMap<DocKey, Snapshot>>,
    writes: std::sync::atomic::AtomicUsize,
    fail_reads: std::sync::atomic::AtomicBool,
    fail_writes: std::sync::atomic::AtomicBool,
    read_delay_ms: std::sync::atomic::AtomicU64,
    write_delay_ms: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl MemoryStore {
    pub fn put(&self, key: DocKey, doc: Snapshot) {
        self.docs.lock().unwrap().insert(key, doc);
    }

    pub fn doc(&self, key: &DocKey) -> Option<Snapshot> {
        self.docs.lock().unwrap().get(key).cloned()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Make every `get` wait this long before answering.
    pub fn slow_reads(&self, delay: std::time::Duration) {
        self.read_delay_ms
            .store(delay.as_millis() as u64, std::sync::atomic::Ordering::SeqCst);
    }

    /// Make every `set` wait this long before landing.
    pub fn slow_writes(&self, delay: std::time::Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &DocKey) -> Result<Option<Snapshot>> {
        let delay = self.read_delay_ms.load(std::sync::atomic::Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if self.fail_reads.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(CashplanError::Load(format!("{key}: unreachable")));
        }
        Ok(self.doc(key))
    }

    async fn set(&self, key: &DocKey, doc: &Snapshot) -> Result<()> {
        let delay = self.write_delay_ms.load(std::sync::atomic::Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(CashplanError::Save(format!("{key}: unreachable")));
        }
        self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.put(key.clone(), doc.clone());
        Ok(())
    }

    async fn delete(&self, key: &DocKey) -> Result<()> {
        self.docs.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, user: &str) -> Result<Vec<DocKey>> {
        Ok(self
            .docs
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.user == user)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RewardAccount;

    fn test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("shared.db")).unwrap();
        (dir, store)
    }

    fn key(user: &str, period: &str) -> DocKey {
        DocKey::new(user, period.parse().unwrap())
    }

    fn snapshot(ts: i64) -> Snapshot {
        Snapshot {
            cells: Default::default(),
            accounts: vec![RewardAccount::new("Alfa", 3, 5000.0)],
            categories: vec!["Taxi".to_string()],
            priorities: vec![],
            spending: Default::default(),
            strategy: None,
            last_modified: ts,
            device_id: "dev".to_string(),
        }
    }

    #[test]
    fn test_key_display() {
        assert_eq!(key("alice", "2025-03").to_string(), "users/alice/periods/2025-03");
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (_dir, store) = test_store();
        assert!(store.get(&key("alice", "2025-03")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_replaces_whole_document() {
        let (_dir, store) = test_store();
        let k = key("alice", "2025-03");
        store.set(&k, &snapshot(1)).await.unwrap();
        let mut second = snapshot(2);
        second.categories.clear();
        store.set(&k, &second).await.unwrap();
        let loaded = store.get(&k).await.unwrap().unwrap();
        assert_eq!(loaded, second);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let (_dir, store) = test_store();
        store.set(&key("alice", "2025-04"), &snapshot(1)).await.unwrap();
        store.set(&key("alice", "2025-03"), &snapshot(1)).await.unwrap();
        store.set(&key("bob", "2025-03"), &snapshot(1)).await.unwrap();
        let keys = store.list("alice").await.unwrap();
        assert_eq!(keys, vec![key("alice", "2025-03"), key("alice", "2025-04")]);
        store.delete(&key("alice", "2025-03")).await.unwrap();
        assert_eq!(store.list("alice").await.unwrap().len(), 1);
        assert_eq!(store.list("bob").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_document_is_load_failure() {
        let (_dir, store) = test_store();
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO documents (user_id, period, body) VALUES ('alice', '2025-03', '{not json')",
                [],
            )
            .unwrap();
        let err = store.get(&key("alice", "2025-03")).await.unwrap_err();
        assert!(matches!(err, CashplanError::Load(_)));
    }

    #[tokio::test]
    async fn test_two_handles_share_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");
        let phone = SqliteStore::open(&path).unwrap();
        let laptop = SqliteStore::open(&path).unwrap();
        phone.set(&key("alice", "2025-03"), &snapshot(7)).await.unwrap();
        let seen = laptop.get(&key("alice", "2025-03")).await.unwrap().unwrap();
        assert_eq!(seen.last_modified, 7);
    }
}
