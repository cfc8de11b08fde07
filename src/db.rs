use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};

use crate::error::{CashplanError, Result};
use crate::period::Period;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS watermarks (
    user_id TEXT NOT NULL,
    period TEXT NOT NULL,
    last_modified INTEGER NOT NULL,
    updated_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, period)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn get_metadata(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row("SELECT value FROM metadata WHERE key = ?1", [key], |r| r.get(0))
        .ok()
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )?;
    Ok(())
}

/// State this installation keeps outside the shared store: its device
/// identifier and, per (user, period), the `lastModified` of the last shared
/// snapshot it reconciled with.
pub struct LocalDb {
    conn: Mutex<Connection>,
}

impl LocalDb {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = get_connection(db_path)?;
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CashplanError::Other("local database lock poisoned".to_string()))
    }

    /// This installation's identifier, generated on first use.
    pub fn device_id(&self) -> Result<String> {
        let conn = self.conn()?;
        if let Some(id) = get_metadata(&conn, "device_id") {
            return Ok(id);
        }
        let id = hex::encode(rand::random::<[u8; 16]>());
        set_metadata(&conn, "device_id", &id)?;
        log::info!("generated device id {id}");
        Ok(id)
    }

    pub fn watermark(&self, user: &str, period: Period) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT last_modified FROM watermarks WHERE user_id = ?1 AND period = ?2",
                rusqlite::params![user, period.to_string()],
                |r| r.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_watermark(&self, user: &str, period: Period, last_modified: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO watermarks (user_id, period, last_modified) VALUES (?1, ?2, ?3) \
             ON CONFLICT(user_id, period) DO UPDATE SET \
             last_modified = excluded.last_modified, updated_at = datetime('now')",
            rusqlite::params![user, period.to_string(), last_modified],
        )?;
        Ok(())
    }

    /// Forget every watermark for `user`. Returns the number removed.
    pub fn clear_watermarks(&self, user: &str) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM watermarks WHERE user_id = ?1", [user])?;
        Ok(removed)
    }
}
