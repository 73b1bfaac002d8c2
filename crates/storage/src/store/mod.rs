#![forbid(unsafe_code)]

mod boards;
mod error;
mod events;
mod tasks;
mod types;

pub use error::StoreError;
pub use events::EventRow;
pub use types::*;

use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction, TransactionBehavior, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DB_FILE: &str = "taskdeck.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_WRITE_ATTEMPTS: u32 = 3;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE);
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
            "#,
        )?;

        install_schema(&conn)?;

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Runs `op` under `BEGIN IMMEDIATE`, so the writer lock is held from the
    /// first read to commit and no other mutation can interleave with the
    /// read-positions-then-shift sequence. A contended lock surfaces as
    /// SQLITE_BUSY after the busy timeout; the whole operation is retried a
    /// bounded number of times before reporting `Conflict`.
    pub(crate) fn with_write_tx<T>(
        &mut self,
        mut op: impl FnMut(&Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match run_write_tx(&mut self.conn, &mut op) {
                Err(StoreError::Sql(err)) if is_busy(&err) => {
                    if attempts >= MAX_WRITE_ATTEMPTS {
                        return Err(StoreError::Conflict);
                    }
                }
                outcome => return outcome,
            }
        }
    }
}

fn run_write_tx<T>(
    conn: &mut Connection,
    op: &mut impl FnMut(&Transaction<'_>) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    // An error drops the transaction and rolls back every shift.
    let value = op(&tx)?;
    tx.commit()?;
    Ok(value)
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS boards (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS columns (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          board_id INTEGER NOT NULL,
          name TEXT NOT NULL,
          position INTEGER NOT NULL,
          color TEXT,
          created_at_ms INTEGER NOT NULL,
          FOREIGN KEY(board_id) REFERENCES boards(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_columns_board_position
          ON columns(board_id, position);

        CREATE TABLE IF NOT EXISTS tasks (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          column_id INTEGER NOT NULL,
          position INTEGER NOT NULL,
          title TEXT NOT NULL,
          description TEXT,
          priority TEXT NOT NULL,
          due_date TEXT,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          FOREIGN KEY(column_id) REFERENCES columns(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_column_position
          ON tasks(column_id, position);

        CREATE TABLE IF NOT EXISTS events (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          ts_ms INTEGER NOT NULL,
          task_id INTEGER,
          type TEXT NOT NULL,
          payload_json TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

pub(crate) fn count_tasks_tx(tx: &Transaction<'_>, column_id: i64) -> Result<i64, StoreError> {
    Ok(tx.query_row(
        "SELECT COUNT(*) FROM tasks WHERE column_id = ?1",
        params![column_id],
        |row| row.get(0),
    )?)
}

pub(crate) fn column_exists_tx(tx: &Transaction<'_>, column_id: i64) -> Result<bool, StoreError> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM columns WHERE id = ?1",
            params![column_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

pub(crate) fn board_exists_tx(tx: &Transaction<'_>, board_id: i64) -> Result<bool, StoreError> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM boards WHERE id = ?1",
            params![board_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == ErrorCode::DatabaseBusy || code.code == ErrorCode::DatabaseLocked
    )
}

pub(crate) fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
