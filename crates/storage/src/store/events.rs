#![forbid(unsafe_code)]

use super::{SqliteStore, StoreError};
use rusqlite::{Transaction, params};

/// Activity record appended in the same transaction as the mutation it
/// describes; the feed is therefore consistent with the task table at every
/// commit boundary.
#[derive(Clone, Debug)]
pub struct EventRow {
    pub seq: i64,
    pub ts_ms: i64,
    pub task_id: Option<i64>,
    pub event_type: String,
    pub payload_json: String,
}

impl SqliteStore {
    pub fn list_events(&self, since_seq: i64, limit: usize) -> Result<Vec<EventRow>, StoreError> {
        let limit = i64::try_from(limit).map_err(|_| StoreError::InvalidInput("numeric overflow"))?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, ts_ms, task_id, type, payload_json
            FROM events
            WHERE seq > ?1
            ORDER BY seq ASC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![since_seq, limit], |row| {
            Ok(EventRow {
                seq: row.get(0)?,
                ts_ms: row.get(1)?,
                task_id: row.get(2)?,
                event_type: row.get(3)?,
                payload_json: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

pub(crate) fn insert_event_tx(
    tx: &Transaction<'_>,
    ts_ms: i64,
    task_id: Option<i64>,
    event_type: &str,
    payload_json: &str,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO events(ts_ms, task_id, type, payload_json) VALUES (?1, ?2, ?3, ?4)",
        params![ts_ms, task_id, event_type, payload_json],
    )?;
    Ok(())
}
