#![forbid(unsafe_code)]

use super::events::insert_event_tx;
use super::{
    SqliteStore, StoreError, TaskCreateRequest, TaskPatch, TaskRow, column_exists_tx,
    count_tasks_tx, now_ms,
};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use serde_json::json;
use td_core::model::Priority;
use td_core::order::{self, Shift};

impl SqliteStore {
    /// Creates a task appended at the tail of `column_id` (position = current
    /// count of the column, read inside the transaction).
    pub fn task_insert(
        &mut self,
        column_id: i64,
        request: TaskCreateRequest,
    ) -> Result<TaskRow, StoreError> {
        if request.title.trim().is_empty() {
            return Err(StoreError::InvalidInput("task title must not be empty"));
        }

        self.with_write_tx(|tx| {
            if !column_exists_tx(tx, column_id)? {
                return Err(StoreError::ColumnNotFound);
            }

            let position = count_tasks_tx(tx, column_id)?;
            let now = now_ms();
            tx.execute(
                r#"
                INSERT INTO tasks(column_id, position, title, description, priority, due_date, created_at_ms, updated_at_ms)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                "#,
                params![
                    column_id,
                    position,
                    request.title,
                    request.description,
                    request.priority.as_str(),
                    request.due_date,
                    now
                ],
            )?;
            let task_id = tx.last_insert_rowid();

            insert_event_tx(
                tx,
                now,
                Some(task_id),
                "task.created",
                &json!({ "column": column_id, "position": position }).to_string(),
            )?;

            get_task_conn(tx, task_id)?.ok_or(StoreError::TaskNotFound)
        })
    }

    /// Removes the task and closes the gap it leaves: every task behind it in
    /// the same column steps back by one position.
    pub fn task_delete(&mut self, task_id: i64) -> Result<(), StoreError> {
        self.with_write_tx(|tx| {
            let Some((column_id, position)) = task_placement_tx(tx, task_id)? else {
                return Err(StoreError::TaskNotFound);
            };

            tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            tx.execute(
                "UPDATE tasks SET position = position - 1 WHERE column_id = ?1 AND position > ?2",
                params![column_id, position],
            )?;

            insert_event_tx(
                tx,
                now_ms(),
                Some(task_id),
                "task.deleted",
                &json!({ "column": column_id, "position": position }).to_string(),
            )?;
            Ok(())
        })
    }

    /// Repositions a task inside its current column. Targets are `0..count`;
    /// a target equal to the current position is a no-op.
    pub fn task_reorder(&mut self, task_id: i64, new_position: i64) -> Result<TaskRow, StoreError> {
        self.with_write_tx(|tx| {
            let Some((column_id, old_position)) = task_placement_tx(tx, task_id)? else {
                return Err(StoreError::TaskNotFound);
            };

            let count = count_tasks_tx(tx, column_id)?;
            if !order::reorder_in_bounds(new_position, count) {
                return Err(StoreError::PositionOutOfRange {
                    position: new_position,
                    count,
                });
            }

            if reorder_tx(tx, task_id, column_id, old_position, new_position)? {
                insert_event_tx(
                    tx,
                    now_ms(),
                    Some(task_id),
                    "task.reordered",
                    &json!({ "column": column_id, "from": old_position, "to": new_position })
                        .to_string(),
                )?;
            }

            get_task_conn(tx, task_id)?.ok_or(StoreError::TaskNotFound)
        })
    }

    /// Moves a task to `dest_column_id` at `new_position`. Targets are
    /// `0..=count` of the destination (tail append allowed). A move within
    /// one column degenerates to the single-column reorder; running both the
    /// gap-closing and slot-opening shifts there would double-shift.
    pub fn task_move(
        &mut self,
        task_id: i64,
        dest_column_id: i64,
        new_position: i64,
    ) -> Result<TaskRow, StoreError> {
        self.with_write_tx(|tx| {
            let Some((source_column_id, old_position)) = task_placement_tx(tx, task_id)? else {
                return Err(StoreError::TaskNotFound);
            };
            if !column_exists_tx(tx, dest_column_id)? {
                return Err(StoreError::ColumnNotFound);
            }

            if source_column_id == dest_column_id {
                let count = count_tasks_tx(tx, dest_column_id)?;
                if !order::reorder_in_bounds(new_position, count) {
                    return Err(StoreError::PositionOutOfRange {
                        position: new_position,
                        count,
                    });
                }
                reorder_tx(tx, task_id, source_column_id, old_position, new_position)?;
            } else {
                let count = count_tasks_tx(tx, dest_column_id)?;
                if !order::insert_in_bounds(new_position, count) {
                    return Err(StoreError::PositionOutOfRange {
                        position: new_position,
                        count,
                    });
                }
                tx.execute(
                    "UPDATE tasks SET position = position - 1 WHERE column_id = ?1 AND position > ?2",
                    params![source_column_id, old_position],
                )?;
                tx.execute(
                    "UPDATE tasks SET position = position + 1 WHERE column_id = ?1 AND position >= ?2",
                    params![dest_column_id, new_position],
                )?;
                tx.execute(
                    "UPDATE tasks SET column_id = ?2, position = ?3, updated_at_ms = ?4 WHERE id = ?1",
                    params![task_id, dest_column_id, new_position, now_ms()],
                )?;
            }

            insert_event_tx(
                tx,
                now_ms(),
                Some(task_id),
                "task.moved",
                &json!({
                    "from_column": source_column_id,
                    "to_column": dest_column_id,
                    "from": old_position,
                    "to": new_position
                })
                .to_string(),
            )?;

            get_task_conn(tx, task_id)?.ok_or(StoreError::TaskNotFound)
        })
    }

    /// Updates descriptive fields only. `column_id` and `position` are owned
    /// by the ordering operations and cannot be touched here.
    pub fn task_update(&mut self, task_id: i64, patch: TaskPatch) -> Result<TaskRow, StoreError> {
        if patch.is_empty() {
            return Err(StoreError::InvalidInput("no fields to edit"));
        }
        if patch
            .title
            .as_deref()
            .is_some_and(|title| title.trim().is_empty())
        {
            return Err(StoreError::InvalidInput("task title must not be empty"));
        }

        self.with_write_tx(|tx| {
            let Some(current) = get_task_conn(tx, task_id)? else {
                return Err(StoreError::TaskNotFound);
            };

            let mut changed: Vec<&str> = Vec::new();
            if patch.title.is_some() {
                changed.push("title");
            }
            if patch.description.is_some() {
                changed.push("description");
            }
            if patch.priority.is_some() {
                changed.push("priority");
            }
            if patch.due_date.is_some() {
                changed.push("due_date");
            }

            let title = patch.title.clone().unwrap_or(current.title);
            let description = patch.description.clone().unwrap_or(current.description);
            let priority = patch.priority.unwrap_or(current.priority);
            let due_date = patch.due_date.clone().unwrap_or(current.due_date);
            let now = now_ms();

            tx.execute(
                r#"
                UPDATE tasks
                SET title = ?2, description = ?3, priority = ?4, due_date = ?5, updated_at_ms = ?6
                WHERE id = ?1
                "#,
                params![task_id, title, description, priority.as_str(), due_date, now],
            )?;

            insert_event_tx(
                tx,
                now,
                Some(task_id),
                "task.updated",
                &json!({ "fields": changed }).to_string(),
            )?;

            get_task_conn(tx, task_id)?.ok_or(StoreError::TaskNotFound)
        })
    }

    pub fn get_task(&self, task_id: i64) -> Result<Option<TaskRow>, StoreError> {
        get_task_conn(&self.conn, task_id)
    }

    /// Tasks of one column, ordered by position.
    pub fn column_tasks(&self, column_id: i64) -> Result<Vec<TaskRow>, StoreError> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM columns WHERE id = ?1",
                params![column_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(StoreError::ColumnNotFound);
        }
        column_tasks_conn(&self.conn, column_id)
    }

    /// Test scaffolding for the density invariant: true iff the column's
    /// positions are exactly `{0, .., count-1}`.
    pub fn check_column_density(&self, column_id: i64) -> Result<bool, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT position FROM tasks WHERE column_id = ?1 ORDER BY position ASC")?;
        let positions = stmt
            .query_map(params![column_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(positions
            .iter()
            .enumerate()
            .all(|(expected, position)| *position == expected as i64))
    }
}

/// Single-column relocation: one batched shift over the half-open range
/// between the old and new slot, then the task itself. Returns false when the
/// target equals the current position and nothing was written.
fn reorder_tx(
    tx: &Transaction<'_>,
    task_id: i64,
    column_id: i64,
    old_position: i64,
    new_position: i64,
) -> Result<bool, StoreError> {
    match Shift::plan(old_position, new_position) {
        Shift::None => return Ok(false),
        Shift::TowardTail { after, up_to } => {
            // The moved task sits at `after`, outside the half-open range.
            tx.execute(
                "UPDATE tasks SET position = position - 1 \
                 WHERE column_id = ?1 AND position > ?2 AND position <= ?3",
                params![column_id, after, up_to],
            )?;
        }
        Shift::TowardHead { from, before } => {
            tx.execute(
                "UPDATE tasks SET position = position + 1 \
                 WHERE column_id = ?1 AND position >= ?2 AND position < ?3",
                params![column_id, from, before],
            )?;
        }
    }

    tx.execute(
        "UPDATE tasks SET position = ?2, updated_at_ms = ?3 WHERE id = ?1",
        params![task_id, new_position, now_ms()],
    )?;
    Ok(true)
}

fn task_placement_tx(
    tx: &Transaction<'_>,
    task_id: i64,
) -> Result<Option<(i64, i64)>, StoreError> {
    Ok(tx
        .query_row(
            "SELECT column_id, position FROM tasks WHERE id = ?1",
            params![task_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?)
}

fn get_task_conn(conn: &Connection, task_id: i64) -> Result<Option<TaskRow>, StoreError> {
    Ok(conn
        .query_row(
            r#"
            SELECT id, column_id, position, title, description, priority, due_date, created_at_ms, updated_at_ms
            FROM tasks
            WHERE id = ?1
            "#,
            params![task_id],
            map_task_row,
        )
        .optional()?)
}

pub(crate) fn column_tasks_conn(
    conn: &Connection,
    column_id: i64,
) -> Result<Vec<TaskRow>, StoreError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, column_id, position, title, description, priority, due_date, created_at_ms, updated_at_ms
        FROM tasks
        WHERE column_id = ?1
        ORDER BY position ASC
        "#,
    )?;
    let rows = stmt.query_map(params![column_id], map_task_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn map_task_row(row: &Row<'_>) -> rusqlite::Result<TaskRow> {
    let priority: String = row.get(5)?;
    let priority = Priority::parse(&priority).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown priority: {priority}").into(),
        )
    })?;
    Ok(TaskRow {
        id: row.get(0)?,
        column_id: row.get(1)?,
        position: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        priority,
        due_date: row.get(6)?,
        created_at_ms: row.get(7)?,
        updated_at_ms: row.get(8)?,
    })
}
