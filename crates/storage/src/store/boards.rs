#![forbid(unsafe_code)]

use super::tasks::column_tasks_conn;
use super::{
    BoardRow, ColumnRow, SqliteStore, StoreError, TaskRow, board_exists_tx, now_ms,
};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use td_core::model::DEFAULT_COLUMNS;

impl SqliteStore {
    pub fn board_create(&mut self, name: &str) -> Result<BoardRow, StoreError> {
        let name = valid_name(name, "board name must not be empty")?;
        self.with_write_tx(|tx| board_create_tx(tx, name))
    }

    /// Creates a board pre-seeded with the default column palette, all in one
    /// transaction.
    pub fn board_create_default(
        &mut self,
        name: &str,
    ) -> Result<(BoardRow, Vec<ColumnRow>), StoreError> {
        let name = valid_name(name, "board name must not be empty")?;
        self.with_write_tx(|tx| {
            let board = board_create_tx(tx, name)?;
            let mut columns = Vec::with_capacity(DEFAULT_COLUMNS.len());
            for (column_name, color) in DEFAULT_COLUMNS {
                columns.push(column_create_tx(tx, board.id, column_name, Some(color))?);
            }
            Ok((board, columns))
        })
    }

    /// Appends a column at the tail of the board's column sequence.
    pub fn column_create(
        &mut self,
        board_id: i64,
        name: &str,
        color: Option<&str>,
    ) -> Result<ColumnRow, StoreError> {
        let name = valid_name(name, "column name must not be empty")?;
        self.with_write_tx(|tx| {
            if !board_exists_tx(tx, board_id)? {
                return Err(StoreError::BoardNotFound);
            }
            column_create_tx(tx, board_id, name, color)
        })
    }

    pub fn get_board(&self, board_id: i64) -> Result<Option<BoardRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, created_at_ms FROM boards WHERE id = ?1",
                params![board_id],
                map_board_row,
            )
            .optional()?)
    }

    /// Columns of one board, ordered by position.
    pub fn board_columns(&self, board_id: i64) -> Result<Vec<ColumnRow>, StoreError> {
        if self.get_board(board_id)?.is_none() {
            return Err(StoreError::BoardNotFound);
        }
        board_columns_conn(&self.conn, board_id)
    }

    /// Full read path for callers rendering a board: ordered columns, each
    /// with its tasks ordered by position.
    pub fn board_snapshot(
        &self,
        board_id: i64,
    ) -> Result<Vec<(ColumnRow, Vec<TaskRow>)>, StoreError> {
        let columns = self.board_columns(board_id)?;
        let mut snapshot = Vec::with_capacity(columns.len());
        for column in columns {
            let tasks = column_tasks_conn(&self.conn, column.id)?;
            snapshot.push((column, tasks));
        }
        Ok(snapshot)
    }
}

fn board_create_tx(tx: &Transaction<'_>, name: &str) -> Result<BoardRow, StoreError> {
    let now = now_ms();
    tx.execute(
        "INSERT INTO boards(name, created_at_ms) VALUES (?1, ?2)",
        params![name, now],
    )?;
    Ok(BoardRow {
        id: tx.last_insert_rowid(),
        name: name.to_string(),
        created_at_ms: now,
    })
}

fn column_create_tx(
    tx: &Transaction<'_>,
    board_id: i64,
    name: &str,
    color: Option<&str>,
) -> Result<ColumnRow, StoreError> {
    let position: i64 = tx.query_row(
        "SELECT COUNT(*) FROM columns WHERE board_id = ?1",
        params![board_id],
        |row| row.get(0),
    )?;
    let now = now_ms();
    tx.execute(
        "INSERT INTO columns(board_id, name, position, color, created_at_ms) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![board_id, name, position, color, now],
    )?;
    Ok(ColumnRow {
        id: tx.last_insert_rowid(),
        board_id,
        name: name.to_string(),
        position,
        color: color.map(str::to_string),
        created_at_ms: now,
    })
}

fn board_columns_conn(conn: &Connection, board_id: i64) -> Result<Vec<ColumnRow>, StoreError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, board_id, name, position, color, created_at_ms
        FROM columns
        WHERE board_id = ?1
        ORDER BY position ASC
        "#,
    )?;
    let rows = stmt.query_map(params![board_id], map_column_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn map_board_row(row: &Row<'_>) -> rusqlite::Result<BoardRow> {
    Ok(BoardRow {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at_ms: row.get(2)?,
    })
}

fn map_column_row(row: &Row<'_>) -> rusqlite::Result<ColumnRow> {
    Ok(ColumnRow {
        id: row.get(0)?,
        board_id: row.get(1)?,
        name: row.get(2)?,
        position: row.get(3)?,
        color: row.get(4)?,
        created_at_ms: row.get(5)?,
    })
}

fn valid_name<'a>(name: &'a str, message: &'static str) -> Result<&'a str, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidInput(message));
    }
    Ok(name)
}
