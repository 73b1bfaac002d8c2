#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use td_core::model::{DEFAULT_COLUMNS, Priority};
use td_storage::{SqliteStore, StoreError, TaskCreateRequest, TaskPatch};

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("td_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn open_store(dir: &Path) -> SqliteStore {
    SqliteStore::open(dir).expect("open store")
}

#[test]
fn board_create_default_seeds_the_palette() {
    let dir = temp_dir("board_create_default_seeds_the_palette");
    let mut store = open_store(&dir);

    let (board, columns) = store.board_create_default("Main Board").expect("create board");
    assert_eq!(board.name, "Main Board");
    assert_eq!(columns.len(), DEFAULT_COLUMNS.len());
    for (position, (column, (name, color))) in
        columns.iter().zip(DEFAULT_COLUMNS).enumerate()
    {
        assert_eq!(column.board_id, board.id);
        assert_eq!(column.position, position as i64);
        assert_eq!(column.name, *name);
        assert_eq!(column.color.as_deref(), Some(*color));
    }

    let listed = store.board_columns(board.id).expect("board columns");
    assert_eq!(listed, columns);
}

#[test]
fn column_create_appends_and_requires_a_board() {
    let dir = temp_dir("column_create_appends_and_requires_a_board");
    let mut store = open_store(&dir);
    let (board, _) = store.board_create_default("Main Board").expect("create board");

    let extra = store
        .column_create(board.id, "Blocked", Some("#64748B"))
        .expect("create column");
    assert_eq!(extra.position, DEFAULT_COLUMNS.len() as i64);

    let err = store
        .column_create(9999, "Nowhere", None)
        .expect_err("missing board");
    assert!(matches!(err, StoreError::BoardNotFound), "got {err:?}");

    let err = store
        .column_create(board.id, "   ", None)
        .expect_err("blank name");
    assert!(matches!(err, StoreError::InvalidInput(_)), "got {err:?}");
}

#[test]
fn task_update_edits_attributes_but_never_ordering_fields() {
    let dir = temp_dir("task_update_edits_attributes_but_never_ordering_fields");
    let mut store = open_store(&dir);
    let (board, columns) = store.board_create_default("Main Board").expect("create board");
    let _ = board;
    let column_id = columns[0].id;

    let a = store
        .task_insert(column_id, TaskCreateRequest::titled("A"))
        .expect("insert A");
    let b = store
        .task_insert(column_id, TaskCreateRequest::titled("B"))
        .expect("insert B");

    let updated = store
        .task_update(
            b.id,
            TaskPatch {
                title: Some("B (reworded)".to_string()),
                description: Some(Some("details".to_string())),
                priority: Some(Priority::High),
                due_date: None,
            },
        )
        .expect("update B");

    assert_eq!(updated.title, "B (reworded)");
    assert_eq!(updated.description.as_deref(), Some("details"));
    assert_eq!(updated.priority, Priority::High);
    assert_eq!(updated.column_id, b.column_id);
    assert_eq!(updated.position, b.position);

    // Clearing an optional field goes through the double-Option.
    let cleared = store
        .task_update(
            b.id,
            TaskPatch {
                description: Some(None),
                ..TaskPatch::default()
            },
        )
        .expect("clear description");
    assert_eq!(cleared.description, None);

    let untouched = store.get_task(a.id).expect("get A").expect("A exists");
    assert_eq!(untouched.position, 0);

    let err = store
        .task_update(b.id, TaskPatch::default())
        .expect_err("empty patch");
    assert!(matches!(err, StoreError::InvalidInput(_)), "got {err:?}");

    let err = store
        .task_update(424242, TaskPatch { title: Some("x".into()), ..TaskPatch::default() })
        .expect_err("missing task");
    assert!(matches!(err, StoreError::TaskNotFound), "got {err:?}");
}

#[test]
fn board_snapshot_returns_ordered_columns_with_ordered_tasks() {
    let dir = temp_dir("board_snapshot_returns_ordered_columns_with_ordered_tasks");
    let mut store = open_store(&dir);
    let (board, columns) = store.board_create_default("Main Board").expect("create board");

    let first = columns[0].id;
    let second = columns[1].id;
    for title in ["A", "B"] {
        store
            .task_insert(first, TaskCreateRequest::titled(title))
            .expect("insert task");
    }
    let c = store
        .task_insert(second, TaskCreateRequest::titled("C"))
        .expect("insert task");
    store.task_move(c.id, first, 1).expect("move C");

    let snapshot = store.board_snapshot(board.id).expect("snapshot");
    assert_eq!(snapshot.len(), columns.len());
    let (ref column, ref tasks) = snapshot[0];
    assert_eq!(column.id, first);
    let titles: Vec<&str> = tasks.iter().map(|task| task.title.as_str()).collect();
    assert_eq!(titles, ["A", "C", "B"]);
    assert!(snapshot[1].1.is_empty());

    let err = store.board_snapshot(9999).expect_err("missing board");
    assert!(matches!(err, StoreError::BoardNotFound), "got {err:?}");
}

#[test]
fn events_record_each_mutation_in_commit_order() {
    let dir = temp_dir("events_record_each_mutation_in_commit_order");
    let mut store = open_store(&dir);
    let (_, columns) = store.board_create_default("Main Board").expect("create board");
    let column_id = columns[0].id;

    let a = store
        .task_insert(column_id, TaskCreateRequest::titled("A"))
        .expect("insert A");
    let b = store
        .task_insert(column_id, TaskCreateRequest::titled("B"))
        .expect("insert B");
    store.task_reorder(b.id, 0).expect("reorder B");
    store.task_move(a.id, columns[1].id, 0).expect("move A");
    store.task_delete(a.id).expect("delete A");

    let events = store.list_events(0, 50).expect("list events");
    let types: Vec<&str> = events
        .iter()
        .map(|event| event.event_type.as_str())
        .collect();
    assert_eq!(
        types,
        [
            "task.created",
            "task.created",
            "task.reordered",
            "task.moved",
            "task.deleted"
        ]
    );
    assert!(events.iter().all(|event| !event.payload_json.is_empty()));

    // A no-op reorder commits no event.
    store.task_reorder(b.id, 0).expect("noop reorder");
    assert_eq!(store.list_events(0, 50).expect("list events").len(), events.len());

    // Resuming from a sequence number skips what was already seen.
    let tail = store
        .list_events(events[1].seq, 50)
        .expect("list events from cursor");
    assert_eq!(tail.len(), 3);
    assert_eq!(tail[0].event_type, "task.reordered");
}
