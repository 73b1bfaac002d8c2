#![forbid(unsafe_code)]

use td_core::model::Priority;

#[derive(Clone, Debug, PartialEq)]
pub struct TaskRow {
    pub id: i64,
    pub column_id: i64,
    pub position: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnRow {
    pub id: i64,
    pub board_id: i64,
    pub name: String,
    pub position: i64,
    pub color: Option<String>,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoardRow {
    pub id: i64,
    pub name: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct TaskCreateRequest {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<String>,
}

impl TaskCreateRequest {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: Priority::default(),
            due_date: None,
        }
    }
}

/// Attribute-only patch; ordering fields (`column_id`, `position`) are owned
/// by the engine operations and are deliberately absent here.
#[derive(Clone, Debug, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }
}
