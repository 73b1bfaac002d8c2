#![forbid(unsafe_code)]

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    PositionOutOfRange { position: i64, count: i64 },
    BoardNotFound,
    ColumnNotFound,
    TaskNotFound,
    Conflict,
}

impl StoreError {
    /// Transient contention; the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::PositionOutOfRange { position, count } => {
                write!(f, "position out of range (position={position}, count={count})")
            }
            Self::BoardNotFound => write!(f, "board not found"),
            Self::ColumnNotFound => write!(f, "column not found"),
            Self::TaskNotFound => write!(f, "task not found"),
            Self::Conflict => write!(f, "write conflict, retry"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}
