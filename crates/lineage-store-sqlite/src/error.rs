//! Error type for `lineage-store-sqlite`.

use lineage_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] lineage_core::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl Error {
  /// Classify for operators. Unique-constraint failures surface as
  /// conflicts (an id or natural key already taken).
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::Sqlite(e) if is_constraint(e) => ErrorKind::Conflict,
      Self::Database(tokio_rusqlite::Error::Rusqlite(e)) if is_constraint(e) => {
        ErrorKind::Conflict
      }
      _ => ErrorKind::Storage,
    }
  }
}

fn is_constraint(e: &rusqlite::Error) -> bool {
  matches!(
    e.sqlite_error_code(),
    Some(rusqlite::ErrorCode::ConstraintViolation)
  )
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
