//! Error type for `sopready-store-sqlite`.

use sopready_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A `UNIQUE` constraint refused the write (facility or requirement code).
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value outside its domain (unknown priority, bad cadence).
  #[error("corrupt row: {0}")]
  Decode(String),
}

impl Error {
  /// Classify a failed write, separating unique-key clashes from everything
  /// else.
  pub(crate) fn from_write(err: tokio_rusqlite::Error) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, msg)) = &err
      && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    {
      return Self::Conflict(msg.clone().unwrap_or_else(|| e.to_string()));
    }
    Self::Database(err)
  }
}

impl StoreError for Error {
  fn is_conflict(&self) -> bool { matches!(self, Self::Conflict(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
