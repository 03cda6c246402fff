//! Error type for `rollcall-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] rollcall_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A count or id read back from SQLite did not fit the Rust type.
  #[error("out-of-range value in column {0}")]
  OutOfRange(&'static str),
}

impl Error {
  /// `true` when SQLite rejected the write because of a UNIQUE, NOT NULL or
  /// FOREIGN KEY constraint.
  pub fn is_constraint_violation(&self) -> bool {
    matches!(
      self,
      Self::Database(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
        e,
        _,
      ))) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
