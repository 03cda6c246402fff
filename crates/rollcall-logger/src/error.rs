//! Error types for the logger.
//!
//! Only the fatal categories live here. Per-line problems (undecodable
//! bytes, unknown names, failed inserts) are reported as
//! [`Outcome`](crate::ingest::Outcome)s and never stop the loop.

use std::path::PathBuf;

use thiserror::Error;

/// Storage could not be prepared. The process must not start ingesting.
#[derive(Debug, Error)]
pub enum InitError {
  #[error("failed to open store at {path:?}: {source}")]
  Open {
    path:   PathBuf,
    #[source]
    source: rollcall_store_sqlite::Error,
  },

  #[error("failed to initialise store: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("failed to hash bootstrap password: {0}")]
  Credential(String),
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to open input source {port}: {source}")]
  Connect {
    port:   String,
    #[source]
    source: tokio_serial::Error,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("password hashing failed: {0}")]
  Credential(String),

  #[error("invalid credentials")]
  Unauthorized,

  #[error("no admin account named {0:?}")]
  AdminNotFound(String),

  #[error("admin account {0:?} already exists")]
  AdminExists(String),

  #[error("{0} must not be empty")]
  MissingField(&'static str),

  #[error("output error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("output error: {0}")]
  Csv(#[from] csv::Error),

  #[error("output error: {0}")]
  Io(#[from] std::io::Error),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
