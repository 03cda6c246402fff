//! Error types for `rollcall-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid timestamp {value:?}: {source}")]
  InvalidTimestamp {
    value:  String,
    #[source]
    source: chrono::ParseError,
  },

  #[error("invalid date {value:?}: {source}")]
  InvalidDate {
    value:  String,
    #[source]
    source: chrono::ParseError,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
