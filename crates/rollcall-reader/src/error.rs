//! Reasons a line from the reader does not become an event.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("line is not valid UTF-8: {0}")]
  InvalidUtf8(#[from] std::str::Utf8Error),

  #[error("line exceeded {0} bytes without a terminator")]
  TooLong(usize),

  #[error("empty line")]
  Empty,

  #[error("unrecognised line: {0:?}")]
  Unrecognized(String),
}

impl Error {
  /// `true` when the bytes themselves were damaged, as opposed to a
  /// well-formed line that simply carries nothing of interest.
  pub fn is_decode_failure(&self) -> bool {
    matches!(self, Self::InvalidUtf8(_) | Self::TooLong(_))
  }
}
