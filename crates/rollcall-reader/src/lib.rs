//! Line protocol of the RFID reader firmware.
//!
//! The reader prints one line per event on its serial link:
//!
//! ```text
//! Hosea Mbugua,2024-01-01 08:00:00
//! Unknown card detected
//! ```
//!
//! The first shape is a scan of an enrolled card: the holder's name, a comma,
//! then a reader-side payload (usually its clock) which is ignored. The
//! second is printed when the card's tag is not in the firmware's table.
//! Anything else (boot banners, blank lines) carries no event.
//!
//! Parsing is pure and total: every byte sequence maps to a [`ParsedEvent`].
//!
//! ```
//! use rollcall_reader::{ParsedEvent, parse};
//!
//! let event = parse(b"Hosea Mbugua,2024-01-01 08:00:00\r\n");
//! assert_eq!(event, ParsedEvent::Scan { label: "Hosea Mbugua".into() });
//! ```

pub mod error;

pub use error::Error;

/// Printed by the firmware when it reads a tag it does not know.
pub const UNKNOWN_CARD_SENTINEL: &str = "Unknown card detected";

/// Separates the holder's name from the reader payload.
pub const SEPARATOR: char = ',';

/// The meaning of one line from the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEvent {
  /// An enrolled card was presented. `label` is the name the firmware
  /// printed, trimmed.
  Scan { label: String },
  /// The firmware saw a card it could not identify.
  UnknownTag,
  /// Nothing usable on this line.
  Malformed(Error),
}

/// Parse one raw line, with or without its `\n` / `\r\n` terminator.
///
/// A line containing the separator is a scan even if it also contains the
/// sentinel phrase.
pub fn parse(raw: &[u8]) -> ParsedEvent {
  let text = match std::str::from_utf8(raw) {
    Ok(text) => text.trim(),
    Err(e) => return ParsedEvent::Malformed(Error::InvalidUtf8(e)),
  };

  if let Some((label, _payload)) = text.split_once(SEPARATOR) {
    return ParsedEvent::Scan {
      label: label.trim().to_owned(),
    };
  }

  if text.contains(UNKNOWN_CARD_SENTINEL) {
    return ParsedEvent::UnknownTag;
  }

  if text.is_empty() {
    ParsedEvent::Malformed(Error::Empty)
  } else {
    ParsedEvent::Malformed(Error::Unrecognized(text.to_owned()))
  }
}
