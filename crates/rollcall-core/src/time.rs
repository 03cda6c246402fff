//! Wall-clock helpers.
//!
//! Every timestamp in the system is a local, second-precision
//! [`NaiveDateTime`] rendered as `YYYY-MM-DD HH:MM:SS`. The same text form is
//! used in the database and on the operator console.

use chrono::{Local, NaiveDate, NaiveDateTime, SubsecRound as _};

use crate::{Error, Result};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The current local time, truncated to whole seconds so that what is stored
/// is exactly what was returned.
pub fn now() -> NaiveDateTime { Local::now().naive_local().trunc_subsecs(0) }

/// Today's local date.
pub fn today() -> NaiveDate { now().date() }

pub fn format_timestamp(ts: NaiveDateTime) -> String {
  ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
  NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map_err(|source| {
    Error::InvalidTimestamp {
      value: s.to_owned(),
      source,
    }
  })
}

pub fn format_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn parse_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|source| Error::InvalidDate {
    value: s.to_owned(),
    source,
  })
}

/// `#[serde(with = "rollcall_core::time::text")]` for timestamp fields that
/// should appear in the console form rather than ISO 8601.
pub mod text {
  use chrono::NaiveDateTime;
  use serde::{Deserialize as _, Deserializer, Serializer, de::Error as _};

  pub fn serialize<S: Serializer>(
    ts: &NaiveDateTime,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&super::format_timestamp(*ts))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<NaiveDateTime, D::Error> {
    let s = String::deserialize(deserializer)?;
    super::parse_timestamp(&s).map_err(D::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Timelike as _;

  #[test]
  fn timestamp_text_form() {
    let ts = parse_timestamp("2024-01-01 08:00:00").unwrap();
    assert_eq!(ts.hour(), 8);
    assert_eq!(format_timestamp(ts), "2024-01-01 08:00:00");
  }

  #[test]
  fn rfc3339_is_rejected() {
    let err = parse_timestamp("2024-01-01T08:00:00Z").unwrap_err();
    assert!(matches!(err, Error::InvalidTimestamp { .. }));
  }

  #[test]
  fn now_has_no_subseconds() {
    assert_eq!(now().nanosecond(), 0);
  }

  #[test]
  fn date_text_form() {
    let d = parse_date("2024-03-09").unwrap();
    assert_eq!(format_date(d), "2024-03-09");
    assert!(parse_date("09/03/2024").is_err());
  }
}
