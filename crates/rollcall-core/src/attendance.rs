//! Attendance records and the read models built from them.
//!
//! Records are append-only. They are written once per resolved scan and are
//! only ever removed by cascade when their identity is removed.

use std::{collections::BTreeMap, fmt};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::identity::IdentityId;

/// Surrogate key of an [`AttendanceRecord`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Status label stored with each record.
///
/// Ingestion only ever produces [`AttendanceStatus::Present`]. The other
/// variants exist so rows written by other tooling still load and report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AttendanceStatus {
  #[default]
  Present,
  Absent,
  Other(String),
}

impl AttendanceStatus {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Present => "Present",
      Self::Absent => "Absent",
      Self::Other(s) => s,
    }
  }
}

impl From<String> for AttendanceStatus {
  fn from(s: String) -> Self {
    match s.as_str() {
      "Present" => Self::Present,
      "Absent" => Self::Absent,
      _ => Self::Other(s),
    }
  }
}

impl From<AttendanceStatus> for String {
  fn from(s: AttendanceStatus) -> Self {
    match s {
      AttendanceStatus::Other(s) => s,
      known => known.as_str().to_owned(),
    }
  }
}

impl fmt::Display for AttendanceStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// One observed presence event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub id:          RecordId,
  pub identity_id: IdentityId,
  #[serde(with = "crate::time::text")]
  pub occurred_at: NaiveDateTime,
  pub status:      AttendanceStatus,
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// A record joined with the identity it belongs to, as shown in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
  pub record_id:   RecordId,
  pub name:        String,
  pub tag:         String,
  #[serde(with = "crate::time::text")]
  pub occurred_at: NaiveDateTime,
  pub status:      AttendanceStatus,
}

/// Parameters for [`AttendanceStore::list_attendance`](crate::store::AttendanceStore::list_attendance).
#[derive(Debug, Clone, Default)]
pub struct AttendanceQuery {
  /// Restrict to records whose local date is `date`.
  pub date:  Option<NaiveDate>,
  pub limit: Option<usize>,
}

/// Per-day headline numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
  pub date:      NaiveDate,
  /// Every enrolled identity.
  pub total:     u64,
  /// Distinct identities with at least one `Present` record that day.
  pub present:   u64,
  pub absent:    u64,
  /// Record counts per status label. `Present` and `Absent` are always
  /// listed, even at zero.
  pub by_status: BTreeMap<String, u64>,
}
