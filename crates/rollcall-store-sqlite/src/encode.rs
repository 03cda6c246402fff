//! Conversions between domain types and the plain-text column values stored
//! in SQLite.
//!
//! Timestamps are stored in the console form `YYYY-MM-DD HH:MM:SS` so that
//! SQLite's own `date()` function works on them. Row structs hold the raw
//! column values; decoding happens outside the connection thread.

use chrono::NaiveDateTime;
use rollcall_core::{
  admin::{AdminAccount, AdminId},
  attendance::{AttendanceEntry, AttendanceStatus, RecordId},
  identity::{Identity, IdentityId},
  time::{format_timestamp, parse_timestamp},
};

use crate::Result;

pub fn encode_ts(ts: NaiveDateTime) -> String { format_timestamp(ts) }

pub fn decode_ts(s: &str) -> Result<NaiveDateTime> { Ok(parse_timestamp(s)?) }

pub fn encode_status(s: &AttendanceStatus) -> String { s.as_str().to_owned() }

pub fn decode_status(s: String) -> AttendanceStatus { AttendanceStatus::from(s) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `students` row.
pub struct RawIdentity {
  pub student_id: i64,
  pub name:       String,
  pub rfid_tag:   String,
  pub created_at: String,
}

impl RawIdentity {
  pub const COLUMNS: &'static str = "student_id, name, rfid_tag, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id: row.get(0)?,
      name:       row.get(1)?,
      rfid_tag:   row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      id:         IdentityId(self.student_id),
      name:       self.name,
      tag:        self.rfid_tag,
      created_at: decode_ts(&self.created_at)?,
    })
  }
}

/// Raw values from `attendance` joined with `students`.
pub struct RawEntry {
  pub id:        i64,
  pub name:      String,
  pub rfid_tag:  String,
  pub scan_time: String,
  pub status:    String,
}

impl RawEntry {
  pub fn into_entry(self) -> Result<AttendanceEntry> {
    Ok(AttendanceEntry {
      record_id:   RecordId(self.id),
      name:        self.name,
      tag:         self.rfid_tag,
      occurred_at: decode_ts(&self.scan_time)?,
      status:      decode_status(self.status),
    })
  }
}

/// Raw values read from an `admins` row.
pub struct RawAdmin {
  pub admin_id:      i64,
  pub username:      String,
  pub password_hash: String,
  pub full_name:     String,
  pub created_at:    String,
  pub last_login:    Option<String>,
  pub is_active:     bool,
}

impl RawAdmin {
  pub const COLUMNS: &'static str =
    "admin_id, username, password_hash, full_name, created_at, last_login, is_active";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      admin_id:      row.get(0)?,
      username:      row.get(1)?,
      password_hash: row.get(2)?,
      full_name:     row.get(3)?,
      created_at:    row.get(4)?,
      last_login:    row.get(5)?,
      is_active:     row.get(6)?,
    })
  }

  pub fn into_admin(self) -> Result<AdminAccount> {
    Ok(AdminAccount {
      id:            AdminId(self.admin_id),
      username:      self.username,
      password_hash: self.password_hash,
      full_name:     self.full_name,
      created_at:    decode_ts(&self.created_at)?,
      last_login:    self.last_login.as_deref().map(decode_ts).transpose()?,
      active:        self.is_active,
    })
  }
}
