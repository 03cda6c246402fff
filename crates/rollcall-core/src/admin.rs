//! Administrator accounts for the reporting tools.

use chrono::NaiveDateTime;

/// Surrogate key of an [`AdminAccount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdminId(pub i64);

/// An operator account. Deliberately not `Serialize`: it carries the
/// password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAccount {
  pub id:            AdminId,
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub full_name:     String,
  pub created_at:    NaiveDateTime,
  pub last_login:    Option<NaiveDateTime>,
  pub active:        bool,
}

/// Input for [`AttendanceStore::create_admin`](crate::store::AttendanceStore::create_admin).
#[derive(Debug, Clone)]
pub struct NewAdmin {
  pub username:      String,
  pub password_hash: String,
  pub full_name:     String,
}
