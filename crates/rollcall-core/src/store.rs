//! The `AttendanceStore` trait.
//!
//! Implemented by storage backends (e.g. `rollcall-store-sqlite`). The
//! ingestion loop and the bootstrap code depend on this abstraction, not on a
//! concrete backend.

use std::future::Future;

use chrono::{NaiveDate, NaiveDateTime};

use crate::{
  admin::{AdminAccount, AdminId, NewAdmin},
  attendance::{
    AttendanceEntry, AttendanceQuery, AttendanceRecord, AttendanceStatus,
    DailySummary,
  },
  identity::{Identity, IdentityId, NewIdentity},
};

/// Abstraction over a rollcall storage backend.
///
/// Attendance records are append-only: there is no method that updates one.
/// All methods return `Send` futures so the trait can be driven from a
/// multi-threaded tokio runtime.
pub trait AttendanceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identities ────────────────────────────────────────────────────────

  /// Insert an identity unless one with the same tag already exists.
  ///
  /// Returns `true` if a row was inserted. A tag conflict is not an error.
  fn seed_identity(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Resolve a scanned label to an identity by exact, case-sensitive name.
  ///
  /// Names are not unique. When several identities share `name`, the one
  /// with the lowest id is returned.
  fn find_identity_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  fn get_identity(
    &self,
    id: IdentityId,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// All identities, ordered by id.
  fn list_identities(
    &self,
  ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + '_;

  /// Delete an identity and, by cascade, all of its attendance records.
  /// Returns `false` if no such identity existed.
  fn remove_identity(
    &self,
    id: IdentityId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Attendance: append-only writes ──────────────────────────────────

  /// Append one attendance record. The row is committed before the future
  /// resolves; on error nothing is written.
  fn record_attendance(
    &self,
    identity: IdentityId,
    occurred_at: NaiveDateTime,
    status: AttendanceStatus,
  ) -> impl Future<Output = Result<AttendanceRecord, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Records joined with their identity, newest first.
  fn list_attendance<'a>(
    &'a self,
    query: &'a AttendanceQuery,
  ) -> impl Future<Output = Result<Vec<AttendanceEntry>, Self::Error>> + Send + 'a;

  fn daily_summary(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<DailySummary, Self::Error>> + Send + '_;

  // ── Admin accounts ────────────────────────────────────────────────────

  fn get_admin<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<AdminAccount>, Self::Error>> + Send + 'a;

  /// Create an admin account unless the username is taken.
  /// Returns `true` if a row was inserted.
  fn create_admin(
    &self,
    input: NewAdmin,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Replace the password hash for `username`. Returns `false` if there is
  /// no such account.
  fn set_admin_password<'a>(
    &'a self,
    username: &'a str,
    password_hash: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn touch_admin_login(
    &self,
    id: AdminId,
    at: NaiveDateTime,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Release the underlying handle. Consumes the store so it can only
  /// happen once.
  fn close(self) -> impl Future<Output = Result<(), Self::Error>> + Send
  where
    Self: Sized;
}
