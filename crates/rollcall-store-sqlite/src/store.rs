//! [`SqliteStore`], the SQLite implementation of [`AttendanceStore`].

use std::{collections::BTreeMap, path::Path};

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::OptionalExtension as _;

use rollcall_core::{
  admin::{AdminAccount, AdminId, NewAdmin},
  attendance::{
    AttendanceEntry, AttendanceQuery, AttendanceRecord, AttendanceStatus,
    DailySummary, RecordId,
  },
  identity::{Identity, IdentityId, NewIdentity},
  store::AttendanceStore,
  time::{self, format_date},
};

use crate::{
  encode::{encode_status, encode_ts, RawAdmin, RawEntry, RawIdentity},
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An attendance store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Closing any
/// clone closes the connection for all of them.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened attendance store");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn to_count(n: i64, column: &'static str) -> Result<u64> {
  u64::try_from(n).map_err(|_| Error::OutOfRange(column))
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  type Error = Error;

  // ── Identities ────────────────────────────────────────────────────────────

  async fn seed_identity(&self, input: NewIdentity) -> Result<bool> {
    let at_str = encode_ts(time::now());

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO students (name, rfid_tag, created_at) VALUES (?1, ?2, ?3)
           ON CONFLICT (rfid_tag) DO NOTHING",
          rusqlite::params![input.name, input.tag, at_str],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(inserted)
  }

  async fn find_identity_by_name(&self, name: &str) -> Result<Option<Identity>> {
    let name = name.to_owned();

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM students WHERE name = ?1
               ORDER BY student_id LIMIT 1",
              RawIdentity::COLUMNS
            ),
            rusqlite::params![name],
            RawIdentity::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn get_identity(&self, id: IdentityId) -> Result<Option<Identity>> {
    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM students WHERE student_id = ?1",
              RawIdentity::COLUMNS
            ),
            rusqlite::params![id.0],
            RawIdentity::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn list_identities(&self) -> Result<Vec<Identity>> {
    let raws: Vec<RawIdentity> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM students ORDER BY student_id",
          RawIdentity::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawIdentity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIdentity::into_identity).collect()
  }

  async fn remove_identity(&self, id: IdentityId) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM students WHERE student_id = ?1",
          rusqlite::params![id.0],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(removed)
  }

  // ── Attendance: append-only writes ──────────────────────────────────────

  async fn record_attendance(
    &self,
    identity:    IdentityId,
    occurred_at: NaiveDateTime,
    status:      AttendanceStatus,
  ) -> Result<AttendanceRecord> {
    let at_str     = encode_ts(occurred_at);
    let status_str = encode_status(&status);

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO attendance (student_id, scan_time, status) VALUES (?1, ?2, ?3)",
          rusqlite::params![identity.0, at_str, status_str],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
      })
      .await?;

    Ok(AttendanceRecord {
      id: RecordId(id),
      identity_id: identity,
      occurred_at,
      status,
    })
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn list_attendance(
    &self,
    query: &AttendanceQuery,
  ) -> Result<Vec<AttendanceEntry>> {
    let date_str = query.date.map(format_date);
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val = query.limit.map_or(-1, |l| l as i64);

    let raws: Vec<RawEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT a.id, s.name, s.rfid_tag, a.scan_time, a.status
           FROM attendance a
           JOIN students s ON s.student_id = a.student_id
           WHERE ?1 IS NULL OR date(a.scan_time) = ?1
           ORDER BY a.scan_time DESC, a.id DESC
           LIMIT ?2",
        )?;

        let rows = stmt
          .query_map(rusqlite::params![date_str, limit_val], |row| {
            Ok(RawEntry {
              id:        row.get(0)?,
              name:      row.get(1)?,
              rfid_tag:  row.get(2)?,
              scan_time: row.get(3)?,
              status:    row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntry::into_entry).collect()
  }

  async fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary> {
    let date_str = format_date(date);

    let (total, present, counts): (i64, i64, Vec<(String, i64)>) = self
      .conn
      .call(move |conn| {
        let total: i64 =
          conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?;

        let present: i64 = conn.query_row(
          "SELECT COUNT(DISTINCT student_id) FROM attendance
           WHERE date(scan_time) = ?1 AND status = 'Present'",
          rusqlite::params![date_str],
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(
          "SELECT status, COUNT(*) FROM attendance
           WHERE date(scan_time) = ?1
           GROUP BY status",
        )?;
        let counts = stmt
          .query_map(rusqlite::params![date_str], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total, present, counts))
      })
      .await?;

    let total   = to_count(total, "students")?;
    let present = to_count(present, "attendance.student_id")?;

    let mut by_status = BTreeMap::from([
      (AttendanceStatus::Present.to_string(), 0),
      (AttendanceStatus::Absent.to_string(), 0),
    ]);
    for (status, n) in counts {
      by_status.insert(status, to_count(n, "attendance.status")?);
    }

    Ok(DailySummary {
      date,
      total,
      present,
      absent: total.saturating_sub(present),
      by_status,
    })
  }

  // ── Admin accounts ────────────────────────────────────────────────────────

  async fn get_admin(&self, username: &str) -> Result<Option<AdminAccount>> {
    let username = username.to_owned();

    let raw: Option<RawAdmin> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {} FROM admins WHERE username = ?1", RawAdmin::COLUMNS),
            rusqlite::params![username],
            RawAdmin::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAdmin::into_admin).transpose()
  }

  async fn create_admin(&self, input: NewAdmin) -> Result<bool> {
    let at_str = encode_ts(time::now());

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO admins (username, password_hash, full_name, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (username) DO NOTHING",
          rusqlite::params![
            input.username,
            input.password_hash,
            input.full_name,
            at_str,
          ],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(inserted)
  }

  async fn set_admin_password(
    &self,
    username:      &str,
    password_hash: String,
  ) -> Result<bool> {
    let username = username.to_owned();

    let updated = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE admins SET password_hash = ?1 WHERE username = ?2",
          rusqlite::params![password_hash, username],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(updated)
  }

  async fn touch_admin_login(&self, id: AdminId, at: NaiveDateTime) -> Result<()> {
    let at_str = encode_ts(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE admins SET last_login = ?1 WHERE admin_id = ?2",
          rusqlite::params![at_str, id.0],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }
}
