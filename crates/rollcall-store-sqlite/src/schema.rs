//! SQL schema for the rollcall SQLite store.
//!
//! Executed on every connection open. `PRAGMA foreign_keys` is a
//! per-connection setting, so it must run each time; the table DDL is
//! idempotent thanks to `CREATE TABLE IF NOT EXISTS`.

pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS students (
    student_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,             -- what the reader prints; not unique
    rfid_tag    TEXT NOT NULL UNIQUE,      -- e.g. '36 D0 DF 00'
    created_at  TEXT NOT NULL              -- 'YYYY-MM-DD HH:MM:SS', local
);

-- Append-only. No UPDATE is ever issued against this table; rows leave only
-- by cascade from students.
CREATE TABLE IF NOT EXISTS attendance (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id  INTEGER NOT NULL
                REFERENCES students(student_id) ON DELETE CASCADE,
    scan_time   TEXT NOT NULL,             -- 'YYYY-MM-DD HH:MM:SS', local
    status      TEXT NOT NULL DEFAULT 'Present'
);

CREATE TABLE IF NOT EXISTS admins (
    admin_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,           -- argon2 PHC string
    full_name     TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    last_login    TEXT,
    is_active     INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS students_name_idx      ON students(name);
CREATE INDEX IF NOT EXISTS attendance_student_idx ON attendance(student_id);
CREATE INDEX IF NOT EXISTS attendance_time_idx    ON attendance(scan_time);

PRAGMA user_version = 1;
";
