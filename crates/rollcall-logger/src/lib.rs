//! Attendance logging for a serial RFID reader.
//!
//! The [`ingest`] loop reads lines from the reader, resolves each scan to an
//! enrolled identity and appends an attendance record through any
//! [`AttendanceStore`](rollcall_core::store::AttendanceStore). [`bootstrap`]
//! prepares the store on every start; [`report`] and [`auth`] back the
//! operator subcommands of the `rollcall` binary.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod ingest;
pub mod report;
pub mod source;

pub use config::LoggerConfig;
pub use error::{Error, InitError, Result};
