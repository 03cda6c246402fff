//! Core types and trait definitions for the rollcall attendance logger.
//!
//! This crate knows nothing about serial ports or databases. The reader,
//! the SQLite backend and the logger binary all depend on it.

// Native `async fn` in traits; the `Send` bounds are spelled out on the
// returned futures instead.
#![allow(async_fn_in_trait)]

pub mod admin;
pub mod attendance;
pub mod error;
pub mod identity;
pub mod store;
pub mod time;

pub use error::{Error, Result};
