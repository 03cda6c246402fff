//! Identity: a known badge holder.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Surrogate key of an [`Identity`] (the SQLite rowid).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct IdentityId(pub i64);

impl fmt::Display for IdentityId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// A badge holder as stored.
///
/// `name` is what the reader firmware prints and what scans are resolved
/// against; it is not unique. `tag` is the credential on the physical card
/// and is unique across all identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id:         IdentityId,
  pub name:       String,
  pub tag:        String,
  #[serde(with = "crate::time::text")]
  pub created_at: NaiveDateTime,
}

/// Input for seeding or enrolling an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
  pub name: String,
  pub tag:  String,
}

impl NewIdentity {
  pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      tag:  tag.into(),
    }
  }
}
