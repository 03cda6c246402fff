//! Startup preparation of the store: seed roster and default admin account.
//!
//! Runs on every start and must leave an already-prepared store untouched.

use std::path::Path;

use rollcall_core::{
  admin::NewAdmin,
  identity::NewIdentity,
  store::AttendanceStore,
};
use rollcall_store_sqlite::SqliteStore;

use crate::{auth, error::InitError};

/// Badge holders every installation starts with, as `(name, tag)`.
pub const SEED_ROSTER: [(&str, &str); 4] = [
  ("Millie Akoko", "FB 18 E0 00"),
  ("Peter Ndiema", "21 0F E0 00"),
  ("Gladys Njeru", "43 44 D8 00"),
  ("Hosea Mbugua", "36 D0 DF 00"),
];

/// Initial password of the bootstrap account. Rotate it with
/// `rollcall admin set-password` before real use.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// The admin account created when none exists under `username`.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
  pub username:         String,
  pub full_name:        String,
  pub initial_password: String,
}

impl Default for AdminBootstrap {
  fn default() -> Self {
    Self {
      username:         "admin".to_string(),
      full_name:        "System Administrator".to_string(),
      initial_password: DEFAULT_ADMIN_PASSWORD.to_string(),
    }
  }
}

/// What [`initialize`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitReport {
  pub identities_added: usize,
  pub admin_created:    bool,
}

/// Seed the roster and create the bootstrap admin if missing.
///
/// Existing identities (matched by tag), the existing admin and all
/// attendance records are left as they are.
pub async fn initialize<S: AttendanceStore>(
  store: &S,
  admin: &AdminBootstrap,
) -> Result<InitReport, InitError> {
  let mut identities_added = 0;
  for (name, tag) in SEED_ROSTER {
    let inserted = store
      .seed_identity(NewIdentity::new(name, tag))
      .await
      .map_err(|e| InitError::Store(Box::new(e)))?;
    if inserted {
      tracing::debug!(name, tag, "seeded identity");
      identities_added += 1;
    }
  }

  let admin_created = ensure_admin(store, admin).await?;

  Ok(InitReport {
    identities_added,
    admin_created,
  })
}

async fn ensure_admin<S: AttendanceStore>(
  store: &S,
  admin: &AdminBootstrap,
) -> Result<bool, InitError> {
  let existing = store
    .get_admin(&admin.username)
    .await
    .map_err(|e| InitError::Store(Box::new(e)))?;
  if existing.is_some() {
    return Ok(false);
  }

  let password_hash = auth::hash_password(&admin.initial_password)
    .map_err(|e| InitError::Credential(e.to_string()))?;

  let created = store
    .create_admin(NewAdmin {
      username: admin.username.clone(),
      password_hash,
      full_name: admin.full_name.clone(),
    })
    .await
    .map_err(|e| InitError::Store(Box::new(e)))?;

  if created {
    tracing::info!(username = %admin.username, "created initial admin account");
    if admin.initial_password == DEFAULT_ADMIN_PASSWORD {
      tracing::warn!(
        username = %admin.username,
        "admin account uses the well-known initial password; \
         change it with `rollcall admin set-password`"
      );
    }
  }
  Ok(created)
}

/// Open the store at `path` and run [`initialize`] on it.
pub async fn open_and_initialize(
  path: &Path,
  admin: &AdminBootstrap,
) -> Result<(SqliteStore, InitReport), InitError> {
  let store = SqliteStore::open(path)
    .await
    .map_err(|source| InitError::Open {
      path: path.to_path_buf(),
      source,
    })?;

  let report = initialize(&store, admin).await?;
  tracing::info!(
    path = %path.display(),
    identities_added = report.identities_added,
    admin_created = report.admin_created,
    "store ready"
  );
  Ok((store, report))
}
