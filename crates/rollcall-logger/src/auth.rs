//! Admin credential hashing and verification.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use rand_core::OsRng;
use rollcall_core::{
  admin::{AdminAccount, NewAdmin},
  store::AttendanceStore,
  time,
};

use crate::error::{Error, Result};

/// Hash `password` with argon2id and a fresh random salt, returning the PHC
/// string to store.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| Error::Credential(e.to_string()))?
    .to_string();
  Ok(hash)
}

/// `true` if `password` matches the PHC string `hash`. An unparsable hash
/// never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(hash) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

/// Check `password` for an active account and stamp its last login.
pub async fn login<S: AttendanceStore>(
  store: &S,
  username: &str,
  password: &str,
) -> Result<AdminAccount> {
  let mut account = store
    .get_admin(username)
    .await
    .map_err(Error::store)?
    .ok_or(Error::Unauthorized)?;

  if !account.active || !verify_password(password, &account.password_hash) {
    return Err(Error::Unauthorized);
  }

  let now = time::now();
  store
    .touch_admin_login(account.id, now)
    .await
    .map_err(Error::store)?;
  account.last_login = Some(now);

  tracing::info!(username, "admin login verified");
  Ok(account)
}

/// Add an admin account. Every field is required and usernames are unique.
pub async fn create_account<S: AttendanceStore>(
  store: &S,
  username: &str,
  full_name: &str,
  password: &str,
) -> Result<AdminAccount> {
  for (field, value) in [
    ("username", username),
    ("full name", full_name),
    ("password", password),
  ] {
    if value.trim().is_empty() {
      return Err(Error::MissingField(field));
    }
  }

  let created = store
    .create_admin(NewAdmin {
      username:      username.to_owned(),
      password_hash: hash_password(password)?,
      full_name:     full_name.to_owned(),
    })
    .await
    .map_err(Error::store)?;
  if !created {
    return Err(Error::AdminExists(username.to_owned()));
  }

  let account = store
    .get_admin(username)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::AdminNotFound(username.to_owned()))?;

  tracing::info!(username, "admin account created");
  Ok(account)
}

/// Replace the password of an existing account.
pub async fn reset_password<S: AttendanceStore>(
  store: &S,
  username: &str,
  new_password: &str,
) -> Result<()> {
  let hash = hash_password(new_password)?;
  let updated = store
    .set_admin_password(username, hash)
    .await
    .map_err(Error::store)?;

  if !updated {
    return Err(Error::AdminNotFound(username.to_owned()));
  }

  tracing::info!(username, "admin password updated");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use rollcall_store_sqlite::SqliteStore;

  async fn store_with_admin(password: &str) -> SqliteStore {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store
      .create_admin(NewAdmin {
        username:      "admin".into(),
        password_hash: hash_password(password).unwrap(),
        full_name:     "System Administrator".into(),
      })
      .await
      .unwrap();
    store
  }

  #[test]
  fn correct_password_verifies() {
    let hash = hash_password("secret").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("secret", &hash));
  }

  #[test]
  fn wrong_password_is_rejected() {
    let hash = hash_password("secret").unwrap();
    assert!(!verify_password("wrong", &hash));
  }

  #[test]
  fn salts_differ() {
    assert_ne!(hash_password("secret").unwrap(), hash_password("secret").unwrap());
  }

  #[test]
  fn malformed_hash_never_matches() {
    assert!(!verify_password("secret", "not-a-phc-string"));
    assert!(!verify_password("", ""));
  }

  #[tokio::test]
  async fn login_stamps_last_login() {
    let store = store_with_admin("admin123").await;

    let account = login(&store, "admin", "admin123").await.unwrap();
    assert!(account.last_login.is_some());

    let stored = store.get_admin("admin").await.unwrap().unwrap();
    assert_eq!(stored.last_login, account.last_login);
  }

  #[tokio::test]
  async fn login_rejects_bad_password_and_unknown_user() {
    let store = store_with_admin("admin123").await;

    assert!(matches!(
      login(&store, "admin", "nope").await,
      Err(Error::Unauthorized)
    ));
    assert!(matches!(
      login(&store, "root", "admin123").await,
      Err(Error::Unauthorized)
    ));

    let stored = store.get_admin("admin").await.unwrap().unwrap();
    assert!(stored.last_login.is_none());
  }

  #[tokio::test]
  async fn reset_then_login_with_new_password() {
    let store = store_with_admin("admin123").await;

    reset_password(&store, "admin", "correct horse").await.unwrap();
    assert!(login(&store, "admin", "admin123").await.is_err());
    assert!(login(&store, "admin", "correct horse").await.is_ok());
  }

  #[tokio::test]
  async fn reset_unknown_account_fails() {
    let store = store_with_admin("admin123").await;
    assert!(matches!(
      reset_password(&store, "ghost", "x").await,
      Err(Error::AdminNotFound(name)) if name == "ghost"
    ));
  }

  #[tokio::test]
  async fn created_account_can_log_in() {
    let store = store_with_admin("admin123").await;

    let account = create_account(&store, "registrar", "Jane Wambui", "s3cret")
      .await
      .unwrap();
    assert_eq!(account.username, "registrar");
    assert_eq!(account.full_name, "Jane Wambui");
    assert!(account.active);
    assert!(account.last_login.is_none());

    assert!(login(&store, "registrar", "s3cret").await.is_ok());
    // The bootstrap account is untouched.
    assert!(login(&store, "admin", "admin123").await.is_ok());
  }

  #[tokio::test]
  async fn duplicate_username_is_rejected() {
    let store = store_with_admin("admin123").await;

    assert!(matches!(
      create_account(&store, "admin", "Someone Else", "other").await,
      Err(Error::AdminExists(name)) if name == "admin"
    ));
    // The existing password still works.
    assert!(login(&store, "admin", "admin123").await.is_ok());
  }

  #[tokio::test]
  async fn empty_fields_are_rejected() {
    let store = store_with_admin("admin123").await;

    assert!(matches!(
      create_account(&store, "", "Name", "pw").await,
      Err(Error::MissingField("username"))
    ));
    assert!(matches!(
      create_account(&store, "clerk", "  ", "pw").await,
      Err(Error::MissingField("full name"))
    ));
    assert!(matches!(
      create_account(&store, "clerk", "Clerk", "").await,
      Err(Error::MissingField("password"))
    ));
    assert!(store.get_admin("clerk").await.unwrap().is_none());
  }
}
