//! Runtime configuration.
//!
//! Layered, lowest priority first: built-in defaults, an optional TOML file,
//! `ROLLCALL_*` environment variables, then command-line overrides.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::Deserialize;

use crate::bootstrap::AdminBootstrap;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
  /// Serial device of the reader (`/dev/ttyACM0`, `COM7`), or `-` for stdin.
  pub port:                   String,
  pub baud_rate:              u32,
  /// SQLite database file. A leading `~/` is expanded by the binary.
  pub store_path:             PathBuf,
  /// Upper bound on how long the loop waits for input before re-checking the
  /// stop signal.
  pub poll_interval_ms:       u64,
  /// A partial line longer than this is discarded as garbage.
  pub max_line_bytes:         usize,
  pub admin_username:         String,
  pub admin_full_name:        String,
  pub admin_initial_password: String,
}

impl Default for LoggerConfig {
  fn default() -> Self {
    let admin = AdminBootstrap::default();
    Self {
      port:                   "/dev/ttyACM0".to_string(),
      baud_rate:              9600,
      store_path:             PathBuf::from("attendance.db"),
      poll_interval_ms:       1000,
      max_line_bytes:         1024,
      admin_username:         admin.username,
      admin_full_name:        admin.full_name,
      admin_initial_password: admin.initial_password,
    }
  }
}

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub port:       Option<String>,
  pub store_path: Option<PathBuf>,
}

impl LoggerConfig {
  /// Build the configuration from `file` (which need not exist), the
  /// environment and `overrides`.
  pub fn load(file: &Path, overrides: Overrides) -> Result<Self, config::ConfigError> {
    let cfg: Self = config::Config::builder()
      .add_source(config::File::from(file.to_path_buf()).required(false))
      .add_source(config::Environment::with_prefix("ROLLCALL"))
      .set_override_option("port", overrides.port)?
      .set_override_option(
        "store_path",
        overrides
          .store_path
          .map(|p| p.to_string_lossy().into_owned()),
      )?
      .build()?
      .try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
  }

  fn validate(&self) -> Result<(), config::ConfigError> {
    // A zero poll interval would spin the loop; a zero line limit would
    // reject every line.
    if self.poll_interval_ms == 0 {
      return Err(config::ConfigError::Message(
        "poll_interval_ms must be greater than zero".into(),
      ));
    }
    if self.max_line_bytes == 0 {
      return Err(config::ConfigError::Message(
        "max_line_bytes must be greater than zero".into(),
      ));
    }
    Ok(())
  }

  pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }

  pub fn admin_bootstrap(&self) -> AdminBootstrap {
    AdminBootstrap {
      username:         self.admin_username.clone(),
      full_name:        self.admin_full_name.clone(),
      initial_password: self.admin_initial_password.clone(),
    }
  }
}
