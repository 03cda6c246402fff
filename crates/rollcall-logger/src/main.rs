//! `rollcall`: RFID attendance logger.
//!
//! Reads `rollcall.toml` (or the path given with `--config`), prepares the
//! SQLite store, and logs every badge scan from the serial reader until
//! interrupted.
//!
//! ```text
//! rollcall --port /dev/ttyACM0 run
//! rollcall report --date 2024-01-02 --csv > attendance_report.csv
//! rollcall admin set-password
//! ```

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context as _, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rollcall_core::{
  attendance::AttendanceQuery,
  store::AttendanceStore as _,
  time,
};
use rollcall_logger::{
  LoggerConfig, auth,
  bootstrap::open_and_initialize,
  config::Overrides,
  ingest::{IngestSettings, Ingestor, ShutdownReason},
  report, source,
};
use rollcall_store_sqlite::SqliteStore;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "RFID attendance logger")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "rollcall.toml")]
  config: PathBuf,

  /// Serial device of the reader, or `-` for stdin.
  #[arg(long, global = true)]
  port: Option<String>,

  /// SQLite database file.
  #[arg(long, global = true)]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Prepare the store and log scans until interrupted (the default).
  Run,
  /// Prepare the store and exit.
  Init,
  /// List attendance records, newest first.
  Report {
    /// Only records from this day (YYYY-MM-DD).
    #[arg(long, value_parser = time::parse_date)]
    date:  Option<NaiveDate>,
    #[arg(long)]
    limit: Option<usize>,
    #[arg(long, conflicts_with = "csv")]
    json:  bool,
    /// Name, RFID tag, date, time and status as CSV.
    #[arg(long)]
    csv:   bool,
  },
  /// List enrolled students.
  Students {
    #[arg(long)]
    json: bool,
  },
  /// Headcount for one day.
  Summary {
    /// Day to summarise (YYYY-MM-DD); defaults to today.
    #[arg(long, value_parser = time::parse_date)]
    date: Option<NaiveDate>,
    #[arg(long)]
    json: bool,
  },
  /// Manage admin accounts.
  Admin {
    #[command(subcommand)]
    action: AdminCommand,
  },
}

#[derive(Subcommand)]
enum AdminCommand {
  /// Add an admin account; the password is read from stdin.
  Create {
    #[arg(long)]
    username:  String,
    #[arg(long)]
    full_name: String,
  },
  /// Set a new password read from stdin.
  SetPassword {
    /// Defaults to the configured bootstrap username.
    #[arg(long)]
    username: Option<String>,
  },
  /// Check a password read from stdin and record the login.
  Verify {
    #[arg(long)]
    username: Option<String>,
  },
}

/// How long a finished run waits for blocking reads (stdin) before exiting.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() -> anyhow::Result<()> {
  let runtime = tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()
    .context("failed to start async runtime")?;
  let result = runtime.block_on(rollcall());
  // A stdin read parked on the blocking pool never completes while the
  // upstream pipe stays open.
  runtime.shutdown_timeout(SHUTDOWN_GRACE);
  result
}

async fn rollcall() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = LoggerConfig::load(&cli.config, Overrides {
    port:       cli.port,
    store_path: cli.store,
  })
  .context("failed to load configuration")?;

  let store_path = expand_tilde(&cfg.store_path);

  // Every subcommand starts from a prepared store; failure here is fatal.
  let (store, _) = open_and_initialize(&store_path, &cfg.admin_bootstrap())
    .await
    .context("storage initialisation failed")?;

  match cli.command.unwrap_or(Command::Run) {
    Command::Run => run(store, &cfg).await,
    Command::Init => close(store).await,
    Command::Report {
      date,
      limit,
      json,
      csv,
    } => {
      let entries = store
        .list_attendance(&AttendanceQuery { date, limit })
        .await
        .context("failed to read attendance")?;
      if csv {
        report::write_csv(&entries, std::io::stdout().lock())?;
      } else if json {
        println!("{}", report::to_json(&entries)?);
      } else {
        print!("{}", report::render_entries(&entries));
      }
      close(store).await
    }
    Command::Students { json } => {
      let identities = store
        .list_identities()
        .await
        .context("failed to read students")?;
      if json {
        println!("{}", report::to_json(&identities)?);
      } else {
        print!("{}", report::render_identities(&identities));
      }
      close(store).await
    }
    Command::Summary { date, json } => {
      let summary = store
        .daily_summary(date.unwrap_or_else(time::today))
        .await
        .context("failed to summarise attendance")?;
      if json {
        println!("{}", report::to_json(&summary)?);
      } else {
        print!("{}", report::render_summary(&summary));
      }
      close(store).await
    }
    Command::Admin { action } => {
      let result = admin(&store, &cfg, action).await;
      close(store).await?;
      result
    }
  }
}

async fn run(store: SqliteStore, cfg: &LoggerConfig) -> anyhow::Result<()> {
  let input = match source::open(&cfg.port, cfg.baud_rate, cfg.poll_interval()) {
    Ok(input) => input,
    Err(e) => {
      close(store).await?;
      return Err(e).context("cannot start without the reader");
    }
  };

  let stop = CancellationToken::new();
  tokio::spawn(shutdown_signal(stop.clone()));

  let report = Ingestor::new(store, input, IngestSettings::from(cfg), stop)
    .run()
    .await
    .context("failed to shut down cleanly")?;

  match report.reason {
    ShutdownReason::InputFailed(e) => Err(e).context("reader connection lost"),
    ShutdownReason::StopRequested | ShutdownReason::InputClosed => Ok(()),
  }
}

async fn admin(
  store: &SqliteStore,
  cfg: &LoggerConfig,
  action: AdminCommand,
) -> anyhow::Result<()> {
  match action {
    AdminCommand::Create {
      username,
      full_name,
    } => {
      let password = read_password("Password: ")?;
      auth::create_account(store, &username, &full_name, &password).await?;
      println!("admin account {username} created");
    }
    AdminCommand::SetPassword { username } => {
      let username = username.unwrap_or_else(|| cfg.admin_username.clone());
      let password = read_password("New password: ")?;
      if password.is_empty() {
        bail!("refusing to set an empty password");
      }
      auth::reset_password(store, &username, &password).await?;
      println!("password updated for {username}");
    }
    AdminCommand::Verify { username } => {
      let username = username.unwrap_or_else(|| cfg.admin_username.clone());
      let password = read_password("Password: ")?;
      let account = auth::login(store, &username, &password).await?;
      println!("credentials valid for {} ({})", account.username, account.full_name);
    }
  }
  Ok(())
}

async fn close(store: SqliteStore) -> anyhow::Result<()> {
  store.close().await.context("failed to close store")
}

/// Cancel `stop` on Ctrl-C, or on SIGTERM where there is one.
async fn shutdown_signal(stop: CancellationToken) {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!("failed to listen for Ctrl-C: {e}");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::error!("failed to listen for SIGTERM: {e}");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    () = ctrl_c => tracing::info!("logging stopped by user"),
    () = terminate => tracing::info!("received terminate signal"),
  }
  stop.cancel();
}

/// Read a password from stdin.
fn read_password(prompt: &str) -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("{prompt}");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory as _;

  use super::*;

  fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("rollcall").chain(args.iter().copied())).unwrap()
  }

  #[test]
  fn cli_is_well_formed() { Cli::command().debug_assert(); }

  #[test]
  fn run_is_the_default() {
    let cli = parse(&["--port", "-"]);
    assert!(cli.command.is_none());
    assert_eq!(cli.port.as_deref(), Some("-"));
  }

  #[test]
  fn report_csv_and_json_are_exclusive() {
    let cli = parse(&["report", "--date", "2024-01-02", "--csv"]);
    let Some(Command::Report { date, csv, json, .. }) = cli.command else {
      panic!("expected report");
    };
    assert!(csv && !json);
    assert_eq!(date, Some(time::parse_date("2024-01-02").unwrap()));

    assert!(Cli::try_parse_from(["rollcall", "report", "--csv", "--json"]).is_err());
    assert!(Cli::try_parse_from(["rollcall", "report", "--date", "02/01/2024"]).is_err());
  }

  #[test]
  fn students_subcommand() {
    let cli = parse(&["students", "--json"]);
    assert!(matches!(cli.command, Some(Command::Students { json: true })));
  }

  #[test]
  fn admin_create_needs_username_and_full_name() {
    let cli = parse(&["admin", "create", "--username", "clerk", "--full-name", "Jane Wambui"]);
    let Some(Command::Admin {
      action: AdminCommand::Create {
        username,
        full_name,
      },
    }) = cli.command
    else {
      panic!("expected admin create");
    };
    assert_eq!(username, "clerk");
    assert_eq!(full_name, "Jane Wambui");

    assert!(Cli::try_parse_from(["rollcall", "admin", "create", "--username", "clerk"]).is_err());
  }
}
