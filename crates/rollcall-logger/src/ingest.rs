//! The read → parse → resolve → record loop.
//!
//! ```text
//!          bytes available            full line
//!   Idle ──────────────────► ReadingLine ─────────► Dispatching
//!    ▲                           │                      │
//!    │                           │ over max_line_bytes  │
//!    │                           ▼                      │
//!    ├──── next newline ──── Discarding                 │
//!    └──────────────── recorded / diagnosed ────────────┘
//!
//!   any state ── stop token / end of input / read error ──► ShuttingDown
//! ```
//!
//! Each line is handled to completion before the stop token is looked at
//! again, and every per-line problem is logged and counted rather than
//! returned. Only shutdown ends [`Ingestor::run`].

use std::{io, mem, time::Duration};

use rollcall_core::{
  attendance::{AttendanceRecord, AttendanceStatus},
  identity::Identity,
  store::AttendanceStore,
  time::{self, format_timestamp},
};
use rollcall_reader::{ParsedEvent, parse};
use tokio::{
  io::{AsyncBufReadExt as _, AsyncRead, BufReader},
  time::timeout,
};
use tokio_util::sync::CancellationToken;

use crate::{
  config::LoggerConfig,
  error::{Error, Result},
};

// ─── Settings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct IngestSettings {
  pub poll_interval:  Duration,
  pub max_line_bytes: usize,
}

impl From<&LoggerConfig> for IngestSettings {
  fn from(cfg: &LoggerConfig) -> Self {
    Self {
      poll_interval:  cfg.poll_interval(),
      max_line_bytes: cfg.max_line_bytes,
    }
  }
}

// ─── Observable results ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
  Idle,
  /// Part of a line is buffered.
  ReadingLine,
  /// The current line outgrew the limit; its bytes are dropped up to and
  /// including the next newline.
  Discarding,
  Dispatching,
  ShuttingDown,
}

/// What happened to one line.
#[derive(Debug)]
pub enum Outcome {
  Recorded {
    identity: Identity,
    record:   AttendanceRecord,
  },
  /// The scanned name matches no identity. Nothing was written.
  UnknownIdentity { label: String },
  /// The reader reported a card it could not identify.
  UnrecognizedCredential,
  /// Undecodable, overlong, empty or otherwise meaningless line.
  Malformed(rollcall_reader::Error),
  /// Lookup or insert failed. Not retried.
  StoreFailed { label: String, reason: String },
}

impl Outcome {
  /// Emit the operator-facing line for this outcome.
  pub fn log(&self) {
    match self {
      Self::Recorded { identity, record } => tracing::info!(
        record = %record.id,
        tag = %identity.tag,
        "logged attendance for {} at {}",
        identity.name,
        format_timestamp(record.occurred_at)
      ),
      Self::UnknownIdentity { label } => {
        tracing::warn!("unknown identity: {label:?}")
      }
      Self::UnrecognizedCredential => {
        tracing::warn!("unrecognised RFID card presented")
      }
      Self::Malformed(e) if e.is_decode_failure() => {
        tracing::warn!("discarding malformed input: {e}")
      }
      Self::Malformed(e) => tracing::debug!("ignoring line: {e}"),
      Self::StoreFailed { label, reason } => {
        tracing::error!("failed to record attendance for {label:?}: {reason}")
      }
    }
  }
}

/// Per-run counters, one per [`Outcome`] kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
  pub lines:                   u64,
  pub recorded:                u64,
  pub unknown_identity:        u64,
  pub unrecognized_credential: u64,
  /// Damaged bytes: invalid UTF-8 or overlong lines.
  pub malformed:               u64,
  /// Blank or unrecognised lines.
  pub ignored:                 u64,
  pub store_failures:          u64,
}

impl IngestStats {
  fn observe(&mut self, outcome: &Outcome) {
    self.lines += 1;
    match outcome {
      Outcome::Recorded { .. } => self.recorded += 1,
      Outcome::UnknownIdentity { .. } => self.unknown_identity += 1,
      Outcome::UnrecognizedCredential => self.unrecognized_credential += 1,
      Outcome::Malformed(e) if e.is_decode_failure() => self.malformed += 1,
      Outcome::Malformed(_) => self.ignored += 1,
      Outcome::StoreFailed { .. } => self.store_failures += 1,
    }
  }
}

#[derive(Debug)]
pub enum ShutdownReason {
  StopRequested,
  /// The input reached end-of-file.
  InputClosed,
  InputFailed(io::Error),
}

#[derive(Debug)]
pub struct IngestReport {
  pub reason: ShutdownReason,
  pub stats:  IngestStats,
}

// ─── Per-line handling ───────────────────────────────────────────────────────

/// Parse one raw line and, for a scan of a known name, append a `Present`
/// record stamped with the current local time.
pub async fn handle_line<S: AttendanceStore>(store: &S, raw: &[u8]) -> Outcome {
  let label = match parse(raw) {
    ParsedEvent::Scan { label } => label,
    ParsedEvent::UnknownTag => return Outcome::UnrecognizedCredential,
    ParsedEvent::Malformed(e) => return Outcome::Malformed(e),
  };

  let identity = match store.find_identity_by_name(&label).await {
    Ok(Some(identity)) => identity,
    Ok(None) => return Outcome::UnknownIdentity { label },
    Err(e) => {
      return Outcome::StoreFailed {
        label,
        reason: e.to_string(),
      };
    }
  };

  match store
    .record_attendance(identity.id, time::now(), AttendanceStatus::Present)
    .await
  {
    Ok(record) => Outcome::Recorded { identity, record },
    Err(e) => Outcome::StoreFailed {
      label,
      reason: e.to_string(),
    },
  }
}

// ─── Loop ────────────────────────────────────────────────────────────────────

/// Owns the store and the input for the lifetime of one ingestion run.
pub struct Ingestor<S, R> {
  store:    S,
  reader:   BufReader<R>,
  /// Bytes of the line currently being assembled; survives poll timeouts.
  buf:      Vec<u8>,
  settings: IngestSettings,
  stop:     CancellationToken,
  state:    LoopState,
  stats:    IngestStats,
}

impl<S, R> Ingestor<S, R>
where
  S: AttendanceStore,
  R: AsyncRead + Unpin,
{
  pub fn new(store: S, input: R, settings: IngestSettings, stop: CancellationToken) -> Self {
    Self {
      store,
      reader: BufReader::new(input),
      buf: Vec::new(),
      settings,
      stop,
      state: LoopState::Idle,
      stats: IngestStats::default(),
    }
  }

  /// Run until stopped, then release the input and close the store.
  ///
  /// Returns an error only if closing the store fails; why the loop ended is
  /// in [`IngestReport::reason`].
  pub async fn run(mut self) -> Result<IngestReport> {
    tracing::info!("starting attendance logging");
    let reason = self.pump().await;
    self.state = LoopState::ShuttingDown;
    tracing::info!(?reason, "attendance logging stopped");

    let Self { store, reader, stats, .. } = self;
    drop(reader);
    store.close().await.map_err(Error::store)?;

    tracing::info!(
      lines = stats.lines,
      recorded = stats.recorded,
      unknown_identity = stats.unknown_identity,
      unrecognized_credential = stats.unrecognized_credential,
      malformed = stats.malformed,
      store_failures = stats.store_failures,
      "resources released"
    );
    Ok(IngestReport { reason, stats })
  }

  async fn pump(&mut self) -> ShutdownReason {
    loop {
      if self.stop.is_cancelled() {
        return ShutdownReason::StopRequested;
      }

      let read = tokio::select! {
        biased;
        () = self.stop.cancelled() => return ShutdownReason::StopRequested,
        read = timeout(
          self.settings.poll_interval,
          self.reader.read_until(b'\n', &mut self.buf),
        ) => read,
      };

      match read {
        // Quiet interval. Any partial line stays in `buf`.
        Err(_elapsed) => self.check_partial(),
        Ok(Ok(0)) => {
          if self.state != LoopState::Discarding && !self.buf.is_empty() {
            let line = mem::take(&mut self.buf);
            self.dispatch(&line).await;
          }
          return ShutdownReason::InputClosed;
        }
        Ok(Ok(_)) if self.buf.ends_with(b"\n") => self.complete_line().await,
        Ok(Ok(_)) => self.check_partial(),
        // Some serial drivers surface their own read timeout.
        Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => self.check_partial(),
        Ok(Err(e)) => {
          tracing::error!("input source failed: {e}");
          return ShutdownReason::InputFailed(e);
        }
      }
    }
  }

  /// A newline arrived: hand the line on, or end a discard.
  async fn complete_line(&mut self) {
    if self.state == LoopState::Discarding {
      self.buf.clear();
    } else {
      let line = mem::take(&mut self.buf);
      self.dispatch(&line).await;
    }
    self.state = LoopState::Idle;
  }

  /// Account for bytes buffered without a newline. A reader that never sends
  /// one must not grow the buffer forever, and once a line has been cut the
  /// rest of it must not be read as a fresh line.
  fn check_partial(&mut self) {
    match self.state {
      LoopState::Discarding => self.buf.clear(),
      _ if self.buf.len() > self.settings.max_line_bytes => {
        self.buf.clear();
        self.state = LoopState::Discarding;
        let outcome =
          Outcome::Malformed(rollcall_reader::Error::TooLong(self.settings.max_line_bytes));
        outcome.log();
        self.stats.observe(&outcome);
      }
      _ if !self.buf.is_empty() => self.state = LoopState::ReadingLine,
      _ => {}
    }
  }

  async fn dispatch(&mut self, line: &[u8]) {
    self.state = LoopState::Dispatching;
    tracing::debug!(line = %String::from_utf8_lossy(line).trim_end(), "received");

    let outcome = if line.len() > self.settings.max_line_bytes {
      Outcome::Malformed(rollcall_reader::Error::TooLong(self.settings.max_line_bytes))
    } else {
      handle_line(&self.store, line).await
    };

    outcome.log();
    self.stats.observe(&outcome);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rollcall_core::{attendance::AttendanceQuery, identity::NewIdentity};
  use rollcall_store_sqlite::SqliteStore;
  use tokio::io::AsyncWriteExt as _;

  use crate::bootstrap::{AdminBootstrap, initialize, open_and_initialize};

  const SETTINGS: IngestSettings = IngestSettings {
    poll_interval:  Duration::from_millis(20),
    max_line_bytes: 64,
  };

  async fn seeded() -> SqliteStore {
    let store = SqliteStore::open_in_memory().await.unwrap();
    for (name, tag) in crate::bootstrap::SEED_ROSTER {
      store.seed_identity(NewIdentity::new(name, tag)).await.unwrap();
    }
    store
  }

  async fn record_count(store: &SqliteStore) -> usize {
    store
      .list_attendance(&AttendanceQuery::default())
      .await
      .unwrap()
      .len()
  }

  // ── handle_line ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn known_name_is_recorded_present() {
    let store = seeded().await;
    let before = time::now();

    let outcome = handle_line(&store, b"Hosea Mbugua,2024-01-01 08:00:00\r\n").await;
    let after = time::now();

    let Outcome::Recorded { identity, record } = outcome else {
      panic!("expected Recorded, got {outcome:?}")
    };
    assert_eq!(identity.name, "Hosea Mbugua");
    assert_eq!(identity.tag, "36 D0 DF 00");
    assert_eq!(record.identity_id, identity.id);
    assert_eq!(record.status, AttendanceStatus::Present);
    // Stamped locally, not with the reader's clock.
    assert!(before <= record.occurred_at && record.occurred_at <= after);

    let rows = store.list_attendance(&AttendanceQuery::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Hosea Mbugua");
    assert_eq!(rows[0].status, AttendanceStatus::Present);
  }

  #[tokio::test]
  async fn unknown_name_writes_nothing() {
    let store = seeded().await;
    let outcome = handle_line(&store, b"Nobody Here,2024-01-01 08:00:00").await;
    assert!(matches!(outcome, Outcome::UnknownIdentity { ref label } if label == "Nobody Here"));
    assert_eq!(record_count(&store).await, 0);
  }

  #[tokio::test]
  async fn unknown_card_writes_nothing() {
    let store = seeded().await;
    let outcome = handle_line(&store, b"Unknown card detected").await;
    assert!(matches!(outcome, Outcome::UnrecognizedCredential));
    assert_eq!(record_count(&store).await, 0);
  }

  #[tokio::test]
  async fn garbage_writes_nothing() {
    let store = seeded().await;
    let outcome = handle_line(&store, &[0xc3, 0x28, b',', b'\n']).await;
    assert!(matches!(outcome, Outcome::Malformed(ref e) if e.is_decode_failure()));
    assert_eq!(record_count(&store).await, 0);
  }

  #[tokio::test]
  async fn store_failure_is_reported_not_raised() {
    let store = seeded().await;
    let clone = store.clone();
    clone.close().await.unwrap();

    let outcome = handle_line(&store, b"Hosea Mbugua,x").await;
    assert!(matches!(outcome, Outcome::StoreFailed { ref label, .. } if label == "Hosea Mbugua"));
  }

  // ── Ingestor ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn processes_stream_until_end_of_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attendance.db");
    let (store, _) = open_and_initialize(&path, &AdminBootstrap::default())
      .await
      .unwrap();

    let input: &[u8] = b"RFID reader ready\r\n\
      Hosea Mbugua,2024-01-01 08:00:00\r\n\
      \xff\xfe\xfd\r\n\
      Unknown card detected\r\n\
      Nobody Here,2024-01-01 08:01:00\r\n\
      \r\n\
      Millie Akoko,2024-01-01 08:02:00";

    let report = Ingestor::new(store, input, SETTINGS, CancellationToken::new())
      .run()
      .await
      .unwrap();

    assert!(matches!(report.reason, ShutdownReason::InputClosed));
    assert_eq!(report.stats, IngestStats {
      lines:                   7,
      recorded:                2,
      unknown_identity:        1,
      unrecognized_credential: 1,
      malformed:               1,
      ignored:                 2,
      store_failures:          0,
    });

    // The store was closed; reopen to check what was committed.
    let store = SqliteStore::open(&path).await.unwrap();
    let rows = store.list_attendance(&AttendanceQuery::default()).await.unwrap();
    let mut names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["Hosea Mbugua", "Millie Akoko"]);
    assert!(rows.iter().all(|r| r.status == AttendanceStatus::Present));
  }

  #[tokio::test]
  async fn stop_token_ends_loop_with_input_still_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attendance.db");
    let (store, _) = open_and_initialize(&path, &AdminBootstrap::default())
      .await
      .unwrap();

    let (mut link, input) = tokio::io::duplex(256);
    let stop = CancellationToken::new();
    let task = tokio::spawn(Ingestor::new(store, input, SETTINGS, stop.clone()).run());

    link.write_all(b"Gladys Njeru,08:00\n").await.unwrap();
    link.write_all(b"Peter Ndiema,08:01\n").await.unwrap();
    // Partial line with no terminator yet.
    link.write_all(b"Millie Ak").await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    stop.cancel();
    let report = tokio::time::timeout(Duration::from_secs(2), task)
      .await
      .expect("loop stops within the poll bound")
      .unwrap()
      .unwrap();

    assert!(matches!(report.reason, ShutdownReason::StopRequested));
    assert_eq!(report.stats.recorded, 2);
    drop(link);

    let store = SqliteStore::open(&path).await.unwrap();
    let rows = store.list_attendance(&AttendanceQuery::default()).await.unwrap();
    assert_eq!(rows.len(), 2);
  }

  #[tokio::test]
  async fn cancelled_before_start_reads_nothing() {
    let store = seeded().await;
    let stop = CancellationToken::new();
    stop.cancel();

    let input: &[u8] = b"Hosea Mbugua,08:00\n";
    let report = Ingestor::new(store, input, SETTINGS, stop).run().await.unwrap();
    assert!(matches!(report.reason, ShutdownReason::StopRequested));
    assert_eq!(report.stats.lines, 0);
  }

  #[tokio::test]
  async fn bad_bytes_do_not_stop_later_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attendance.db");
    let store = SqliteStore::open(&path).await.unwrap();
    initialize(&store, &AdminBootstrap::default()).await.unwrap();

    let mut input = vec![0x80, 0x81, 0xfe, b'\n'];
    input.extend_from_slice(&[b'x'; 100]);
    input.extend_from_slice(b"\nHosea Mbugua,08:00\n");

    let report = Ingestor::new(store, input.as_slice(), SETTINGS, CancellationToken::new())
      .run()
      .await
      .unwrap();

    assert_eq!(report.stats.malformed, 2);
    assert_eq!(report.stats.recorded, 1);
  }

  #[tokio::test]
  async fn endless_line_is_discarded_while_idle() {
    let store = seeded().await;
    let (mut link, input) = tokio::io::duplex(1024);
    let stop = CancellationToken::new();
    let task = tokio::spawn(Ingestor::new(store, input, SETTINGS, stop.clone()).run());

    link.write_all(&[b'z'; 200]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    link.write_all(b"\nHosea Mbugua,08:00\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.cancel();

    let report = task.await.unwrap().unwrap();
    assert_eq!(report.stats.malformed, 1);
    // The newline ends the discarded line; it is not a line of its own.
    assert_eq!(report.stats.ignored, 0);
    assert_eq!(report.stats.recorded, 1);
  }

  #[tokio::test]
  async fn rest_of_a_cut_line_is_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attendance.db");
    let (store, _) = open_and_initialize(&path, &AdminBootstrap::default())
      .await
      .unwrap();

    let (mut link, input) = tokio::io::duplex(1024);
    let stop = CancellationToken::new();
    let task = tokio::spawn(Ingestor::new(store, input, SETTINGS, stop.clone()).run());

    // One physical line: noise past the limit, then a name after a pause.
    link.write_all(&[b'z'; 80]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    link.write_all(b"Hosea Mbugua,08:00\n").await.unwrap();
    // Noise that keeps coming while discarding is dropped too.
    link.write_all(&[b'y'; 100]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    link.write_all(b"\nPeter Ndiema,08:01\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.cancel();

    let report = task.await.unwrap().unwrap();
    assert_eq!(report.stats.malformed, 2);
    assert_eq!(report.stats.unknown_identity, 0);
    assert_eq!(report.stats.recorded, 1);

    let store = SqliteStore::open(&path).await.unwrap();
    let rows = store.list_attendance(&AttendanceQuery::default()).await.unwrap();
    let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Peter Ndiema"]);
  }

  #[tokio::test]
  async fn cut_line_at_end_of_input_is_dropped() {
    let store = seeded().await;
    let (mut link, input) = tokio::io::duplex(1024);
    let task = tokio::spawn(
      Ingestor::new(store, input, SETTINGS, CancellationToken::new()).run(),
    );

    link.write_all(&[b'z'; 80]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    link.write_all(b"Hosea Mbugua,08:00").await.unwrap();
    drop(link);

    let report = task.await.unwrap().unwrap();
    assert!(matches!(report.reason, ShutdownReason::InputClosed));
    assert_eq!(report.stats.malformed, 1);
    assert_eq!(report.stats.recorded, 0);
  }
}
