//! Plain-text, CSV and JSON renderings for the operator subcommands.

use std::{fmt::Write as _, io};

use rollcall_core::{
  attendance::{AttendanceEntry, DailySummary},
  identity::Identity,
  time::{format_date, format_timestamp},
};
use serde::Serialize;

use crate::error::Result;

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  Ok(serde_json::to_string_pretty(value)?)
}

/// One row per record, columns padded to the widest value.
pub fn render_entries(entries: &[AttendanceEntry]) -> String {
  if entries.is_empty() {
    return "no attendance records\n".to_string();
  }

  let name_w = entries
    .iter()
    .map(|e| e.name.chars().count())
    .chain(["NAME".len()])
    .max()
    .unwrap_or_default();
  let tag_w = entries
    .iter()
    .map(|e| e.tag.chars().count())
    .chain(["TAG".len()])
    .max()
    .unwrap_or_default();

  let mut out = String::new();
  let _ = writeln!(out, "{:<19}  {:<name_w$}  {:<tag_w$}  STATUS", "TIME", "NAME", "TAG");
  for e in entries {
    let _ = writeln!(
      out,
      "{:<19}  {:<name_w$}  {:<tag_w$}  {}",
      format_timestamp(e.occurred_at),
      e.name,
      e.tag,
      e.status
    );
  }
  out
}

#[derive(Serialize)]
struct CsvRow<'a> {
  #[serde(rename = "Name")]
  name:   &'a str,
  #[serde(rename = "RFID Tag")]
  tag:    &'a str,
  #[serde(rename = "Date")]
  date:   String,
  #[serde(rename = "Time")]
  time:   String,
  #[serde(rename = "Status")]
  status: &'a str,
}

/// Write `entries` as CSV with a header row, in the order given.
pub fn write_csv<W: io::Write>(entries: &[AttendanceEntry], out: W) -> Result<()> {
  let mut wtr = csv::Writer::from_writer(out);
  if entries.is_empty() {
    wtr.write_record(["Name", "RFID Tag", "Date", "Time", "Status"])?;
  }
  for e in entries {
    wtr.serialize(CsvRow {
      name:   &e.name,
      tag:    &e.tag,
      date:   format_date(e.occurred_at.date()),
      time:   e.occurred_at.format("%H:%M:%S").to_string(),
      status: e.status.as_str(),
    })?;
  }
  wtr.flush()?;
  Ok(())
}

/// The enrolled roster, one identity per row.
pub fn render_identities(identities: &[Identity]) -> String {
  if identities.is_empty() {
    return "no students enrolled\n".to_string();
  }

  let name_w = identities
    .iter()
    .map(|i| i.name.chars().count())
    .chain(["NAME".len()])
    .max()
    .unwrap_or_default();
  let tag_w = identities
    .iter()
    .map(|i| i.tag.chars().count())
    .chain(["TAG".len()])
    .max()
    .unwrap_or_default();

  let mut out = String::new();
  let _ = writeln!(out, "{:>4}  {:<name_w$}  {:<tag_w$}  ENROLLED", "ID", "NAME", "TAG");
  for i in identities {
    let _ = writeln!(
      out,
      "{:>4}  {:<name_w$}  {:<tag_w$}  {}",
      i.id,
      i.name,
      i.tag,
      format_timestamp(i.created_at)
    );
  }
  out
}

pub fn render_summary(summary: &DailySummary) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "date:    {}", format_date(summary.date));
  let _ = writeln!(out, "total:   {}", summary.total);
  let _ = writeln!(out, "present: {}", summary.present);
  let _ = writeln!(out, "absent:  {}", summary.absent);
  let _ = writeln!(out, "records by status:");
  for (status, n) in &summary.by_status {
    let _ = writeln!(out, "  {status}: {n}");
  }
  out
}
