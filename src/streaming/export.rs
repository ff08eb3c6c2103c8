//! Receiver-side record decoding and journaling

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Records per journal file before rotating
pub const ROTATE_EVERY: usize = 10_000;

/// Why a received line is not a valid record
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("empty record")]
    Empty,

    #[error("field {index} is not a duration: {field:?}")]
    InvalidField { index: usize, field: String },
}

/// A record as seen by the receiving end of the link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedRecord {
    pub received_at: DateTime<Utc>,
    pub durations_secs: Vec<f64>,
    pub raw: String,
}

/// Decode one line off the link.
///
/// Bytes that are not valid UTF-8 (line noise) are dropped before parsing.
pub fn decode_record(line: &[u8], received_at: DateTime<Utc>) -> Result<ReceivedRecord, RecordError> {
    let text: String = String::from_utf8_lossy(line)
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .collect();
    let raw = text.trim();
    if raw.is_empty() {
        return Err(RecordError::Empty);
    }

    let durations_secs = raw
        .split(',')
        .enumerate()
        .map(|(index, field)| parse_seconds(field).ok_or_else(|| RecordError::InvalidField {
            index,
            field: field.to_string(),
        }))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReceivedRecord { received_at, durations_secs, raw: raw.to_string() })
}

fn parse_seconds(field: &str) -> Option<f64> {
    let (whole, fraction) = field.split_once('.')?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || !digits(fraction) {
        return None;
    }
    field.parse().ok()
}

/// One journal line: a record and the report window it covers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub interval_start: DateTime<Utc>,
    pub interval_end: DateTime<Utc>,
    pub durations_secs: Vec<f64>,
    pub raw: String,
}

/// Journal file format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Appends received records to files in a data directory
pub struct RecordJournal {
    path: PathBuf,
    format: ExportFormat,
    file: Option<BufWriter<File>>,
    current: Option<PathBuf>,
    count: usize,
    rotate_every: usize,
    /// End of the last journaled window, start of the next
    window_start: DateTime<Utc>,
}

impl RecordJournal {
    pub fn new(path: &Path, format: ExportFormat) -> Result<Self> {
        Self::starting_at(path, format, Utc::now())
    }

    /// Journal whose first record covers the window from `start`.
    pub fn starting_at(path: &Path, format: ExportFormat, start: DateTime<Utc>) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            format,
            file: None,
            current: None,
            count: 0,
            rotate_every: ROTATE_EVERY,
            window_start: start,
        })
    }

    /// Rotate to a new file every `records` records.
    pub fn with_rotation(mut self, records: usize) -> Self {
        self.rotate_every = records.max(1);
        self
    }

    /// Append one record
    pub fn append(&mut self, record: &ReceivedRecord) -> Result<()> {
        if self.file.is_none() {
            self.open_next()?;
        }

        let entry = JournalEntry {
            interval_start: self.window_start,
            interval_end: record.received_at,
            durations_secs: record.durations_secs.clone(),
            raw: record.raw.clone(),
        };

        if let Some(ref mut writer) = self.file {
            match self.format {
                ExportFormat::Json => {
                    let json = serde_json::to_string(&entry)?;
                    writeln!(writer, "{}", json)?;
                }
                ExportFormat::Csv => {
                    let fields = entry
                        .durations_secs
                        .iter()
                        .map(|v| format!("{:.4}", v))
                        .collect::<Vec<_>>()
                        .join(",");
                    writeln!(
                        writer,
                        "{},{},{}",
                        entry.interval_start.to_rfc3339(),
                        entry.interval_end.to_rfc3339(),
                        fields
                    )?;
                }
            }
            writer.flush()?;
        }

        self.window_start = record.received_at;
        self.count += 1;
        if self.count % self.rotate_every == 0 {
            self.close()?;
        }

        Ok(())
    }

    /// Records written so far
    pub fn count(&self) -> usize {
        self.count
    }

    /// File currently (or most recently) written
    pub fn current_file(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.file.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn open_next(&mut self) -> Result<()> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let ext = match self.format {
            ExportFormat::Json => "jsonl",
            ExportFormat::Csv => "csv",
        };
        let filename = self.path.join(format!("records_{}_{}.{}", timestamp, self.count, ext));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&filename)
            .map_err(|e| anyhow!("Failed to open journal file: {}", e))?;
        let mut writer = BufWriter::new(file);

        if self.format == ExportFormat::Csv {
            writeln!(writer, "interval_start,interval_end,durations_secs")?;
        }

        info!("Journaling records to {:?}", filename);
        self.file = Some(writer);
        self.current = Some(filename);
        Ok(())
    }
}

/// Decode newline-terminated records from `reader` into `journal` until EOF.
///
/// A read timeout keeps the partial line and resumes it on the next read.
/// Returns the number of records journaled.
pub fn journal_lines<R: BufRead>(mut reader: R, journal: &mut RecordJournal) -> Result<usize> {
    let mut line = Vec::new();
    let mut journaled = 0;

    loop {
        match reader.read_until(b'\n', &mut line) {
            Ok(0) if line.is_empty() => break,
            Ok(0) => {}
            Ok(_) if line.last() == Some(&b'\n') => {}
            // EOF without a terminator; the next read reports it
            Ok(_) => continue,
            Err(e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) => return Err(e.into()),
        }

        match decode_record(&line, Utc::now()) {
            Ok(record) => {
                debug!("Received {}", record.raw);
                journal.append(&record)?;
                journaled += 1;
            }
            Err(e) => warn!("Dropping line: {}", e),
        }
        line.clear();
    }

    journal.close()?;
    info!("Journaled {} records", journaled);
    Ok(journaled)
}
