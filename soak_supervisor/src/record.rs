//! Append-only CSV record of telemetry samples.
//!
//! One file per run at `<dir>/<YYYY-MM-DD_HHMMSS>_<label>.csv`. The header is
//! written once on creation, then one line per sample:
//!
//! ```text
//! Time,Battery Voltage,13.8v Rail Voltage,cRIO Voltage
//! 2023-11-14T22:13:20.000Z,24,13.8,5
//! ```
//!
//! Every line is flushed as soon as it is written so a record survives an
//! abrupt end of the process. Files are never rewritten or rotated.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat, Utc};
use soak_common::consts::{RECORD_DIR_NAME, RECORD_HEADER, RECORD_TIMESTAMP_FORMAT};
use soak_common::telemetry::TelemetrySample;
use thiserror::Error;
use tracing::{error, info};

/// Errors creating, writing or reading a record file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The user's home directory could not be determined.
    #[error("cannot determine home directory for the record output")]
    HomeNotFound,

    /// The record directory could not be created.
    #[error("cannot create record directory {path:?}: {source}")]
    CreateDir {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The record file could not be created.
    #[error("cannot create record file {path:?}: {source}")]
    CreateFile {
        /// File that was being created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Reading or writing an open record failed.
    #[error("record I/O error on {path:?}: {source}")]
    Io {
        /// Record file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The first line of a record is not the expected header.
    #[error("{path:?} is not a soak record (unexpected header)")]
    BadHeader {
        /// Record file.
        path: PathBuf,
    },

    /// A data line could not be parsed.
    #[error("{path:?} line {line}: {source}")]
    Parse {
        /// Record file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Parse failure.
        #[source]
        source: RecordParseError,
    },
}

/// Errors parsing a single record line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordParseError {
    /// Wrong number of comma-separated fields.
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),

    /// Time column is not an RFC 3339 timestamp.
    #[error("invalid timestamp '{0}'")]
    Timestamp(String),

    /// A voltage column is not a number.
    #[error("invalid {column} '{value}'")]
    Voltage {
        /// Column name from the header.
        column: &'static str,
        /// Offending text.
        value: String,
    },
}

/// Default record directory (`~/battery_soak`).
///
/// # Errors
/// Returns `PersistenceError::HomeNotFound` if no home directory is known.
pub fn default_record_dir() -> Result<PathBuf, PersistenceError> {
    let base = directories::BaseDirs::new().ok_or(PersistenceError::HomeNotFound)?;
    Ok(base.home_dir().join(RECORD_DIR_NAME))
}

/// File name of a record started at `started` with the given label.
pub fn record_file_name(label: &str, started: DateTime<Local>) -> String {
    format!("{}_{}.csv", started.format(RECORD_TIMESTAMP_FORMAT), label)
}

/// Open record file owned by the safety supervisor.
#[derive(Debug)]
pub struct RecordSink {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: u64,
}

impl RecordSink {
    /// Create the record directory (if needed) and a new record file with
    /// its header line.
    ///
    /// An existing directory is reused. An existing file with the same
    /// name is never overwritten.
    ///
    /// # Errors
    /// Returns `PersistenceError` if the directory or the file cannot be
    /// created or the header cannot be written.
    pub fn create(
        dir: &Path,
        label: &str,
        started: DateTime<Local>,
    ) -> Result<Self, PersistenceError> {
        fs::create_dir_all(dir).map_err(|source| {
            error!("Cannot create record directory {:?}: {}", dir, source);
            PersistenceError::CreateDir {
                path: dir.to_path_buf(),
                source,
            }
        })?;

        let path = dir.join(record_file_name(label, started));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| {
                error!("Cannot create record file {:?}: {}", path, source);
                PersistenceError::CreateFile {
                    path: path.clone(),
                    source,
                }
            })?;

        let mut sink = Self {
            path,
            writer: BufWriter::new(file),
            rows: 0,
        };
        sink.write_line(RECORD_HEADER)?;
        info!("Recording telemetry to {}", sink.path.display());
        Ok(sink)
    }

    /// Append one sample as a data row.
    ///
    /// # Errors
    /// Returns `PersistenceError::Io` if the row cannot be written.
    pub fn append(&mut self, sample: &TelemetrySample) -> Result<(), PersistenceError> {
        let line = format_record(sample);
        self.write_line(&line)?;
        self.rows += 1;
        Ok(())
    }

    /// Path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows written (header excluded).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    fn write_line(&mut self, line: &str) -> Result<(), PersistenceError> {
        writeln!(self.writer, "{line}")
            .and_then(|()| self.writer.flush())
            .map_err(|source| PersistenceError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// Format a sample as a record line (without newline).
pub fn format_record(sample: &TelemetrySample) -> String {
    format!(
        "{},{},{},{}",
        sample.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        sample.battery_voltage,
        sample.rail_voltage_13v8,
        sample.controller_voltage
    )
}

/// Parse one data line back into a sample.
///
/// # Errors
/// Returns `RecordParseError` if the line does not have four fields or a
/// field does not parse.
pub fn parse_record(line: &str) -> Result<TelemetrySample, RecordParseError> {
    let fields: Vec<&str> = line.trim_end().split(',').map(str::trim).collect();
    let [time, battery, rail, controller] = fields.as_slice() else {
        return Err(RecordParseError::FieldCount(fields.len()));
    };

    let timestamp = DateTime::parse_from_rfc3339(time)
        .map_err(|_| RecordParseError::Timestamp((*time).to_string()))?
        .with_timezone(&Utc);

    Ok(TelemetrySample::new(
        timestamp,
        parse_voltage("Battery Voltage", battery)?,
        parse_voltage("13.8v Rail Voltage", rail)?,
        parse_voltage("cRIO Voltage", controller)?,
    ))
}

fn parse_voltage(column: &'static str, value: &str) -> Result<f64, RecordParseError> {
    value.parse().map_err(|_| RecordParseError::Voltage {
        column,
        value: value.to_string(),
    })
}

/// Read every sample of a record file, checking the header.
///
/// Blank lines are skipped.
///
/// # Errors
/// Returns `PersistenceError` on I/O failure, a missing header or a
/// malformed data line.
pub fn read_records(path: &Path) -> Result<Vec<TelemetrySample>, PersistenceError> {
    let io_err = |source: io::Error| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut lines = reader.lines();

    match lines.next() {
        Some(Ok(header)) if header.trim_end() == RECORD_HEADER => {}
        Some(Err(e)) => return Err(io_err(e)),
        _ => {
            return Err(PersistenceError::BadHeader {
                path: path.to_path_buf(),
            });
        }
    }

    let mut samples = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let sample = parse_record(&line).map_err(|source| PersistenceError::Parse {
            path: path.to_path_buf(),
            line: idx + 2,
            source,
        })?;
        samples.push(sample);
    }
    Ok(samples)
}
