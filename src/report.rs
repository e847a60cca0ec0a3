//! Session CSV export
//!
//! File layout:
//!
//! ```text
//! # platform=linux-x86_64
//! # language=rust
//! # mode=terminal
//! # clock_source=clock_gettime(CLOCK_MONOTONIC)
//! # start_time_utc=2024-01-02T03:04:05.123456Z
//! seq,timestamp_ms,event_timestamp_ms,event_type,keycode,scancode,character,modifiers,is_repeat
//! 1,10.000,0.000,key_down,30,30,a,none,0
//! ```

use crate::keyboard::{KeyEventKind, KeyEventRecord, ModifierSet};
use crate::session::SessionMetadata;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Column header, in output order
pub const HEADER: &str =
    "seq,timestamp_ms,event_timestamp_ms,event_type,keycode,scancode,character,modifiers,is_repeat";

/// Number of comma-separated fields in every data row
pub const FIELD_COUNT: usize = 9;

/// Lines before the first data row (metadata + header)
pub const PREAMBLE_LINES: usize = 6;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot create {}: {source}", path.display())]
    Create { path: PathBuf, source: io::Error },
    #[error("failed writing {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Writes a session's metadata and records as CSV
pub struct CsvWriter;

impl CsvWriter {
    /// Write the session to `path`, creating missing parent directories.
    ///
    /// If the destination cannot be created no file is left behind.
    pub fn write(
        path: &Path,
        metadata: &SessionMetadata,
        records: &[KeyEventRecord],
    ) -> Result<(), ReportError> {
        let create_err = |source| ReportError::Create {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(create_err)?;
        }
        let file = File::create(path).map_err(create_err)?;

        let mut out = BufWriter::new(file);
        Self::write_to(&mut out, metadata, records)
            .and_then(|_| out.flush())
            .map_err(|source| ReportError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Write the session to any writer
    pub fn write_to<W: Write>(
        out: &mut W,
        metadata: &SessionMetadata,
        records: &[KeyEventRecord],
    ) -> io::Result<()> {
        for (key, value) in metadata.fields() {
            writeln!(out, "# {}={}", key, value)?;
        }
        writeln!(out, "{}", HEADER)?;
        for record in records {
            writeln!(out, "{}", Self::format_row(record))?;
        }
        Ok(())
    }

    /// One data row, without the trailing newline
    pub fn format_row(record: &KeyEventRecord) -> String {
        format!(
            "{},{:.3},{:.3},{},{},{},{},{},{}",
            record.seq,
            record.capture_timestamp_ms,
            record.source_timestamp_ms,
            record.kind,
            record.key_code,
            record.scan_code,
            record.character,
            record.modifiers,
            u8::from(record.is_repeat),
        )
    }
}

/// A data row read back from a session CSV
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub seq: u64,
    pub timestamp_ms: f64,
    pub event_timestamp_ms: f64,
    pub event_type: KeyEventKind,
    pub keycode: u32,
    pub scancode: u32,
    pub character: String,
    pub modifiers: ModifierSet,
    pub is_repeat: bool,
}

impl CsvRow {
    /// Parse one data row. `line` is the 1-based line number for errors.
    pub fn parse(text: &str, line: usize) -> Result<Self, ReportError> {
        let err = |message: String| ReportError::Parse { line, message };

        let fields: Vec<&str> = text.trim_end_matches(['\r', '\n']).split(',').collect();
        if fields.len() != FIELD_COUNT {
            return Err(err(format!(
                "expected {} fields, found {}",
                FIELD_COUNT,
                fields.len()
            )));
        }

        fn num<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, String> {
            value
                .parse()
                .map_err(|_| format!("invalid {} '{}'", name, value))
        }

        let is_repeat = match fields[8] {
            "0" => false,
            "1" => true,
            other => return Err(err(format!("invalid is_repeat '{}'", other))),
        };

        Ok(Self {
            seq: num("seq", fields[0]).map_err(err)?,
            timestamp_ms: num("timestamp_ms", fields[1]).map_err(err)?,
            event_timestamp_ms: num("event_timestamp_ms", fields[2]).map_err(err)?,
            event_type: fields[3].parse().map_err(err)?,
            keycode: num("keycode", fields[4]).map_err(err)?,
            scancode: num("scancode", fields[5]).map_err(err)?,
            character: fields[6].to_string(),
            modifiers: fields[7].parse().map_err(err)?,
            is_repeat,
        })
    }
}

/// A session CSV read back from disk
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCsv {
    /// `# key=value` lines in file order
    pub metadata: Vec<(String, String)>,
    pub rows: Vec<CsvRow>,
}

impl SessionCsv {
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn read(path: &Path) -> Result<Self, ReportError> {
        let file = File::open(path).map_err(|source| ReportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::read_from(BufReader::new(file))
    }

    pub fn read_from<R: BufRead>(reader: R) -> Result<Self, ReportError> {
        let mut metadata = Vec::new();
        let mut rows = Vec::new();
        let mut seen_header = false;

        for (index, line) in reader.lines().enumerate() {
            let number = index + 1;
            let line = line.map_err(|e| ReportError::Parse {
                line: number,
                message: e.to_string(),
            })?;

            if let Some(comment) = line.strip_prefix("# ") {
                let (key, value) = comment.split_once('=').ok_or_else(|| ReportError::Parse {
                    line: number,
                    message: "metadata line without '='".to_string(),
                })?;
                metadata.push((key.to_string(), value.to_string()));
            } else if !seen_header {
                if line != HEADER {
                    return Err(ReportError::Parse {
                        line: number,
                        message: "missing column header".to_string(),
                    });
                }
                seen_header = true;
            } else {
                rows.push(CsvRow::parse(&line, number)?);
            }
        }

        Ok(Self { metadata, rows })
    }
}
