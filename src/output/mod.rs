//! Record writers
//!
//! Exported [`TaskRecord`]s are written as CSV ([`csv::CsvRecordWriter`]) or
//! as a pretty-printed JSON array ([`json::JsonRecordWriter`]), to a file or
//! to stdout.

use crate::TaskRecord;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

pub mod csv;
pub mod json;

pub use self::csv::CsvRecordWriter;
pub use self::json::{write_json_records, JsonRecordWriter};

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Sink for exported records
pub trait RecordWriter {
    /// Write a single record
    fn write_record(&mut self, record: &TaskRecord) -> OutputResult<()>;

    /// Write multiple records at once
    fn write_records(&mut self, records: &[TaskRecord]) -> OutputResult<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Flush everything written so far and finalize the output
    fn finish(&mut self) -> OutputResult<()>;

    /// Number of records written so far
    fn records_written(&self) -> u64;
}

/// Output format of the `export` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    /// One row per task, nested fields as JSON strings
    #[default]
    Csv,
    /// Pretty-printed JSON array
    Json,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format '{other}', expected csv or json")),
        }
    }
}

/// Open a writer for `format`, writing to `path` or to stdout when `None`
pub fn create_writer(
    format: ExportFormat,
    path: Option<&Path>,
) -> OutputResult<Box<dyn RecordWriter>> {
    let sink: Box<dyn Write> = match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    OutputError::IoError(format!("Failed to create directory: {e}"))
                })?;
            }
            let file = File::create(path)
                .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout())),
    };

    Ok(match format {
        ExportFormat::Csv => Box::new(CsvRecordWriter::from_writer(sink)),
        ExportFormat::Json => Box::new(JsonRecordWriter::new(sink)),
    })
}
