//! CSV record writer

use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult, RecordWriter};
use crate::TaskRecord;

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// One CSV row; nested fields are carried as JSON strings
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    task_id: &'a str,
    task_name: &'a str,
    status: Option<&'a str>,
    assignees: &'a str,
    due_date: Option<&'a str>,
    date_created: Option<&'a str>,
    time_estimate_ms: Option<i64>,
    time_estimate_hours: Option<f64>,
    time_spent_ms: Option<i64>,
    time_spent_hours: Option<f64>,
    list_id: &'a str,
    list_name: &'a str,
    space_id: &'a str,
    space_name: &'a str,
    folder_id: Option<&'a str>,
    folder_name: Option<&'a str>,
    billable_ms: i64,
    non_billable_ms: i64,
    custom_fields: String,
    time_summary: String,
}

impl<'a> CsvRow<'a> {
    fn from_record(record: &'a TaskRecord) -> OutputResult<Self> {
        Ok(Self {
            task_id: &record.task_id,
            task_name: &record.task_name,
            status: record.status.as_deref(),
            assignees: &record.assignees,
            due_date: record.due_date.as_deref(),
            date_created: record.date_created.as_deref(),
            time_estimate_ms: record.time_estimate_ms,
            time_estimate_hours: record.time_estimate_hours,
            time_spent_ms: record.time_spent_ms,
            time_spent_hours: record.time_spent_hours,
            list_id: &record.list_id,
            list_name: &record.list_name,
            space_id: &record.space_id,
            space_name: &record.space_name,
            folder_id: record.folder_id.as_deref(),
            folder_name: record.folder_name.as_deref(),
            billable_ms: record.billable_ms(),
            non_billable_ms: record.non_billable_ms(),
            custom_fields: to_json(&record.custom_fields)?,
            time_summary: to_json(&record.time_summary)?,
        })
    }
}

fn to_json<T: Serialize>(value: &T) -> OutputResult<String> {
    serde_json::to_string(value).map_err(|e| OutputError::SerializationError(e.to_string()))
}

/// CSV writer for task records
pub struct CsvRecordWriter<W: Write> {
    writer: Writer<W>,
    records_written: u64,
}

impl CsvRecordWriter<BufWriter<File>> {
    /// Create a CSV writer at `path`, creating parent directories
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;

        Ok(Self::from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file)))
    }
}

impl<W: Write> CsvRecordWriter<W> {
    /// Write CSV to any sink; the header row is emitted with the first record
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: Writer::from_writer(writer),
            records_written: 0,
        }
    }

    /// Finish and hand back the sink
    pub fn into_inner(mut self) -> OutputResult<W> {
        self.finish()?;
        self.writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {e}")))
    }
}

impl<W: Write> RecordWriter for CsvRecordWriter<W> {
    fn write_record(&mut self, record: &TaskRecord) -> OutputResult<()> {
        let row = CsvRow::from_record(record)?;

        self.writer
            .serialize(&row)
            .map_err(|e| OutputError::CsvError(format!("Failed to write record: {e}")))?;

        self.records_written += 1;

        if self.records_written % 1000 == 0 {
            self.writer
                .flush()
                .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))?;
            debug!("Progress: {} records written", self.records_written);
        }

        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))?;
        debug!("CSV writer finished: {} records written", self.records_written);
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.records_written
    }
}
