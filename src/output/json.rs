//! JSON record writer

use serde::Serialize;
use std::io::Write;
use tracing::debug;

use super::{OutputError, OutputResult, RecordWriter};
use crate::TaskRecord;

/// Write `records` as a pretty-printed JSON array followed by a newline
pub fn write_json_records<W: Write, T: Serialize>(mut writer: W, records: &[T]) -> OutputResult<()> {
    serde_json::to_writer_pretty(&mut writer, records)
        .map_err(|e| OutputError::SerializationError(e.to_string()))?;
    writeln!(writer).map_err(|e| OutputError::IoError(e.to_string()))?;
    writer
        .flush()
        .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))
}

/// Collects records and writes them as one JSON array on [`RecordWriter::finish`]
pub struct JsonRecordWriter<W: Write> {
    writer: W,
    records: Vec<TaskRecord>,
    finished: bool,
}

impl<W: Write> JsonRecordWriter<W> {
    /// Create a writer over `writer`
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            records: Vec::new(),
            finished: false,
        }
    }

    /// Finish and hand back the sink
    pub fn into_inner(mut self) -> OutputResult<W> {
        self.finish()?;
        Ok(self.writer)
    }
}

impl<W: Write> RecordWriter for JsonRecordWriter<W> {
    fn write_record(&mut self, record: &TaskRecord) -> OutputResult<()> {
        if self.finished {
            return Err(OutputError::IoError("JSON writer already finished".to_string()));
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        write_json_records(&mut self.writer, &self.records)?;
        self.finished = true;
        debug!("JSON writer finished: {} records written", self.records.len());
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.records.len() as u64
    }
}
