//! Record sinks.

use std::io::Write;

use parking_lot::Mutex;

use super::{TelemetryError, TelemetryRecord};

/// Destination for finished records.
pub trait TelemetrySink: Send + Sync {
    /// Emits one record.
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError::Sink` if the record could not be written.
    fn emit(&self, record: TelemetryRecord) -> Result<(), TelemetryError>;
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records.lock().clone()
    }

    /// First record with the given name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<TelemetryRecord> {
        self.records.lock().iter().find(|r| r.name == name).cloned()
    }
}

impl TelemetrySink for MemorySink {
    fn emit(&self, record: TelemetryRecord) -> Result<(), TelemetryError> {
        self.records.lock().push(record);
        Ok(())
    }
}

/// Writes each record as one JSON line.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl JsonLinesSink<std::io::Stderr> {
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> TelemetrySink for JsonLinesSink<W> {
    fn emit(&self, record: TelemetryRecord) -> Result<(), TelemetryError> {
        let mut line =
            serde_json::to_vec(&record).map_err(|e| TelemetryError::Sink(e.to_string()))?;
        line.push(b'\n');
        self.writer
            .lock()
            .write_all(&line)
            .map_err(|e| TelemetryError::Sink(e.to_string()))
    }
}
