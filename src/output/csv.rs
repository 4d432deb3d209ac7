//! CSV output.

use crate::error::{Error, Result};
use crate::output::{DetectionRecord, OutputWriter};
use std::io::Write;

const HEADER: [&str; 13] = [
    "timestamp",
    "source",
    "species_index",
    "species",
    "scientific_name",
    "habitat",
    "conservation_status",
    "category",
    "raw_confidence",
    "calibrated_confidence",
    "confidence_level",
    "model_used",
    "processing_time_ms",
];

/// CSV format output writer.
pub struct CsvWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvWriter<W> {
    /// Create a CSV writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer),
        }
    }
}

impl<W: Write> OutputWriter for CsvWriter<W> {
    fn write_header(&mut self) -> Result<()> {
        self.writer
            .write_record(HEADER)
            .map_err(|source| Error::CsvWrite { source })
    }

    fn write_detection(&mut self, record: &DetectionRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .map_err(|source| Error::CsvWrite { source })
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
