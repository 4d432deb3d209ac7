//! Output writer trait definition.

use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::{CsvWriter, DetectionRecord, JsonLinesWriter, TextWriter};
use std::io::Write;

/// Trait for writing detection results.
pub trait OutputWriter {
    /// Write the header (if applicable).
    fn write_header(&mut self) -> Result<()>;

    /// Write a single detection.
    fn write_detection(&mut self, record: &DetectionRecord) -> Result<()>;

    /// Finalize the output (flush, close, etc.).
    fn finalize(&mut self) -> Result<()>;
}

/// Create a writer for `format` over `out`.
pub fn create_writer<'a, W: Write + 'a>(
    format: OutputFormat,
    out: W,
) -> Box<dyn OutputWriter + 'a> {
    match format {
        OutputFormat::Text => Box::new(TextWriter::new(out)),
        OutputFormat::Json => Box::new(JsonLinesWriter::new(out)),
        OutputFormat::Csv => Box::new(CsvWriter::new(out)),
    }
}
