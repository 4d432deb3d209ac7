//! Human-readable output.

use crate::error::Result;
use crate::output::{DetectionRecord, OutputWriter};
use crate::session::DetectionStats;
use std::io::Write;

/// One line per detection.
pub struct TextWriter<W: Write> {
    writer: W,
}

impl<W: Write> TextWriter<W> {
    /// Create a text writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for TextWriter<W> {
    fn write_header(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_detection(&mut self, record: &DetectionRecord) -> Result<()> {
        if let Some(source) = &record.source {
            write!(self.writer, "{source}: ")?;
        }
        writeln!(
            self.writer,
            "{} ({}) {:.1}% [{}] via {} in {} ms",
            record.species,
            record.scientific_name,
            record.calibrated_confidence * 100.0,
            record.confidence_level,
            record.model_used,
            record.processing_time_ms
        )?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One-line session summary.
pub fn summary_line(stats: &DetectionStats) -> String {
    format!(
        "Session: {} detections, {} unique species, average confidence {:.1}%",
        stats.total_detections,
        stats.unique_species,
        stats.average_confidence * 100.0
    )
}
