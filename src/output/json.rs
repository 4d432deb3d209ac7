//! JSON lines output.

use crate::error::{Error, Result};
use crate::output::{DetectionRecord, OutputWriter};
use std::io::Write;

/// One JSON object per line.
pub struct JsonLinesWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesWriter<W> {
    /// Create a JSON lines writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for JsonLinesWriter<W> {
    fn write_header(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_detection(&mut self, record: &DetectionRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|source| Error::JsonWrite { source })?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::output::types::tests::record;

    #[test]
    fn test_each_detection_is_one_json_line() {
        let mut out = Vec::new();
        let mut writer = JsonLinesWriter::new(&mut out);
        writer.write_detection(&record()).unwrap();
        writer.write_detection(&record()).unwrap();
        writer.finalize().unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["species"], "Red Fox");
        assert_eq!(value["confidence_level"], "high");
        assert_eq!(value["conservation_status"], "least_concern");
        assert_eq!(value["category"], "mammals");
        assert_eq!(value["timestamp"], "2023-11-14T22:13:20Z");
    }
}
