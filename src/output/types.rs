//! Output record definitions.

use crate::catalog::ConservationStatus;
use crate::detection::{ConfidenceLevel, Detection};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Flat, serializable view of a [`Detection`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
    /// When the detection was produced.
    pub timestamp: DateTime<Utc>,
    /// Frame label (file path or monitor source).
    pub source: Option<String>,
    /// Catalog index.
    pub species_index: usize,
    /// Common name.
    pub species: String,
    /// Scientific name.
    pub scientific_name: String,
    /// Typical habitat.
    pub habitat: String,
    /// Conservation status.
    pub conservation_status: ConservationStatus,
    /// Species group, when the catalog knows it.
    pub category: Option<String>,
    /// Model probability before calibration.
    pub raw_confidence: f32,
    /// Calibrated confidence.
    pub calibrated_confidence: f32,
    /// Confidence bucket.
    pub confidence_level: ConfidenceLevel,
    /// Model that produced the prediction.
    pub model_used: String,
    /// Wall time spent on the frame.
    pub processing_time_ms: u64,
}

impl DetectionRecord {
    /// Build a record from a detection and an optional source label.
    pub fn new(detection: &Detection, source: Option<&str>) -> Self {
        let species = &detection.species;
        Self {
            timestamp: detection.timestamp,
            source: source.map(str::to_string),
            species_index: detection.species_index,
            species: species.name.clone(),
            scientific_name: species.scientific_name.clone(),
            habitat: species.habitat.clone(),
            conservation_status: species.conservation_status,
            category: species.category.clone(),
            raw_confidence: detection.raw_confidence,
            calibrated_confidence: detection.calibrated_confidence,
            confidence_level: detection.confidence_level,
            model_used: detection.model_used.clone(),
            processing_time_ms: detection.processing_time_ms,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::SpeciesDescriptor;
    use std::sync::Arc;

    pub(crate) fn record() -> DetectionRecord {
        let detection = Detection {
            species_index: 2,
            species: Arc::new(SpeciesDescriptor {
                index: 2,
                name: "Red Fox".to_string(),
                scientific_name: "Vulpes vulpes".to_string(),
                habitat: "Forests, grasslands, urban".to_string(),
                conservation_status: ConservationStatus::LeastConcern,
                category: Some("mammals".to_string()),
            }),
            raw_confidence: 0.4321,
            calibrated_confidence: 0.87,
            confidence_level: ConfidenceLevel::High,
            model_used: "minimal-fallback-cnn".to_string(),
            processing_time_ms: 12,
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
        };
        DetectionRecord::new(&detection, Some("trap/0001.jpg"))
    }

    #[test]
    fn test_record_copies_species_metadata() {
        let record = record();
        assert_eq!(record.species, "Red Fox");
        assert_eq!(record.scientific_name, "Vulpes vulpes");
        assert_eq!(record.source.as_deref(), Some("trap/0001.jpg"));
        assert_eq!(record.category.as_deref(), Some("mammals"));
        assert_eq!(record.confidence_level, ConfidenceLevel::High);
    }
}
