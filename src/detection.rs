//! Detection results and confidence levels.

use crate::catalog::SpeciesDescriptor;
use crate::constants::confidence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Coarse confidence bucket reported alongside the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// At or above the high threshold.
    High,
    /// At or above the medium threshold.
    Medium,
    /// Below the medium threshold.
    Low,
}

impl ConfidenceLevel {
    /// Bucket a calibrated confidence.
    pub fn classify(value: f32, thresholds: &ConfidenceThresholds) -> Self {
        if value >= thresholds.high {
            Self::High
        } else if value >= thresholds.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Lower bounds of the high and medium confidence levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// Lower bound of [`ConfidenceLevel::High`].
    pub high: f32,
    /// Lower bound of [`ConfidenceLevel::Medium`].
    pub medium: f32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: confidence::DEFAULT_HIGH,
            medium: confidence::DEFAULT_MEDIUM,
        }
    }
}

/// One labeled wildlife detection.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Catalog index of the reported species.
    pub species_index: usize,
    /// Catalog entry of the reported species.
    pub species: Arc<SpeciesDescriptor>,
    /// Sampled model probability before calibration.
    pub raw_confidence: f32,
    /// User-facing confidence.
    pub calibrated_confidence: f32,
    /// Bucket of `calibrated_confidence`.
    pub confidence_level: ConfidenceLevel,
    /// Name of the model that produced the prediction.
    pub model_used: String,
    /// Wall time spent on the frame.
    pub processing_time_ms: u64,
    /// When the detection was produced.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_levels() {
        let t = ConfidenceThresholds::default();
        assert_eq!(ConfidenceLevel::classify(0.9, &t), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::classify(0.85, &t), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::classify(0.7, &t), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::classify(0.12, &t), ConfidenceLevel::Low);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = ConfidenceThresholds {
            high: 0.5,
            medium: 0.3,
        };
        assert_eq!(ConfidenceLevel::classify(0.6, &t), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::Medium.to_string(), "medium");
    }
}
