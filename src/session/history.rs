//! Bounded detection history.

use crate::detection::Detection;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// Summary statistics over the history buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DetectionStats {
    /// Detections currently held.
    pub total_detections: usize,
    /// Distinct species among them.
    pub unique_species: usize,
    /// Mean calibrated confidence, 0 when empty.
    pub average_confidence: f32,
}

/// Ring buffer of the most recent detections.
#[derive(Debug, Clone)]
pub struct DetectionHistory {
    entries: VecDeque<Detection>,
    capacity: usize,
}

impl DetectionHistory {
    /// Create an empty history holding at most `capacity` detections.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a detection, evicting the oldest when full.
    pub fn push(&mut self, detection: Detection) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(detection);
    }

    /// Keep only the `n` most recent detections.
    pub fn retain_latest(&mut self, n: usize) {
        let excess = self.entries.len().saturating_sub(n);
        self.entries.drain(..excess);
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of detections held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of detections held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent detection.
    pub fn latest(&self) -> Option<&Detection> {
        self.entries.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.entries.iter()
    }

    /// Compute statistics from the buffer.
    pub fn stats(&self) -> DetectionStats {
        if self.entries.is_empty() {
            return DetectionStats::default();
        }
        let unique: HashSet<usize> = self.entries.iter().map(|d| d.species_index).collect();
        let sum: f32 = self.entries.iter().map(|d| d.calibrated_confidence).sum();
        DetectionStats {
            total_detections: self.entries.len(),
            unique_species: unique.len(),
            average_confidence: sum / self.entries.len() as f32,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::detection::ConfidenceLevel;
    use std::sync::Arc;

    pub(crate) fn detection(index: usize, confidence: f32) -> Detection {
        let catalog = default_catalog();
        Detection {
            species_index: index,
            species: Arc::clone(catalog.get(index).unwrap()),
            raw_confidence: 0.1,
            calibrated_confidence: confidence,
            confidence_level: ConfidenceLevel::Low,
            model_used: "test".to_string(),
            processing_time_ms: 0,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_oldest_is_evicted() {
        let mut history = DetectionHistory::new(10);
        for i in 0..25 {
            history.push(detection(i % 10, 0.5));
            assert_eq!(history.len(), (i + 1).min(10));
        }
        assert_eq!(history.iter().next().unwrap().species_index, 5);
        assert_eq!(history.latest().unwrap().species_index, 4);
    }

    #[test]
    fn test_stats() {
        let mut history = DetectionHistory::new(10);
        history.push(detection(1, 0.4));
        history.push(detection(1, 0.6));
        history.push(detection(2, 0.8));
        let stats = history.stats();
        assert_eq!(stats.total_detections, 3);
        assert_eq!(stats.unique_species, 2);
        assert!((stats.average_confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_empty_stats_are_zero() {
        let history = DetectionHistory::new(10);
        assert_eq!(history.stats(), DetectionStats::default());
    }

    #[test]
    fn test_retain_latest() {
        let mut history = DetectionHistory::new(20);
        for i in 0..12 {
            history.push(detection(i % 10, 0.5));
        }
        history.retain_latest(5);
        assert_eq!(history.len(), 5);
        assert_eq!(history.iter().next().unwrap().species_index, 7);

        history.retain_latest(8);
        assert_eq!(history.len(), 5);
    }
}
