//! Per-session consistency state.

use super::history::{DetectionHistory, DetectionStats};
use crate::constants::session::{
    DEFAULT_HISTORY_CAPACITY, DIVERSE_HISTORY_LEN, MAX_HISTORY_CAPACITY, MIN_HISTORY_CAPACITY,
};
use crate::detection::Detection;
use tracing::debug;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing recorded since creation or reset.
    Fresh,
    /// Leaning towards the last reported species.
    Biased,
    /// Bias cleared on request; the next detection re-biases.
    Diverse,
}

/// Bias, history and diversity flag of one monitoring session.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    biased_species: Option<usize>,
    history: DetectionHistory,
    force_diversity: bool,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SessionTracker {
    /// Create a session whose history holds `capacity` detections,
    /// clamped to the supported range.
    pub fn new(capacity: usize) -> Self {
        Self {
            biased_species: None,
            history: DetectionHistory::new(
                capacity.clamp(MIN_HISTORY_CAPACITY, MAX_HISTORY_CAPACITY),
            ),
            force_diversity: false,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        if self.force_diversity {
            SessionPhase::Diverse
        } else if self.biased_species.is_some() {
            SessionPhase::Biased
        } else {
            SessionPhase::Fresh
        }
    }

    /// Species the calibrator leans towards.
    pub fn biased_species(&self) -> Option<usize> {
        self.biased_species
    }

    /// Whether diversity was forced since the last detection.
    pub fn is_diversity_forced(&self) -> bool {
        self.force_diversity
    }

    /// Store a detection and bias towards its species.
    pub fn record(&mut self, detection: Detection) {
        self.biased_species = Some(detection.species_index);
        self.force_diversity = false;
        self.history.push(detection);
    }

    /// Drop the bias and all but the most recent detections.
    pub fn force_diversity(&mut self) {
        self.biased_species = None;
        self.force_diversity = true;
        self.history.retain_latest(DIVERSE_HISTORY_LEN);
        debug!("Diversity forced, {} detections kept", self.history.len());
    }

    /// Return to the fresh state.
    pub fn reset(&mut self) {
        self.biased_species = None;
        self.force_diversity = false;
        self.history.clear();
    }

    /// Recorded detections.
    pub fn history(&self) -> &DetectionHistory {
        &self.history
    }

    /// Statistics over the recorded detections.
    pub fn stats(&self) -> DetectionStats {
        self.history.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::super::history::tests::detection;
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut session = SessionTracker::default();
        assert_eq!(session.phase(), SessionPhase::Fresh);

        session.record(detection(3, 0.5));
        assert_eq!(session.phase(), SessionPhase::Biased);
        assert_eq!(session.biased_species(), Some(3));

        session.force_diversity();
        assert_eq!(session.phase(), SessionPhase::Diverse);
        assert_eq!(session.biased_species(), None);

        session.record(detection(6, 0.5));
        assert_eq!(session.phase(), SessionPhase::Biased);
        assert_eq!(session.biased_species(), Some(6));

        session.reset();
        assert_eq!(session.phase(), SessionPhase::Fresh);
        assert_eq!(session.stats(), DetectionStats::default());
    }

    #[test]
    fn test_bias_follows_latest_detection() {
        let mut session = SessionTracker::default();
        for i in [1, 4, 4, 2] {
            session.record(detection(i, 0.5));
            assert_eq!(session.biased_species(), Some(i));
        }
    }

    #[test]
    fn test_force_diversity_truncates_history() {
        let mut session = SessionTracker::new(20);
        for i in 0..15 {
            session.record(detection(i % 10, 0.5));
        }
        session.force_diversity();
        assert_eq!(session.stats().total_detections, 5);
    }

    #[test]
    fn test_capacity_is_clamped() {
        assert_eq!(SessionTracker::new(3).history().capacity(), 10);
        assert_eq!(SessionTracker::new(500).history().capacity(), 20);
        assert_eq!(SessionTracker::new(15).history().capacity(), 15);
    }

    #[test]
    fn test_total_is_min_of_inserts_and_capacity() {
        for inserts in [0, 5, 12, 30] {
            let mut session = SessionTracker::new(12);
            for i in 0..inserts {
                session.record(detection(i % 10, 0.5));
            }
            assert_eq!(session.stats().total_detections, inserts.min(12));
        }
    }
}
