//! Species catalog type definitions.

use crate::constants::{UNKNOWN, UNKNOWN_SPECIES};
use crate::detection::ConfidenceThresholds;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// IUCN-style conservation status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConservationStatus {
    /// Least concern.
    LeastConcern,
    /// Near threatened.
    NearThreatened,
    /// Vulnerable.
    Vulnerable,
    /// Endangered.
    Endangered,
    /// Critically endangered.
    CriticallyEndangered,
    /// Not assessed or not known.
    #[default]
    Unknown,
}

impl std::fmt::Display for ConservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LeastConcern => write!(f, "Least Concern"),
            Self::NearThreatened => write!(f, "Near Threatened"),
            Self::Vulnerable => write!(f, "Vulnerable"),
            Self::Endangered => write!(f, "Endangered"),
            Self::CriticallyEndangered => write!(f, "Critically Endangered"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A single catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesDescriptor {
    /// Dense class index.
    pub index: usize,
    /// Common name.
    pub name: String,
    /// Scientific (binomial) name.
    pub scientific_name: String,
    /// Typical habitat.
    pub habitat: String,
    /// Conservation status.
    pub conservation_status: ConservationStatus,
    /// Broad group such as `mammals`, `birds` or `marine`.
    pub category: Option<String>,
}

impl SpeciesDescriptor {
    /// Placeholder used to fill catalog gaps.
    pub fn placeholder(index: usize) -> Self {
        Self {
            index,
            name: UNKNOWN_SPECIES.to_string(),
            scientific_name: UNKNOWN.to_string(),
            habitat: UNKNOWN.to_string(),
            conservation_status: ConservationStatus::Unknown,
            category: None,
        }
    }
}

/// Dense index → species mapping.
///
/// Entries are shared through `Arc` so detections can hold a reference
/// without copying descriptor text.
#[derive(Debug, Clone)]
pub struct SpeciesCatalog {
    species: Vec<Arc<SpeciesDescriptor>>,
    source: String,
    thresholds: Option<ConfidenceThresholds>,
}

impl SpeciesCatalog {
    /// Build a catalog from descriptors already ordered by index.
    pub(crate) fn from_dense(species: Vec<SpeciesDescriptor>, source: impl Into<String>) -> Self {
        Self {
            species: species.into_iter().map(Arc::new).collect(),
            source: source.into(),
            thresholds: None,
        }
    }

    pub(crate) fn with_thresholds(mut self, thresholds: Option<ConfidenceThresholds>) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Descriptor for a class index.
    pub fn get(&self, index: usize) -> Option<&Arc<SpeciesDescriptor>> {
        self.species.get(index)
    }

    /// Iterate over all descriptors in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SpeciesDescriptor>> {
        self.species.iter()
    }

    /// Where the catalog came from (file path or `built-in`).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Confidence thresholds shipped with the model metadata, if any.
    pub fn thresholds(&self) -> Option<ConfidenceThresholds> {
        self.thresholds
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_unknown() {
        let placeholder = SpeciesDescriptor::placeholder(7);
        assert_eq!(placeholder.index, 7);
        assert_eq!(placeholder.name, "Unknown Species");
        assert_eq!(placeholder.conservation_status, ConservationStatus::Unknown);
    }

    #[test]
    fn test_conservation_status_serde_names() {
        let status: ConservationStatus = serde_json::from_str("\"critically_endangered\"").unwrap();
        assert_eq!(status, ConservationStatus::CriticallyEndangered);
        assert_eq!(status.to_string(), "Critically Endangered");
    }
}
