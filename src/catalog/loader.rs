//! Species catalog loading.

use super::reference::{default_species, describe};
use super::types::{ConservationStatus, SpeciesCatalog, SpeciesDescriptor};
use crate::config::validate_thresholds;
use crate::constants::MAX_CATALOG_SIZE;
use crate::detection::ConfidenceThresholds;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Label used as the source of the built-in catalog.
pub const BUILT_IN_SOURCE: &str = "built-in";

/// One value in the catalog mapping.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogEntry {
    /// Common name only; the rest comes from the reference table.
    Name(String),
    /// Fully or partially described species.
    Detailed {
        name: String,
        #[serde(default)]
        scientific_name: Option<String>,
        #[serde(default)]
        habitat: Option<String>,
        #[serde(default)]
        conservation_status: Option<ConservationStatus>,
        #[serde(default)]
        category: Option<String>,
    },
}

impl CatalogEntry {
    fn into_descriptor(self, index: usize) -> SpeciesDescriptor {
        match self {
            Self::Name(name) => describe(index, name.trim()),
            Self::Detailed {
                name,
                scientific_name,
                habitat,
                conservation_status,
                category,
            } => {
                let mut descriptor = describe(index, name.trim());
                if let Some(scientific_name) = scientific_name {
                    descriptor.scientific_name = scientific_name;
                }
                if let Some(habitat) = habitat {
                    descriptor.habitat = habitat;
                }
                if let Some(status) = conservation_status {
                    descriptor.conservation_status = status;
                }
                if category.is_some() {
                    descriptor.category = category;
                }
                descriptor
            }
        }
    }
}

/// A class index written either as a number or as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassIndex {
    Number(usize),
    Text(String),
}

impl ClassIndex {
    fn resolve(&self) -> Option<usize> {
        match self {
            Self::Number(index) => Some(*index),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MetadataThresholds {
    high_confidence: f32,
    medium_confidence: f32,
}

/// Fields of a model metadata file that sit beside the species mapping.
#[derive(Debug, Default, Deserialize)]
struct ModelMetadata {
    #[serde(default)]
    detection_categories: BTreeMap<String, Vec<ClassIndex>>,
    #[serde(default)]
    confidence_thresholds: Option<MetadataThresholds>,
}

impl ModelMetadata {
    /// Tag species with the first category listing their index.
    fn apply_categories(&self, species: &mut [SpeciesDescriptor]) {
        let mut tagged = vec![false; species.len()];
        for (category, indices) in &self.detection_categories {
            for index in indices.iter().filter_map(ClassIndex::resolve) {
                match (species.get_mut(index), tagged.get_mut(index)) {
                    (Some(descriptor), Some(seen)) if !*seen => {
                        descriptor.category = Some(category.clone());
                        *seen = true;
                    }
                    (None, _) => debug!("Category {category} lists unknown index {index}"),
                    _ => {}
                }
            }
        }
    }

    fn thresholds(&self) -> Option<ConfidenceThresholds> {
        let raw = self.confidence_thresholds.as_ref()?;
        let thresholds = ConfidenceThresholds {
            high: raw.high_confidence,
            medium: raw.medium_confidence,
        };
        match validate_thresholds(&thresholds) {
            Ok(()) => Some(thresholds),
            Err(e) => {
                warn!("Ignoring model metadata thresholds: {e}");
                None
            }
        }
    }
}

/// Species plus what the source said about confidence levels.
struct ParsedCatalog {
    species: Vec<SpeciesDescriptor>,
    thresholds: Option<ConfidenceThresholds>,
}

/// Read a species catalog from a JSON file.
///
/// # File Format
/// - A flat object `{ "<index>": "<common name>", ... }`
/// - Values may also be objects with `name`, `scientific_name`, `habitat`
///   and `conservation_status`
/// - A model metadata file whose `species_mapping` or `classMapping` field
///   holds such an object is accepted too. Its `detection_categories`
///   (category → class indices) tag species with a category, and its
///   `confidence_thresholds` (`high_confidence`, `medium_confidence`) are
///   kept on the catalog
///
/// Indices missing from the source are filled with an "Unknown Species"
/// placeholder so every index below the catalog size resolves.
pub fn load_catalog(path: &Path) -> Result<SpeciesCatalog> {
    let unavailable = |reason: String| Error::CatalogUnavailable {
        source_name: path.display().to_string(),
        reason,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
    let parsed = parse_catalog(&contents).map_err(unavailable)?;

    debug!(
        "Loaded {} catalog entries from {}",
        parsed.species.len(),
        path.display()
    );

    Ok(
        SpeciesCatalog::from_dense(parsed.species, path.display().to_string())
            .with_thresholds(parsed.thresholds),
    )
}

/// Parse catalog JSON into dense, index-ordered descriptors.
fn parse_catalog(contents: &str) -> std::result::Result<ParsedCatalog, String> {
    let mut value: serde_json::Value =
        serde_json::from_str(contents).map_err(|e| format!("invalid JSON: {e}"))?;

    // Model metadata files nest the mapping one level down.
    let mut metadata = ModelMetadata::default();
    for key in ["species_mapping", "classMapping"] {
        if let Some(nested) = value.get_mut(key).map(serde_json::Value::take) {
            metadata = serde_json::from_value(value).unwrap_or_else(|e| {
                warn!("Ignoring unreadable model metadata: {e}");
                ModelMetadata::default()
            });
            value = nested;
            break;
        }
    }

    let raw: BTreeMap<String, CatalogEntry> =
        serde_json::from_value(value).map_err(|e| format!("unexpected layout: {e}"))?;

    if raw.is_empty() {
        return Err("catalog contains no species".to_string());
    }

    let mut entries = BTreeMap::new();
    for (key, entry) in raw {
        let index: usize = key
            .trim()
            .parse()
            .map_err(|_| format!("catalog key '{key}' is not a class index"))?;
        if index >= MAX_CATALOG_SIZE {
            return Err(format!(
                "class index {index} exceeds the maximum catalog size {MAX_CATALOG_SIZE}"
            ));
        }
        if entries.insert(index, entry).is_some() {
            return Err(format!("class index {index} appears more than once"));
        }
    }

    let size = entries.keys().next_back().map_or(0, |max| max + 1);
    let mut dense: Vec<Option<CatalogEntry>> = (0..size).map(|_| None).collect();
    for (index, entry) in entries {
        dense[index] = Some(entry);
    }

    let gaps = dense.iter().filter(|e| e.is_none()).count();
    if gaps > 0 {
        warn!("Catalog has {gaps} missing indices, filling with placeholders");
    }

    let mut species: Vec<SpeciesDescriptor> = dense
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            entry.map_or_else(
                || SpeciesDescriptor::placeholder(index),
                |e| e.into_descriptor(index),
            )
        })
        .collect();
    if !metadata.detection_categories.is_empty() {
        metadata.apply_categories(&mut species);
    }

    Ok(ParsedCatalog {
        species,
        thresholds: metadata.thresholds(),
    })
}

/// The built-in ten species catalog.
pub fn default_catalog() -> SpeciesCatalog {
    SpeciesCatalog::from_dense(default_species(), BUILT_IN_SOURCE)
}

/// Load the catalog at `path`, falling back to the built-in catalog.
///
/// Returns the catalog together with the error that forced the fallback,
/// if any, so callers can report it.
pub fn load_catalog_or_default(path: Option<&Path>) -> (SpeciesCatalog, Option<Error>) {
    let Some(path) = path else {
        return (default_catalog(), None);
    };
    match load_catalog(path) {
        Ok(catalog) => (catalog, None),
        Err(e) => {
            warn!("{e}; using built-in catalog");
            (default_catalog(), Some(e))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test setup code - panics are acceptable
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_catalog(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn test_load_flat_mapping() {
        let file = write_catalog(r#"{"0": "Fox", "1": "Owl", "2": "Deer"}"#);
        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get(1).unwrap().name, "Owl");
        assert_eq!(catalog.get(1).unwrap().scientific_name, "Strigiformes");
    }

    #[test]
    fn test_gaps_are_filled_with_placeholders() {
        let file = write_catalog(r#"{"0": "Fox", "3": "Deer"}"#);
        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.get(1).unwrap().name, "Unknown Species");
        assert_eq!(
            catalog.get(2).unwrap().conservation_status,
            ConservationStatus::Unknown
        );
        assert_eq!(catalog.get(3).unwrap().name, "Deer");
    }

    #[test]
    fn test_detailed_entries_override_reference() {
        let file = write_catalog(
            r#"{"0": {"name": "Fox", "habitat": "Urban parks"},
                "1": {"name": "Pika", "scientific_name": "Ochotona princeps",
                      "conservation_status": "least_concern"}}"#,
        );
        let catalog = load_catalog(file.path()).unwrap();
        let fox = catalog.get(0).unwrap();
        assert_eq!(fox.habitat, "Urban parks");
        assert_eq!(fox.scientific_name, "Vulpes vulpes");
        let pika = catalog.get(1).unwrap();
        assert_eq!(pika.scientific_name, "Ochotona princeps");
        assert_eq!(pika.conservation_status, ConservationStatus::LeastConcern);
    }

    #[test]
    fn test_metadata_file_with_nested_mapping() {
        let file = write_catalog(
            r#"{"model_info": {"name": "x"}, "species_mapping": {"0": "Bear", "1": "Wolf"}}"#,
        );
        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(1).unwrap().name, "Wolf");
    }

    #[test]
    fn test_metadata_categories_and_thresholds() {
        let file = write_catalog(
            r#"{"species_mapping": {"0": "Bear", "1": "Bald Eagle", "2": "Orca", "3": "Species_003"},
                "detection_categories": {"birds": ["1"], "mammals": [0, 3], "marine": ["2"]},
                "confidence_thresholds": {"high_confidence": 0.9, "medium_confidence": 0.6,
                                          "low_confidence": 0.45}}"#,
        );
        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.get(1).unwrap().category.as_deref(), Some("birds"));
        assert_eq!(catalog.get(2).unwrap().category.as_deref(), Some("marine"));
        assert_eq!(catalog.get(3).unwrap().category.as_deref(), Some("mammals"));
        let thresholds = catalog.thresholds().unwrap();
        assert!((thresholds.high - 0.9).abs() < f32::EPSILON);
        assert!((thresholds.medium - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_inverted_metadata_thresholds_are_ignored() {
        let file = write_catalog(
            r#"{"species_mapping": {"0": "Bear"},
                "confidence_thresholds": {"high_confidence": 0.5, "medium_confidence": 0.7}}"#,
        );
        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.thresholds().is_none());
    }

    #[test]
    fn test_flat_mapping_keeps_reference_categories() {
        let file = write_catalog(r#"{"0": "Polar Bear", "1": {"name": "Pika", "category": "mammals"}}"#);
        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.get(0).unwrap().category.as_deref(), Some("arctic"));
        assert_eq!(catalog.get(1).unwrap().category.as_deref(), Some("mammals"));
        assert!(catalog.thresholds().is_none());
    }

    #[test]
    fn test_malformed_sources_are_unavailable() {
        for contents in [
            "not json",
            "{}",
            r#"{"zero": "Fox"}"#,
            r#"["Fox", "Owl"]"#,
            r#"{"99999999": "Fox"}"#,
        ] {
            let file = write_catalog(contents);
            let result = load_catalog(file.path());
            assert!(
                matches!(result, Err(Error::CatalogUnavailable { .. })),
                "expected CatalogUnavailable for {contents}"
            );
        }
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let (catalog, err) = load_catalog_or_default(Some(Path::new("/nonexistent/catalog.json")));
        assert!(err.is_some());
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.source(), BUILT_IN_SOURCE);
    }

    #[test]
    fn test_no_path_uses_default_without_error() {
        let (catalog, err) = load_catalog_or_default(None);
        assert!(err.is_none());
        assert!(!catalog.is_empty());
    }
}
