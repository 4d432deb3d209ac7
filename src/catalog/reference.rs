//! Built-in species reference data.
//!
//! Catalog sources usually carry only common names. This table supplies
//! scientific name, habitat, conservation status and category for names we
//! know.

use super::types::{ConservationStatus, SpeciesDescriptor};
use crate::constants::UNKNOWN;

use super::types::ConservationStatus::{
    CriticallyEndangered, Endangered, LeastConcern, NearThreatened, Vulnerable,
};

/// (common name, scientific name, habitat, status, category)
type ReferenceRow = (
    &'static str,
    &'static str,
    &'static str,
    ConservationStatus,
    &'static str,
);

const MAMMALS: &str = "mammals";
const BIRDS: &str = "birds";
const MARINE: &str = "marine";
const ARCTIC: &str = "arctic";
const REPTILES: &str = "reptiles";

/// The default catalog used when no catalog source is available.
const DEFAULT_SPECIES: &[ReferenceRow] = &[
    ("Bear", "Ursus arctos", "Temperate forest", LeastConcern, MAMMALS),
    ("Deer", "Odocoileus virginianus", "Woodland edge", LeastConcern, MAMMALS),
    ("Wolf", "Canis lupus", "Forest and tundra", LeastConcern, MAMMALS),
    ("Fox", "Vulpes vulpes", "Mixed woodland", LeastConcern, MAMMALS),
    ("Rabbit", "Sylvilagus floridanus", "Grassland", LeastConcern, MAMMALS),
    ("Squirrel", "Sciurus carolinensis", "Deciduous forest", LeastConcern, MAMMALS),
    ("Bird", "Aves", "Varied", LeastConcern, BIRDS),
    ("Raccoon", "Procyon lotor", "Wetland and suburban", LeastConcern, MAMMALS),
    ("Moose", "Alces alces", "Boreal forest", LeastConcern, MAMMALS),
    ("Elk", "Cervus canadensis", "Montane meadow", LeastConcern, MAMMALS),
];

const KNOWN_SPECIES: &[ReferenceRow] = &[
    ("African Elephant", "Loxodonta africana", "Savanna", Endangered, MAMMALS),
    ("African Lion", "Panthera leo", "Savanna", Vulnerable, MAMMALS),
    ("Bengal Tiger", "Panthera tigris tigris", "Tropical forest", Endangered, MAMMALS),
    ("Snow Leopard", "Panthera uncia", "Alpine", Vulnerable, MAMMALS),
    ("Giant Panda", "Ailuropoda melanoleuca", "Bamboo forest", Vulnerable, MAMMALS),
    ("Mountain Gorilla", "Gorilla beringei beringei", "Montane forest", Endangered, MAMMALS),
    ("Cheetah", "Acinonyx jubatus", "Savanna", Vulnerable, MAMMALS),
    ("Leopard", "Panthera pardus", "Savanna and forest", Vulnerable, MAMMALS),
    ("Jaguar", "Panthera onca", "Rainforest", NearThreatened, MAMMALS),
    ("Polar Bear", "Ursus maritimus", "Arctic sea ice", Vulnerable, ARCTIC),
    ("Grizzly Bear", "Ursus arctos horribilis", "Temperate forest", LeastConcern, MAMMALS),
    ("Black Bear", "Ursus americanus", "Temperate forest", LeastConcern, MAMMALS),
    ("Gray Wolf", "Canis lupus", "Forest and tundra", LeastConcern, MAMMALS),
    ("Red Fox", "Vulpes vulpes", "Mixed woodland", LeastConcern, MAMMALS),
    ("Arctic Fox", "Vulpes lagopus", "Tundra", LeastConcern, ARCTIC),
    ("Owl", "Strigiformes", "Woodland", LeastConcern, BIRDS),
    ("Great Horned Owl", "Bubo virginianus", "Woodland", LeastConcern, BIRDS),
    ("Snowy Owl", "Bubo scandiacus", "Tundra", Vulnerable, ARCTIC),
    ("Barn Owl", "Tyto alba", "Farmland", LeastConcern, BIRDS),
    ("Bald Eagle", "Haliaeetus leucocephalus", "Lakes and coasts", LeastConcern, BIRDS),
    ("Golden Eagle", "Aquila chrysaetos", "Mountains", LeastConcern, BIRDS),
    ("Peregrine Falcon", "Falco peregrinus", "Cliffs and cities", LeastConcern, BIRDS),
    ("Lynx", "Lynx canadensis", "Boreal forest", LeastConcern, MAMMALS),
    ("Bobcat", "Lynx rufus", "Scrubland", LeastConcern, MAMMALS),
    ("Cougar", "Puma concolor", "Mountains", LeastConcern, MAMMALS),
    ("Giraffe", "Giraffa camelopardalis", "Savanna", Vulnerable, MAMMALS),
    ("Zebra", "Equus quagga", "Grassland", NearThreatened, MAMMALS),
    ("Rhinoceros", "Diceros bicornis", "Savanna", CriticallyEndangered, MAMMALS),
    ("Hippopotamus", "Hippopotamus amphibius", "Rivers", Vulnerable, MAMMALS),
    ("Bison", "Bison bison", "Prairie", NearThreatened, MAMMALS),
    ("White-tailed Deer", "Odocoileus virginianus", "Woodland edge", LeastConcern, MAMMALS),
    ("Red Deer", "Cervus elaphus", "Woodland", LeastConcern, MAMMALS),
    ("Wild Boar", "Sus scrofa", "Forest", LeastConcern, MAMMALS),
    ("Coyote", "Canis latrans", "Grassland", LeastConcern, MAMMALS),
    ("Koala", "Phascolarctos cinereus", "Eucalyptus forest", Vulnerable, MAMMALS),
    ("Kangaroo", "Osphranter rufus", "Outback", LeastConcern, MAMMALS),
    ("Orangutan", "Pongo pygmaeus", "Rainforest", CriticallyEndangered, MAMMALS),
    ("Chimpanzee", "Pan troglodytes", "Rainforest", Endangered, MAMMALS),
    ("Red Panda", "Ailurus fulgens", "Montane forest", Endangered, MAMMALS),
    ("Pangolin", "Manis javanica", "Tropical forest", CriticallyEndangered, MAMMALS),
    ("Sea Otter", "Enhydra lutris", "Kelp forest", Endangered, MARINE),
    ("Humpback Whale", "Megaptera novaeangliae", "Open ocean", LeastConcern, MARINE),
    ("Blue Whale", "Balaenoptera musculus", "Open ocean", Endangered, MARINE),
    ("Orca", "Orcinus orca", "Open ocean", ConservationStatus::Unknown, MARINE),
    ("Komodo Dragon", "Varanus komodoensis", "Tropical savanna", Endangered, REPTILES),
];

/// Reference row for a common name, matched case-insensitively.
fn lookup(name: &str) -> Option<&'static ReferenceRow> {
    DEFAULT_SPECIES
        .iter()
        .chain(KNOWN_SPECIES)
        .find(|(common, ..)| common.eq_ignore_ascii_case(name))
}

/// Build a descriptor for a common name, enriched from the reference table.
pub fn describe(index: usize, name: &str) -> SpeciesDescriptor {
    lookup(name).map_or_else(
        || SpeciesDescriptor {
            index,
            name: name.to_string(),
            scientific_name: UNKNOWN.to_string(),
            habitat: UNKNOWN.to_string(),
            conservation_status: ConservationStatus::Unknown,
            category: None,
        },
        |&(_, scientific, habitat, status, category)| SpeciesDescriptor {
            index,
            name: name.to_string(),
            scientific_name: scientific.to_string(),
            habitat: habitat.to_string(),
            conservation_status: status,
            category: Some(category.to_string()),
        },
    )
}

/// Descriptors of the built-in default catalog, in index order.
pub fn default_species() -> Vec<SpeciesDescriptor> {
    DEFAULT_SPECIES
        .iter()
        .enumerate()
        .map(|(index, &(name, ..))| describe(index, name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_species_has_ten_dense_entries() {
        let species = default_species();
        assert_eq!(species.len(), 10);
        for (i, s) in species.iter().enumerate() {
            assert_eq!(s.index, i);
        }
        assert_eq!(species[3].name, "Fox");
        assert_eq!(species[3].scientific_name, "Vulpes vulpes");
        assert_eq!(species[3].category.as_deref(), Some("mammals"));
        assert_eq!(species[6].category.as_deref(), Some("birds"));
    }

    #[test]
    fn test_describe_is_case_insensitive() {
        let d = describe(0, "snow leopard");
        assert_eq!(d.scientific_name, "Panthera uncia");
        assert_eq!(d.conservation_status, ConservationStatus::Vulnerable);
        // Keep the caller's spelling.
        assert_eq!(d.name, "snow leopard");
    }

    #[test]
    fn test_describe_unknown_name() {
        let d = describe(4, "Species_123");
        assert_eq!(d.scientific_name, "Unknown");
        assert_eq!(d.conservation_status, ConservationStatus::Unknown);
    }
}
