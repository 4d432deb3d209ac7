//! Species catalog: class index to species descriptor.

mod loader;
mod reference;
mod types;

pub use loader::{BUILT_IN_SOURCE, default_catalog, load_catalog, load_catalog_or_default};
pub use types::{ConservationStatus, SpeciesCatalog, SpeciesDescriptor};
