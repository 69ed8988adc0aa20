pub mod bundle_r4;
pub mod catalog_csv;

// Re-export commonly used items
pub use bundle_r4::{BundleR4Parser, BundleSummary, ConceptEntry};
pub use catalog_csv::{CatalogCsvParser, CatalogRow};
