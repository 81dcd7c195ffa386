pub mod loader;
pub mod schema;

pub use loader::{discover_catalog_files, load_catalog, load_from_path, load_from_str, CatalogError};
pub use schema::{
    CompatiblePackage, Deprecation, PatchCatalog, PatchDescriptor, ValidationError,
    ValidationIssue,
};
