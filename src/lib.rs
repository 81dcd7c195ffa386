//! Artifact Patcher: compatibility-aware patch selection and application
//!
//! Takes a catalog of patches, decides which of them apply to a target
//! package and version, hands the selection to an external apply engine and
//! reports what happened to each patch.
//!
//! # Architecture
//!
//! - [`select::SelectionEngine`] filters the catalog against the target and
//!   the user's [`options::SelectionDirectives`].
//! - [`apply::ApplicationDriver`] runs an [`apply::ApplyEngine`] over the
//!   selection and reports every outcome, never stopping at a failure.
//! - [`merge::FileMergeTrigger`] merges auxiliary files into the artifact.
//!
//! All three take a [`diagnostics::DiagnosticSink`] explicitly.
//!
//! # Example
//!
//! ```
//! use artifact_patcher::{select, PackageMetadata, PatchDescriptor, RecordingSink, SelectionDirectives};
//!
//! let catalog = vec![
//!     PatchDescriptor::new("hide-ads").compatible_with("com.example.app", ["1.0"]),
//!     PatchDescriptor::new("debug-menu").excluded_by_default(),
//! ];
//! let target = PackageMetadata::new("com.example.app", "1.0");
//! let mut sink = RecordingSink::new();
//!
//! let selected = select(&catalog, &target, &SelectionDirectives::default(), &mut sink);
//! assert_eq!(selected.len(), 1);
//! assert_eq!(selected[0].name, "hide-ads");
//! ```

pub mod apply;
pub mod catalog;
pub mod diagnostics;
pub mod merge;
pub mod options;
pub mod select;
pub mod target;

// Re-exports
pub use apply::{
    ApplicationDriver, ApplyEngine, ApplyOutcome, ApplyReport, CommandEngine, EngineError,
    FailureCause,
};
pub use catalog::{
    load_catalog, CatalogError, CompatiblePackage, Deprecation, PatchCatalog, PatchDescriptor,
};
pub use diagnostics::{DiagnosticSink, Level, RecordingSink, TracingSink};
pub use merge::{DirectoryMerger, FileMergeTrigger, MergeEngine, MergeError};
pub use options::{ConfigError, PatchingOptions, SelectionDirectives};
pub use select::{select, Decision, Exclusion, SelectionEngine};
pub use target::{read_package_metadata, PackageMetadata, TargetError};
