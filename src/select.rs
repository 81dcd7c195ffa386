//! Patch selection: decides which catalog entries apply to a target.
//!
//! Each patch is run through a fixed sequence of gates and the first gate
//! that rejects it wins:
//!
//! 1. excluded by name
//! 2. excluded by default (unless included by name)
//! 3. deprecated (even when included by name)
//! 4. no compatibility metadata: included with a warning
//! 5. target package not listed
//! 6. target version not listed (unless experimental or a wildcard entry)
//!
//! Every patch produces at least one diagnostic explaining the decision.

use crate::catalog::{CompatiblePackage, PatchDescriptor};
use crate::diagnostics::DiagnosticSink;
use crate::options::SelectionDirectives;
use crate::target::PackageMetadata;

/// Why a patch was left out of the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    Manual,
    ByDefault,
    Deprecated {
        reason: String,
        replacement: Option<String>,
    },
    IncompatiblePackage {
        compatible: Vec<String>,
    },
    IncompatibleVersion {
        compatible: Vec<CompatiblePackage>,
    },
}

/// Outcome of running one patch through the selection gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Include,
    /// Included although no compatibility metadata was declared.
    IncludeUnverified,
    Exclude(Exclusion),
}

impl Decision {
    pub fn is_included(&self) -> bool {
        !matches!(self, Decision::Exclude(_))
    }
}

/// Filters a catalog against a target using the run's directives.
#[derive(Debug, Clone, Copy)]
pub struct SelectionEngine<'a> {
    target: &'a PackageMetadata,
    directives: &'a SelectionDirectives,
}

impl<'a> SelectionEngine<'a> {
    pub fn new(target: &'a PackageMetadata, directives: &'a SelectionDirectives) -> Self {
        Self { target, directives }
    }

    /// Decide a single patch without emitting diagnostics.
    pub fn decide(&self, patch: &PatchDescriptor) -> Decision {
        let directives = self.directives;

        if directives.is_excluded(&patch.name) {
            return Decision::Exclude(Exclusion::Manual);
        }

        if (!patch.include_by_default || directives.default_exclude)
            && !directives.is_included(&patch.name)
        {
            return Decision::Exclude(Exclusion::ByDefault);
        }

        if let Some(deprecation) = &patch.deprecated {
            return Decision::Exclude(Exclusion::Deprecated {
                reason: deprecation.reason.clone(),
                replacement: deprecation.replacement.clone(),
            });
        }

        let Some(packages) = &patch.compatible_packages else {
            return Decision::IncludeUnverified;
        };

        let matching: Vec<&CompatiblePackage> = packages
            .iter()
            .filter(|p| p.package_name == self.target.package_name)
            .collect();

        if matching.is_empty() {
            return Decision::Exclude(Exclusion::IncompatiblePackage {
                compatible: packages.iter().map(|p| p.package_name.clone()).collect(),
            });
        }

        let version_ok = directives.experimental
            || matching
                .iter()
                .any(|p| p.accepts(&self.target.package_version));
        if !version_ok {
            return Decision::Exclude(Exclusion::IncompatibleVersion {
                compatible: matching.into_iter().cloned().collect(),
            });
        }

        Decision::Include
    }

    /// Select the applicable subset of `catalog`, in catalog order.
    pub fn select(
        &self,
        catalog: &[PatchDescriptor],
        sink: &mut impl DiagnosticSink,
    ) -> Vec<PatchDescriptor> {
        let mut included = Vec::new();
        for patch in catalog {
            let decision = self.decide(patch);
            self.report(patch, &decision, sink);
            if decision.is_included() {
                included.push(patch.clone());
            }
        }
        included
    }

    fn report(
        &self,
        patch: &PatchDescriptor,
        decision: &Decision,
        sink: &mut impl DiagnosticSink,
    ) {
        let name = &patch.name;
        let prefix = format!("Skipping {name}, reason");

        match decision {
            Decision::Include => sink.trace(&format!("Adding {name}")),
            Decision::IncludeUnverified => sink.warn(&format!(
                "{name}: missing compatibility metadata, continuing anyway"
            )),
            Decision::Exclude(Exclusion::Manual) => {
                sink.info(&format!("{prefix}: manually excluded"))
            }
            Decision::Exclude(Exclusion::ByDefault) => {
                sink.info(&format!("{prefix}: excluded by default"))
            }
            Decision::Exclude(Exclusion::Deprecated {
                reason,
                replacement,
            }) => {
                sink.warn(&format!("{prefix}: deprecated: {reason}"));
                if let Some(replacement) = replacement {
                    sink.warn(&format!(
                        "Either use {replacement} instead or include it manually"
                    ));
                }
            }
            Decision::Exclude(Exclusion::IncompatiblePackage { compatible }) => {
                sink.warn(&format!(
                    "{prefix}: incompatible with {}. This patch is only compatible with {}",
                    self.target.package_name,
                    compatible.join(", ")
                ))
            }
            Decision::Exclude(Exclusion::IncompatibleVersion { compatible }) => {
                let versions = compatible
                    .iter()
                    .map(|p| {
                        let versions: Vec<&str> = p.versions.iter().map(String::as_str).collect();
                        format!("{}: {}", p.package_name, versions.join(", "))
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                sink.warn(&format!(
                    "{prefix}: incompatible with version {}. This patch is only compatible with version {versions}",
                    self.target.package_version
                ))
            }
        }
    }
}

/// Convenience wrapper around [`SelectionEngine::select`].
pub fn select(
    catalog: &[PatchDescriptor],
    target: &PackageMetadata,
    directives: &SelectionDirectives,
    sink: &mut impl DiagnosticSink,
) -> Vec<PatchDescriptor> {
    SelectionEngine::new(target, directives).select(catalog, sink)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use proptest::prelude::*;

    const NAMES: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

    fn arb_patch(name: &'static str) -> impl Strategy<Value = PatchDescriptor> {
        (
            any::<bool>(),
            any::<bool>(),
            prop::option::of(prop::collection::vec(
                (
                    prop::sample::select(vec!["app", "other"]),
                    prop::collection::vec(prop::sample::select(vec!["1.0", "2.0"]), 0..3),
                ),
                0..3,
            )),
        )
            .prop_map(move |(include, deprecated, packages)| {
                let mut patch = PatchDescriptor::new(name);
                patch.include_by_default = include;
                if deprecated {
                    patch = patch.deprecated("old", None);
                }
                patch.compatible_packages = packages.map(|entries| {
                    entries
                        .into_iter()
                        .map(|(pkg, versions)| CompatiblePackage::new(pkg, versions))
                        .collect()
                });
                patch
            })
    }

    fn arb_catalog() -> impl Strategy<Value = Vec<PatchDescriptor>> {
        NAMES
            .iter()
            .map(|name| arb_patch(*name))
            .collect::<Vec<_>>()
            .prop_shuffle()
    }

    fn arb_directives() -> impl Strategy<Value = SelectionDirectives> {
        (
            prop::sample::subsequence(NAMES.to_vec(), 0..3),
            prop::sample::subsequence(NAMES.to_vec(), 0..4),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(excluded, included, default_exclude, experimental)| {
                SelectionDirectives {
                    excluded_patches: excluded.into_iter().map(str::to_string).collect(),
                    included_patches: included.into_iter().map(str::to_string).collect(),
                    default_exclude,
                    experimental,
                    merge_files: Vec::new(),
                }
            })
    }

    fn arb_target() -> impl Strategy<Value = PackageMetadata> {
        (
            prop::sample::select(vec!["app", "other"]),
            prop::sample::select(vec!["1.0", "2.0"]),
        )
            .prop_map(|(name, version)| PackageMetadata::new(name, version))
    }

    proptest! {
        #[test]
        fn selection_is_idempotent(
            catalog in arb_catalog(),
            target in arb_target(),
            directives in arb_directives(),
        ) {
            let mut first_sink = RecordingSink::new();
            let mut second_sink = RecordingSink::new();
            let first = select(&catalog, &target, &directives, &mut first_sink);
            let second = select(&catalog, &target, &directives, &mut second_sink);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first_sink, second_sink);
        }

        #[test]
        fn selection_preserves_catalog_order(
            catalog in arb_catalog(),
            target in arb_target(),
            directives in arb_directives(),
        ) {
            let mut sink = RecordingSink::new();
            let selected = select(&catalog, &target, &directives, &mut sink);
            let positions: Vec<usize> = selected
                .iter()
                .map(|p| catalog.iter().position(|c| c.name == p.name).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn excluded_and_deprecated_never_selected(
            catalog in arb_catalog(),
            target in arb_target(),
            directives in arb_directives(),
        ) {
            let mut sink = RecordingSink::new();
            let selected = select(&catalog, &target, &directives, &mut sink);
            for patch in &selected {
                prop_assert!(!directives.is_excluded(&patch.name));
                prop_assert!(patch.deprecated.is_none());
            }
        }

        #[test]
        fn wildcard_entry_admits_every_version(version in "[0-9a-z.]{1,8}") {
            let patch = PatchDescriptor::new("p").compatible_with("app", Vec::<String>::new());
            let target = PackageMetadata::new("app", version);
            let directives = SelectionDirectives::default();
            prop_assert_eq!(
                SelectionEngine::new(&target, &directives).decide(&patch),
                Decision::Include
            );
        }

        #[test]
        fn experimental_only_requires_package_match(
            catalog in arb_catalog(),
            target in arb_target(),
            directives in arb_directives(),
        ) {
            let directives = SelectionDirectives { experimental: true, ..directives };
            let engine = SelectionEngine::new(&target, &directives);
            for patch in &catalog {
                if let Decision::Exclude(Exclusion::IncompatibleVersion { .. }) = engine.decide(patch) {
                    prop_assert!(false, "version gate fired for {} in experimental mode", patch.name);
                }
            }
        }
    }
}
