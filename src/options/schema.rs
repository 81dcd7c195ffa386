use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Top-level layout of an options file.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct OptionsFile {
    #[serde(default)]
    pub patching: PatchingOptions,
}

/// Raw, unvalidated selection options as written by the user.
///
/// Both the options file and the command line produce one of these; they are
/// combined with [`PatchingOptions::merge`] and then turned into
/// [`SelectionDirectives`] exactly once.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct PatchingOptions {
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    /// Only patches named in `include` are selected.
    #[serde(default)]
    pub exclusive: bool,
    /// Accept any version of a compatible package.
    #[serde(default)]
    pub experimental: bool,
    /// Files merged into the artifact, in order.
    #[serde(default)]
    pub merge: Vec<PathBuf>,
}

impl PatchingOptions {
    /// Layer `other` on top of `self`: lists are extended, flags are OR'ed.
    pub fn merge(&mut self, other: PatchingOptions) {
        self.exclude.extend(other.exclude);
        self.include.extend(other.include);
        self.exclusive |= other.exclusive;
        self.experimental |= other.experimental;
        self.merge.extend(other.merge);
    }
}

/// Validated selection directives for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SelectionDirectives {
    pub excluded_patches: BTreeSet<String>,
    pub included_patches: BTreeSet<String>,
    /// Treat every patch as excluded by default.
    pub default_exclude: bool,
    /// Skip version matching.
    pub experimental: bool,
    pub merge_files: Vec<PathBuf>,
}

impl SelectionDirectives {
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_patches.contains(name)
    }

    pub fn is_included(&self, name: &str) -> bool {
        self.included_patches.contains(name)
    }
}

/// Aggregated option problems; shares its layout with catalog validation.
pub type ValidationError = crate::catalog::ValidationError<ValidationIssue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyName { list: &'static str },
    MissingMergeFile { path: PathBuf },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyName { list } => {
                write!(f, "empty patch name in '{list}' list")
            }
            ValidationIssue::MissingMergeFile { path } => {
                write!(f, "merge file does not exist: {}", path.display())
            }
        }
    }
}
