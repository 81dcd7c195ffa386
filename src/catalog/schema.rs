use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// A set of patch descriptors, usually loaded from one or more TOML files.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
pub struct PatchCatalog {
    #[serde(default)]
    pub patches: Vec<PatchDescriptor>,
}

impl PatchCatalog {
    pub fn new(patches: Vec<PatchDescriptor>) -> Self {
        Self { patches }
    }

    /// Look up a patch by name.
    pub fn get(&self, name: &str) -> Option<&PatchDescriptor> {
        self.patches.iter().find(|patch| patch.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patches.iter().map(|patch| patch.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Append the patches of another catalog, keeping order.
    pub fn extend(&mut self, other: PatchCatalog) {
        self.patches.extend(other.patches);
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.patches.is_empty() {
            issues.push(ValidationIssue::EmptyCatalog);
        }

        let mut seen = HashSet::new();
        for patch in &self.patches {
            if patch.name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch: None,
                    field: "name",
                });
                continue;
            }
            if !seen.insert(patch.name.as_str()) {
                issues.push(ValidationIssue::DuplicateName {
                    name: patch.name.clone(),
                });
            }

            if let Some(packages) = &patch.compatible_packages {
                for package in packages {
                    if package.package_name.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch: Some(patch.name.clone()),
                            field: "compatible_packages.package_name",
                        });
                    }
                }
            }

            if let Some(Deprecation {
                replacement: Some(replacement),
                ..
            }) = &patch.deprecated
            {
                if replacement == &patch.name {
                    issues.push(ValidationIssue::InvalidReplacement {
                        patch: patch.name.clone(),
                        message: "a patch cannot replace itself".to_string(),
                    });
                } else if self.get(replacement).is_none() {
                    issues.push(ValidationIssue::InvalidReplacement {
                        patch: patch.name.clone(),
                        message: format!("replacement '{replacement}' is not in the catalog"),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// One independently applicable patch and its selection metadata.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PatchDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `None` means no compatibility metadata was declared at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible_packages: Option<Vec<CompatiblePackage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<Deprecation>,
    #[serde(default = "default_include")]
    pub include_by_default: bool,
}

fn default_include() -> bool {
    true
}

impl PatchDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            compatible_packages: None,
            deprecated: None,
            include_by_default: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare compatibility with `package_name` at the given versions.
    ///
    /// An empty `versions` list accepts every version of the package.
    pub fn compatible_with<I, V>(mut self, package_name: impl Into<String>, versions: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.compatible_packages
            .get_or_insert_with(Vec::new)
            .push(CompatiblePackage::new(package_name, versions));
        self
    }

    pub fn deprecated(mut self, reason: impl Into<String>, replacement: Option<&str>) -> Self {
        self.deprecated = Some(Deprecation {
            reason: reason.into(),
            replacement: replacement.map(str::to_string),
        });
        self
    }

    pub fn excluded_by_default(mut self) -> Self {
        self.include_by_default = false;
        self
    }

    /// Whether any compatibility entry names `package_name`.
    pub fn supports_package(&self, package_name: &str) -> bool {
        self.compatible_packages
            .as_ref()
            .is_some_and(|packages| packages.iter().any(|p| p.package_name == package_name))
    }

    /// Whether selection for `package_name` could include this patch: it either
    /// declares the package or declares no compatibility metadata at all.
    pub fn is_candidate_for(&self, package_name: &str) -> bool {
        self.compatible_packages.is_none() || self.supports_package(package_name)
    }
}

impl fmt::Display for PatchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CompatiblePackage {
    pub package_name: String,
    /// Empty means every version.
    #[serde(default)]
    pub versions: BTreeSet<String>,
}

impl CompatiblePackage {
    pub fn new<I, V>(package_name: impl Into<String>, versions: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            package_name: package_name.into(),
            versions: versions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn accepts_any_version(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn accepts(&self, version: &str) -> bool {
        self.accepts_any_version() || self.versions.contains(version)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Deprecation {
    pub reason: String,
    /// Name of the patch that supersedes this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

/// Every problem found in one validation pass, reported one per line.
#[derive(Debug, Clone)]
pub struct ValidationError<I = ValidationIssue> {
    pub issues: Vec<I>,
}

impl<I: fmt::Display> fmt::Display for ValidationError<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl<I: fmt::Debug + fmt::Display> std::error::Error for ValidationError<I> {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyCatalog,
    MissingField {
        patch: Option<String>,
        field: &'static str,
    },
    DuplicateName {
        name: String,
    },
    InvalidReplacement {
        patch: String,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyCatalog => write!(f, "patch catalog contains no patches"),
            ValidationIssue::MissingField { patch, field } => match patch {
                Some(name) => write!(f, "patch '{name}' missing required field '{field}'"),
                None => write!(f, "patch missing required field '{field}'"),
            },
            ValidationIssue::DuplicateName { name } => {
                write!(f, "patch name '{name}' is declared more than once")
            }
            ValidationIssue::InvalidReplacement { patch, message } => {
                write!(f, "patch '{patch}' has an invalid deprecation: {message}")
            }
        }
    }
}
