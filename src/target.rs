//! Identity of the artifact being patched.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File at the artifact root that declares its package identity.
pub const PACKAGE_MANIFEST: &str = "package.toml";

/// Package name and version of the target artifact. Fixed for a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PackageMetadata {
    pub package_name: String,
    pub package_version: String,
}

impl PackageMetadata {
    pub fn new(package_name: impl Into<String>, package_version: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            package_version: package_version.into(),
        }
    }
}

impl fmt::Display for PackageMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.package_name, self.package_version)
    }
}

#[derive(Error, Debug)]
pub enum TargetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("{path} does not declare package.{field}")]
    MissingField { path: PathBuf, field: &'static str },
}

/// Read `[package] name` and `version` from the artifact's `package.toml`.
pub fn read_package_metadata(artifact: &Path) -> Result<PackageMetadata, TargetError> {
    let path = artifact.join(PACKAGE_MANIFEST);
    let manifest = fs::read_to_string(&path).map_err(|source| TargetError::Io {
        path: path.clone(),
        source,
    })?;
    let doc = manifest
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| TargetError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;

    let field = |key: &'static str| {
        doc.get("package")
            .and_then(|pkg| pkg.get(key))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| TargetError::MissingField {
                path: path.clone(),
                field: key,
            })
    };

    Ok(PackageMetadata::new(field("name")?, field("version")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_package_metadata() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(PACKAGE_MANIFEST),
            "[package]\nname = \"com.example.app\"\nversion = \"18.03.36\"\n",
        )
        .unwrap();

        let target = read_package_metadata(dir.path()).unwrap();
        assert_eq!(target, PackageMetadata::new("com.example.app", "18.03.36"));
        assert_eq!(target.to_string(), "com.example.app 18.03.36");
    }

    #[test]
    fn test_read_package_metadata_missing_version() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PACKAGE_MANIFEST), "[package]\nname = \"app\"\n").unwrap();

        let err = read_package_metadata(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            TargetError::MissingField {
                field: "version",
                ..
            }
        ));
    }

    #[test]
    fn test_read_package_metadata_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_package_metadata(dir.path()).unwrap_err();
        assert!(matches!(err, TargetError::Io { .. }));
    }
}
