use crate::catalog::schema::{PatchCatalog, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug)]
pub enum CatalogError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
    NoCatalogFiles {
        dir: PathBuf,
    },
}

impl CatalogError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            CatalogError::Toml { path: None, source } => CatalogError::Toml {
                path: Some(path),
                source,
            },
            CatalogError::Validation { path: None, source } => CatalogError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Io { path, source } => {
                write!(f, "failed to read patch catalog {}: {}", path.display(), source)
            }
            CatalogError::Walk { path, source } => {
                write!(f, "failed to scan catalog directory {}: {}", path.display(), source)
            }
            CatalogError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse patch catalog TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse patch catalog TOML: {}", source),
            },
            CatalogError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid patch catalog ({}): {}", path.display(), source),
                None => write!(f, "invalid patch catalog: {}", source),
            },
            CatalogError::NoCatalogFiles { dir } => {
                write!(f, "no .toml catalog files found in {}", dir.display())
            }
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io { source, .. } => Some(source),
            CatalogError::Walk { source, .. } => Some(source),
            CatalogError::Toml { source, .. } => Some(source),
            CatalogError::Validation { source, .. } => Some(source),
            CatalogError::NoCatalogFiles { .. } => None,
        }
    }
}

/// Parse and validate a single catalog document.
pub fn load_from_str(input: &str) -> Result<PatchCatalog, CatalogError> {
    let catalog = parse_str(input)?;
    catalog
        .validate()
        .map_err(|source| CatalogError::Validation { path: None, source })?;
    Ok(catalog)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchCatalog, CatalogError> {
    let path = path.as_ref();
    let contents = read(path)?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Load a catalog from a file, or from every `*.toml` file directly inside a
/// directory (sorted by path).
///
/// Files are concatenated before validation, so names must be unique across
/// all of them and replacements may point into a sibling file.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<PatchCatalog, CatalogError> {
    let path = path.as_ref();
    if !path.is_dir() {
        return load_from_path(path);
    }

    let files = discover_catalog_files(path)?;
    let mut catalog = PatchCatalog::default();
    for file in &files {
        let contents = read(file)?;
        catalog.extend(parse_str(&contents).map_err(|error| error.with_path(file))?);
    }
    catalog
        .validate()
        .map_err(|source| CatalogError::Validation {
            path: Some(path.to_path_buf()),
            source,
        })?;
    Ok(catalog)
}

/// All `*.toml` files directly inside `dir`, sorted.
pub fn discover_catalog_files(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(|source| CatalogError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();

    if files.is_empty() {
        return Err(CatalogError::NoCatalogFiles {
            dir: dir.to_path_buf(),
        });
    }
    Ok(files)
}

fn parse_str(input: &str) -> Result<PatchCatalog, CatalogError> {
    toml_edit::de::from_str(input).map_err(|source| CatalogError::Toml { path: None, source })
}

fn read(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })
}
