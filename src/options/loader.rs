//! Loading the options file and resolving options into directives.

use crate::catalog::PatchCatalog;
use crate::diagnostics::DiagnosticSink;
use crate::options::schema::{
    OptionsFile, PatchingOptions, SelectionDirectives, ValidationError, ValidationIssue,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Minimum similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.7;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read options file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse options file {path}: {source}")]
    Toml {
        path: PathBuf,
        source: toml_edit::de::Error,
    },

    #[error("invalid patching options:\n{0}")]
    Validation(#[from] ValidationError),
}

pub fn load_from_str(input: &str) -> Result<PatchingOptions, toml_edit::de::Error> {
    let file: OptionsFile = toml_edit::de::from_str(input)?;
    Ok(file.patching)
}

/// Load `[patching]` options from a TOML file.
///
/// Relative merge paths are resolved against the file's directory.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchingOptions, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut options = load_from_str(&contents).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(base) = path.parent() {
        options.merge = options
            .merge
            .into_iter()
            .map(|file| if file.is_relative() { base.join(file) } else { file })
            .collect();
    }
    Ok(options)
}

impl PatchingOptions {
    /// Validate the options against the catalog and freeze them into directives.
    ///
    /// Fails on empty names and merge files that do not exist. A name that is
    /// both included and excluded stays in both sets, so selection skips it as
    /// manually excluded; resolution only warns about it. Names the catalog
    /// does not know also produce a warning, with a suggestion when a close
    /// match exists.
    pub fn resolve(
        self,
        catalog: &PatchCatalog,
        sink: &mut impl DiagnosticSink,
    ) -> Result<SelectionDirectives, ConfigError> {
        let mut issues = Vec::new();

        let excluded = collect_names(self.exclude, "exclude", &mut issues);
        let included = collect_names(self.include, "include", &mut issues);

        for path in &self.merge {
            if !path.exists() {
                issues.push(ValidationIssue::MissingMergeFile { path: path.clone() });
            }
        }

        if !issues.is_empty() {
            return Err(ValidationError { issues }.into());
        }

        for name in excluded.intersection(&included) {
            sink.warn(&format!(
                "Patch '{name}' is both included and excluded, it will be excluded"
            ));
        }

        for name in excluded.iter().chain(included.iter()) {
            if catalog.get(name).is_some() {
                continue;
            }
            match closest_name(catalog, name) {
                Some(suggestion) => sink.warn(&format!(
                    "Unknown patch '{name}' in options, did you mean '{suggestion}'?"
                )),
                None => sink.warn(&format!("Unknown patch '{name}' in options")),
            }
        }

        Ok(SelectionDirectives {
            excluded_patches: excluded,
            included_patches: included,
            default_exclude: self.exclusive,
            experimental: self.experimental,
            merge_files: self.merge,
        })
    }
}

fn collect_names(
    names: Vec<String>,
    list: &'static str,
    issues: &mut Vec<ValidationIssue>,
) -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            issues.push(ValidationIssue::EmptyName { list });
        } else {
            set.insert(name.to_string());
        }
    }
    set
}

fn closest_name<'a>(catalog: &'a PatchCatalog, name: &str) -> Option<&'a str> {
    catalog
        .names()
        .map(|candidate| (candidate, strsim::normalized_levenshtein(name, candidate)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate)
}
