//! Merging auxiliary files into the artifact.

use crate::diagnostics::DiagnosticSink;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("merge source does not exist: {0}")]
    MissingSource(PathBuf),

    #[error("merge source has no file name: {0}")]
    InvalidSource(PathBuf),

    #[error("failed to merge {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// Performs the merge of a single file.
pub trait MergeEngine {
    fn merge_file(&mut self, file: &Path) -> Result<(), MergeError>;
}

/// Requests a merge for each configured file, in order.
pub struct FileMergeTrigger<M> {
    engine: M,
}

impl<M: MergeEngine> FileMergeTrigger<M> {
    pub fn new(engine: M) -> Self {
        Self { engine }
    }

    pub fn into_engine(self) -> M {
        self.engine
    }

    /// Merge every file; the first failure is returned and later files are
    /// not attempted.
    pub fn merge_all(
        &mut self,
        files: &[PathBuf],
        sink: &mut impl DiagnosticSink,
    ) -> Result<(), MergeError> {
        for file in files {
            sink.info(&format!("Merging {}", file.display()));
            self.engine.merge_file(file)?;
        }
        Ok(())
    }
}

/// Copies files, or whole directory trees, into the artifact directory.
///
/// The source keeps its file name, so `extra/res` lands at `<artifact>/res`.
#[derive(Debug, Clone)]
pub struct DirectoryMerger {
    artifact: PathBuf,
}

impl DirectoryMerger {
    pub fn new(artifact: impl Into<PathBuf>) -> Self {
        Self {
            artifact: artifact.into(),
        }
    }

    fn copy_file(from: &Path, to: &Path) -> Result<(), MergeError> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|source| MergeError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::copy(from, to).map_err(|source| MergeError::Io {
            path: from.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

impl MergeEngine for DirectoryMerger {
    fn merge_file(&mut self, file: &Path) -> Result<(), MergeError> {
        if !file.exists() {
            return Err(MergeError::MissingSource(file.to_path_buf()));
        }
        let name = file
            .file_name()
            .ok_or_else(|| MergeError::InvalidSource(file.to_path_buf()))?;
        let dest = self.artifact.join(name);

        if file.is_file() {
            return Self::copy_file(file, &dest);
        }

        for entry in WalkDir::new(file).sort_by_file_name() {
            let entry = entry.map_err(|source| MergeError::Walk {
                path: file.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(file)
                .map_err(|_| MergeError::InvalidSource(entry.path().to_path_buf()))?;
            Self::copy_file(entry.path(), &dest.join(relative))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Level, RecordingSink};

    #[derive(Default)]
    struct RecordingMerger {
        merged: Vec<PathBuf>,
        fail_on: Option<PathBuf>,
    }

    impl MergeEngine for RecordingMerger {
        fn merge_file(&mut self, file: &Path) -> Result<(), MergeError> {
            if self.fail_on.as_deref() == Some(file) {
                return Err(MergeError::MissingSource(file.to_path_buf()));
            }
            self.merged.push(file.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn test_merge_all_in_order() {
        let files = vec![PathBuf::from("b.dex"), PathBuf::from("a.dex")];
        let mut trigger = FileMergeTrigger::new(RecordingMerger::default());
        let mut sink = RecordingSink::new();

        trigger.merge_all(&files, &mut sink).unwrap();

        assert_eq!(trigger.into_engine().merged, files);
        assert_eq!(
            sink.messages_at(Level::Info),
            vec!["Merging b.dex", "Merging a.dex"]
        );
    }

    #[test]
    fn test_merge_failure_propagates() {
        let files = vec![
            PathBuf::from("one"),
            PathBuf::from("two"),
            PathBuf::from("three"),
        ];
        let merger = RecordingMerger {
            fail_on: Some(PathBuf::from("two")),
            ..Default::default()
        };
        let mut trigger = FileMergeTrigger::new(merger);
        let mut sink = RecordingSink::new();

        let err = trigger.merge_all(&files, &mut sink).unwrap_err();
        assert!(matches!(err, MergeError::MissingSource(_)));
        assert_eq!(trigger.into_engine().merged, vec![PathBuf::from("one")]);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_directory_merger_copies_file_and_tree() {
        let source = tempfile::tempdir().unwrap();
        let artifact = tempfile::tempdir().unwrap();

        let single = source.path().join("extra.bin");
        fs::write(&single, b"payload").unwrap();
        let tree = source.path().join("res");
        fs::create_dir_all(tree.join("values")).unwrap();
        fs::write(tree.join("values/strings.xml"), "<resources/>").unwrap();

        let mut merger = DirectoryMerger::new(artifact.path());
        merger.merge_file(&single).unwrap();
        merger.merge_file(&tree).unwrap();

        assert_eq!(fs::read(artifact.path().join("extra.bin")).unwrap(), b"payload");
        assert_eq!(
            fs::read_to_string(artifact.path().join("res/values/strings.xml")).unwrap(),
            "<resources/>"
        );
    }

    #[test]
    fn test_directory_merger_missing_source() {
        let artifact = tempfile::tempdir().unwrap();
        let mut merger = DirectoryMerger::new(artifact.path());
        let err = merger
            .merge_file(Path::new("/no/such/merge/file"))
            .unwrap_err();
        assert!(matches!(err, MergeError::MissingSource(_)));
    }
}
