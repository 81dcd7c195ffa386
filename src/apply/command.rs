use crate::apply::{ApplyEngine, ApplyOutcome, FailureCause};
use crate::catalog::PatchDescriptor;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine command is empty")]
    EmptyCommand,

    #[error("artifact does not exist: {0}")]
    MissingArtifact(PathBuf),
}

/// Apply engine that runs an external program once per patch.
///
/// The program is invoked as `<program> [args...] <patch-name> <artifact>`.
/// A zero exit status is a success; anything else becomes a failure carrying
/// the exit status and the captured stderr.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    artifact: PathBuf,
}

impl CommandEngine {
    /// Build an engine from a command line such as `patch-tool --quiet`.
    pub fn new(command: &[String], artifact: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let (program, args) = command.split_first().ok_or(EngineError::EmptyCommand)?;
        if program.trim().is_empty() {
            return Err(EngineError::EmptyCommand);
        }
        let artifact = artifact.into();
        if !artifact.exists() {
            return Err(EngineError::MissingArtifact(artifact));
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            artifact,
        })
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    fn run(&self, patch: &PatchDescriptor) -> ApplyOutcome {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&patch.name)
            .arg(&self.artifact)
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                return ApplyOutcome::Failure(FailureCause::new(format!(
                    "failed to run {}: {e}",
                    self.program
                )))
            }
        };

        if output.status.success() {
            return ApplyOutcome::Success;
        }

        let message = match output.status.code() {
            Some(code) => format!("{} exited with status {code}", self.program),
            None => format!("{} was terminated by a signal", self.program),
        };
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let cause = FailureCause::new(message);
        if stderr.is_empty() {
            ApplyOutcome::Failure(cause)
        } else {
            ApplyOutcome::Failure(cause.with_trace(stderr))
        }
    }
}

impl ApplyEngine for CommandEngine {
    fn apply(&mut self, patches: &[PatchDescriptor]) -> Vec<(PatchDescriptor, ApplyOutcome)> {
        patches
            .iter()
            .map(|patch| (patch.clone(), self.run(patch)))
            .collect()
    }
}
