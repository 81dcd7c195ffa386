//! Driving the external apply engine and reporting per-patch outcomes.

pub mod command;

use crate::catalog::PatchDescriptor;
use crate::diagnostics::DiagnosticSink;
use std::fmt;

pub use command::{CommandEngine, EngineError};

/// Diagnostic detail attached to a failed patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureCause {
    pub message: String,
    pub trace: Option<String>,
}

impl FailureCause {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(trace) = &self.trace {
            write!(f, "\n{trace}")?;
        }
        Ok(())
    }
}

/// Result of applying one patch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "ApplyOutcome should be checked for success/failure"]
pub enum ApplyOutcome {
    Success,
    Failure(FailureCause),
}

impl ApplyOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        ApplyOutcome::Failure(FailureCause::new(message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApplyOutcome::Success)
    }
}

/// Performs the actual transformation of the artifact.
///
/// Implementations must return exactly one outcome per submitted patch, in
/// submission order, and isolate failures so one failing patch does not stop
/// the others.
pub trait ApplyEngine {
    fn apply(&mut self, patches: &[PatchDescriptor]) -> Vec<(PatchDescriptor, ApplyOutcome)>;
}

/// Outcomes of one application run, in engine order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub outcomes: Vec<(PatchDescriptor, ApplyOutcome)>,
}

impl ApplyReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&PatchDescriptor, &FailureCause)> {
        self.outcomes.iter().filter_map(|(patch, outcome)| match outcome {
            ApplyOutcome::Failure(cause) => Some((patch, cause)),
            ApplyOutcome::Success => None,
        })
    }
}

/// Hands the selected patches to an [`ApplyEngine`] and reports every outcome.
pub struct ApplicationDriver<E> {
    engine: E,
}

impl<E: ApplyEngine> ApplicationDriver<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Apply `selected` and report each outcome in the order the engine
    /// produced it. Failures never stop the walk.
    pub fn apply(
        &mut self,
        selected: &[PatchDescriptor],
        sink: &mut impl DiagnosticSink,
    ) -> ApplyReport {
        let outcomes = self.engine.apply(selected);

        if outcomes.len() != selected.len() {
            sink.error(&format!(
                "Apply engine reported {} outcomes for {} patches",
                outcomes.len(),
                selected.len()
            ));
        }

        for (patch, outcome) in &outcomes {
            match outcome {
                ApplyOutcome::Success => sink.info(&format!("{patch} succeeded")),
                ApplyOutcome::Failure(cause) => {
                    sink.error(&format!("{patch} failed:"));
                    sink.error(&cause.message);
                    if let Some(trace) = &cause.trace {
                        sink.error(trace);
                    }
                }
            }
        }

        ApplyReport { outcomes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Level, RecordingSink};
    use std::collections::HashMap;

    /// Engine with canned outcomes, keyed by patch name.
    #[derive(Default)]
    struct ScriptedEngine {
        failures: HashMap<String, FailureCause>,
        calls: Vec<Vec<String>>,
    }

    impl ScriptedEngine {
        fn failing(mut self, name: &str, cause: FailureCause) -> Self {
            self.failures.insert(name.to_string(), cause);
            self
        }
    }

    impl ApplyEngine for ScriptedEngine {
        fn apply(&mut self, patches: &[PatchDescriptor]) -> Vec<(PatchDescriptor, ApplyOutcome)> {
            self.calls
                .push(patches.iter().map(|p| p.name.clone()).collect());
            patches
                .iter()
                .map(|patch| {
                    let outcome = match self.failures.get(&patch.name) {
                        Some(cause) => ApplyOutcome::Failure(cause.clone()),
                        None => ApplyOutcome::Success,
                    };
                    (patch.clone(), outcome)
                })
                .collect()
        }
    }

    struct ShortEngine;

    impl ApplyEngine for ShortEngine {
        fn apply(&mut self, patches: &[PatchDescriptor]) -> Vec<(PatchDescriptor, ApplyOutcome)> {
            patches
                .iter()
                .take(1)
                .map(|p| (p.clone(), ApplyOutcome::Success))
                .collect()
        }
    }

    #[test]
    fn test_reports_every_outcome_without_stopping() {
        let engine = ScriptedEngine::default()
            .failing("p2", FailureCause::new("boom").with_trace("at step 3"));
        let mut driver = ApplicationDriver::new(engine);
        let selected = vec![
            PatchDescriptor::new("p1"),
            PatchDescriptor::new("p2"),
            PatchDescriptor::new("p3"),
        ];

        let mut sink = RecordingSink::new();
        let report = driver.apply(&selected, &mut sink);

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert!(report.has_failures());
        assert_eq!(
            sink.records,
            vec![
                (Level::Info, "p1 succeeded".to_string()),
                (Level::Error, "p2 failed:".to_string()),
                (Level::Error, "boom".to_string()),
                (Level::Error, "at step 3".to_string()),
                (Level::Info, "p3 succeeded".to_string()),
            ]
        );

        let engine = driver.into_engine();
        assert_eq!(engine.calls, vec![vec!["p1", "p2", "p3"]]);
    }

    #[test]
    fn test_failure_without_trace() {
        let engine = ScriptedEngine::default().failing("p", FailureCause::new("bad input"));
        let mut driver = ApplicationDriver::new(engine);
        let mut sink = RecordingSink::new();
        let report = driver.apply(&[PatchDescriptor::new("p")], &mut sink);

        assert_eq!(sink.messages_at(Level::Error), vec!["p failed:", "bad input"]);
        let failures: Vec<_> = report.failures().map(|(p, c)| (p.name.as_str(), c)).collect();
        assert_eq!(failures, vec![("p", &FailureCause::new("bad input"))]);
    }

    #[test]
    fn test_empty_selection() {
        let mut driver = ApplicationDriver::new(ScriptedEngine::default());
        let mut sink = RecordingSink::new();
        let report = driver.apply(&[], &mut sink);

        assert!(report.outcomes.is_empty());
        assert!(!report.has_failures());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_short_engine_is_reported() {
        let mut driver = ApplicationDriver::new(ShortEngine);
        let mut sink = RecordingSink::new();
        let selected = vec![PatchDescriptor::new("a"), PatchDescriptor::new("b")];
        let report = driver.apply(&selected, &mut sink);

        assert_eq!(report.outcomes.len(), 1);
        assert!(sink.contains(Level::Error, "reported 1 outcomes for 2 patches"));
    }

    #[test]
    fn test_failure_cause_display() {
        let cause = FailureCause::new("boom").with_trace("line 1\nline 2");
        assert_eq!(cause.to_string(), "boom\nline 1\nline 2");
        assert_eq!(FailureCause::new("boom").to_string(), "boom");
    }
}
