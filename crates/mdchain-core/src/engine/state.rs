use super::error::{EngineError, FailureKind};
use crate::core::naming::ArtifactNaming;
use crate::core::template::{Bindings, Placeholder};
use std::path::PathBuf;

/// The files one iteration reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationState {
    pub index: usize,
    pub read_path: PathBuf,
    pub write_path: PathBuf,
    pub input_path: PathBuf,
    pub log_path: PathBuf,
    pub dump_path: PathBuf,
    pub screen_path: PathBuf,
}

impl IterationState {
    pub fn new(naming: &ArtifactNaming, index: usize, read_path: PathBuf) -> Self {
        Self {
            index,
            read_path,
            write_path: naming.state_path(index + 1),
            input_path: naming.input_path(index),
            log_path: naming.log_path(index),
            dump_path: naming.dump_path(index),
            screen_path: naming.screen_path(index),
        }
    }

    /// The state of the following iteration, which reads this one's output.
    pub fn next(&self, naming: &ArtifactNaming) -> Self {
        Self::new(naming, self.index + 1, self.write_path.clone())
    }

    pub fn bindings(&self) -> Bindings {
        Bindings::new()
            .bind_path(Placeholder::Read, &self.read_path)
            .bind_path(Placeholder::Write, &self.write_path)
            .bind_path(Placeholder::Log, &self.log_path)
            .bind_path(Placeholder::Dump, &self.dump_path)
            .bind(Placeholder::Iteration, self.index.to_string())
    }
}

/// How a chain run ended.
#[derive(Debug)]
pub enum TerminalOutcome {
    /// All iterations completed; carries the total step count.
    Completed(usize),
    /// Iteration `.0` failed and the run stopped.
    Failed(usize, EngineError),
    /// Cancellation was observed before or during iteration `.0`.
    Cancelled(usize),
}

impl TerminalOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TerminalOutcome::Completed(_))
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TerminalOutcome::Failed(_, error) => Some(error.kind()),
            _ => None,
        }
    }

    /// The iteration the run stopped at, or the step count when it completed.
    pub fn iteration(&self) -> usize {
        match self {
            TerminalOutcome::Completed(n)
            | TerminalOutcome::Failed(n, _)
            | TerminalOutcome::Cancelled(n) => *n,
        }
    }
}
