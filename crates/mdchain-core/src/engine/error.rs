use super::config::ConfigError;
use super::process::ProcessError;
use crate::core::cdft::CdftError;
use crate::core::io::mol2::Mol2Error;
use crate::core::io::pdb::PdbError;
use crate::core::marker::MarkerError;
use crate::core::structure::StructureError;
use crate::core::template::TemplateError;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Copyable discriminant of [`EngineError`], convenient for matching and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Template,
    InputStateMissing,
    EngineLaunch,
    EngineExecution,
    OutputArtifactMissing,
    Timeout,
    Cancelled,
    Supervision,
    Io,
    Marker,
    ResumeMismatch,
    Config,
    Cdft,
    Pdb,
    Mol2,
    Structure,
    Summary,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Iteration {iteration}: input state '{path}' does not exist", path = path.display())]
    InputStateMissing { iteration: usize, path: PathBuf },

    #[error("Iteration {iteration}: failed to launch '{program}': {source}")]
    EngineLaunch {
        iteration: usize,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Iteration {iteration}: engine terminated with {}", describe_exit(.code))]
    EngineExecution { iteration: usize, code: Option<i32> },

    #[error(
        "Iteration {iteration}: engine exited cleanly but output state '{path}' is missing or empty",
        path = path.display()
    )]
    OutputArtifactMissing { iteration: usize, path: PathBuf },

    #[error("Iteration {iteration}: engine exceeded the time limit of {limit:?}")]
    Timeout { iteration: usize, limit: Duration },

    #[error("Iteration {iteration}: cancelled")]
    Cancelled { iteration: usize },

    #[error("Iteration {iteration}: lost track of the engine process: {source}")]
    Supervision {
        iteration: usize,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Progress marker error: {0}")]
    Marker(#[from] MarkerError),

    #[error(
        "Progress marker records '{recorded}' as the resume state but '{expected}' was expected; \
         re-run with --fresh to start over",
        recorded = recorded.display(),
        expected = expected.display()
    )]
    ResumeMismatch { expected: PathBuf, recorded: PathBuf },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CDFT input/output error: {0}")]
    Cdft(#[from] CdftError),

    #[error("Failed to process PDB file '{path}': {source}", path = path.display())]
    Pdb {
        path: PathBuf,
        #[source]
        source: PdbError,
    },

    #[error("Failed to process mol2 file '{path}': {source}", path = path.display())]
    Mol2 {
        path: PathBuf,
        #[source]
        source: Mol2Error,
    },

    #[error("Structure error: {0}")]
    Structure(#[from] StructureError),

    #[error("Failed to write summary '{path}': {source}", path = path.display())]
    Summary {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal (no exit code)".to_string(),
    }
}

impl EngineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::Template(_) => FailureKind::Template,
            EngineError::InputStateMissing { .. } => FailureKind::InputStateMissing,
            EngineError::EngineLaunch { .. } => FailureKind::EngineLaunch,
            EngineError::EngineExecution { .. } => FailureKind::EngineExecution,
            EngineError::OutputArtifactMissing { .. } => FailureKind::OutputArtifactMissing,
            EngineError::Timeout { .. } => FailureKind::Timeout,
            EngineError::Cancelled { .. } => FailureKind::Cancelled,
            EngineError::Supervision { .. } => FailureKind::Supervision,
            EngineError::Io { .. } => FailureKind::Io,
            EngineError::Marker(_) => FailureKind::Marker,
            EngineError::ResumeMismatch { .. } => FailureKind::ResumeMismatch,
            EngineError::Config(_) => FailureKind::Config,
            EngineError::Cdft(_) => FailureKind::Cdft,
            EngineError::Pdb { .. } => FailureKind::Pdb,
            EngineError::Mol2 { .. } => FailureKind::Mol2,
            EngineError::Structure(_) => FailureKind::Structure,
            EngineError::Summary { .. } => FailureKind::Summary,
        }
    }

    /// The iteration the error is attributed to, for errors raised inside the chain loop.
    pub fn iteration(&self) -> Option<usize> {
        match self {
            EngineError::InputStateMissing { iteration, .. }
            | EngineError::EngineLaunch { iteration, .. }
            | EngineError::EngineExecution { iteration, .. }
            | EngineError::OutputArtifactMissing { iteration, .. }
            | EngineError::Timeout { iteration, .. }
            | EngineError::Cancelled { iteration }
            | EngineError::Supervision { iteration, .. } => Some(*iteration),
            _ => None,
        }
    }

    /// Whether a fresh attempt of the same iteration could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::EngineExecution | FailureKind::Timeout
        )
    }

    pub fn from_process(iteration: usize, error: ProcessError) -> Self {
        match error {
            ProcessError::Launch { program, source } => EngineError::EngineLaunch {
                iteration,
                program,
                source,
            },
            ProcessError::Timeout(limit) => EngineError::Timeout { iteration, limit },
            ProcessError::Cancelled => EngineError::Cancelled { iteration },
            ProcessError::Io(source) => EngineError::Supervision { iteration, source },
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }
}
