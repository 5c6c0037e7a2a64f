use mdchain::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(
        "Chain stopped at iteration {iteration}: {source}\nHint: fix the cause and re-run the same command to resume from the last completed state."
    )]
    IterationFailed {
        iteration: usize,
        #[source]
        source: EngineError,
    },

    #[error(
        "Interrupted during {context}.\nHint: re-run the same command to resume where it stopped."
    )]
    Interrupted { context: String },

    #[error(
        "{failed} of {total} molecule(s) failed; see '{summary}' for the reasons.",
        summary = summary.display()
    )]
    MoleculesFailed {
        failed: usize,
        total: usize,
        summary: PathBuf,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
