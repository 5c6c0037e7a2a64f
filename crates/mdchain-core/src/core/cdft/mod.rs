//! CP2K constrained-DFT input rendering and output scraping.
//!
//! A coupling calculation needs three CP2K jobs per molecule: one per diabatic state and a
//! mixed job that restarts from both state wavefunctions with their converged constraint
//! strengths. [`input`] derives each job's input from a template, [`output`] reads back what
//! the next job needs.

pub mod input;
pub mod output;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub use input::{CdftInputParams, CdftTemplate, StateRestart, load_template, render_input};
pub use output::{ConstraintStrength, TextEncoding, extract_strength, is_finished, output_is_finished};

#[derive(Debug, Error)]
pub enum CdftError {
    #[error("I/O error on '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Template has no {0} keyword")]
    MissingKeyword(&'static str),
    #[error("Template has no WFN_RESTART_FILE_NAME line mentioning state '{label}'")]
    MissingRestart { label: String },
    #[error(
        "Coupling template must contain at least three &FORCE_EVAL sections (mixed, state A, state B), found {sections}"
    )]
    ForceEvalLayout { sections: usize },
    #[error("MM_INDEX entry {index} on line {line} becomes invalid after shifting by {offset}")]
    InvalidAtomIndex { line: usize, index: u64, offset: i64 },
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}
