//! # mdchain Core Library
//!
//! Drives chains of LAMMPS molecular-dynamics segments, where each segment restarts from the
//! state artifact written by the previous one, and prepares the CP2K constrained-DFT inputs
//! used for electronic-coupling calculations on the resulting structures.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless building blocks: placeholder templates, the
//!   artifact naming scheme, the persisted progress marker, CDFT input rendering and output
//!   scraping, and PDB/mol2 structure I/O.
//!
//! - **[`engine`]: The Logic Core.** Configuration builders, the error taxonomy, progress
//!   reporting, per-iteration state records and the scoped external-process runner that
//!   guarantees no engine process outlives its iteration.
//!
//! - **[`workflows`]: The Public API.** Complete procedures built from the two layers below:
//!   the chained MD driver, the CDFT coupling pipeline and structure preparation.

pub mod core;
pub mod engine;
pub mod workflows;
