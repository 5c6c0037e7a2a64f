//! # Workflows Module
//!
//! Top-level entry points. Each workflow loads and validates its inputs, reports progress
//! phase by phase and returns a report describing what was done.
//!
//! ## Architecture
//!
//! - **Chain Workflow** ([`chain`]) - Runs a fixed number of MD segments, each restarting
//!   from the state the previous one wrote, with resume and retry support.
//! - **Coupling Workflow** ([`coupling`]) - Runs the two CDFT diabatic states and the mixed
//!   coupling job for a range of molecules and writes a CSV summary.
//! - **Prepare Workflow** ([`prepare`]) - Relabels a packed PDB system against a mol2
//!   oligomer template.

pub mod chain;
pub mod coupling;
pub mod prepare;
