//! Analysis of solvated systems assembled from repeated oligomers, counter-ions and water.
//!
//! The input is expected in packing order: every oligomer first, then the ions, then the
//! waters. [`detection`] counts each block and [`relabel`] rewrites atom and residue names
//! so force-field tools recognize them.

pub mod detection;
pub mod relabel;

pub use detection::{Composition, detect_composition};
pub use relabel::{
    IonSpec, MoleculeKind, RelabelOptions, RelabeledStructure, StructureError, WaterSpec, relabel,
};
