//! Readers and writers for the structure formats used during system preparation.

pub mod mol2;
pub mod pdb;
pub mod traits;
