use crate::core::io::pdb::PdbAtom;
use phf::{Set, phf_set};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

static ION_NAMES: Set<&'static str> = phf_set! {
    "CL-", "CL", "NA", "NA+", "K", "K+", "MG", "MG2+",
};

pub(crate) const WATER_ELEMENTS: [&str; 3] = ["O", "H", "H"];

/// Molecule counts of a packed system, in file order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Composition {
    pub oligomers: usize,
    pub ions: usize,
    pub waters: usize,
}

impl Composition {
    pub fn new(oligomers: usize, ions: usize, waters: usize) -> Self {
        Self {
            oligomers,
            ions,
            waters,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.oligomers == 0 && self.ions == 0 && self.waters == 0
    }

    pub fn atom_count(&self, atoms_per_oligomer: usize) -> usize {
        self.oligomers * atoms_per_oligomer + self.ions + self.waters * WATER_ELEMENTS.len()
    }
}

/// Counts oligomers, ions and waters by scanning the atom list front to back.
///
/// Oligomers are consecutive repeats of the first `atoms_per_oligomer` atom names. Ions are
/// single atoms whose residue or atom name is a known ion. Waters are consecutive `O, H, H`
/// element triples. Each scan stops at the first atom that does not fit its pattern.
pub fn detect_composition(atoms: &[PdbAtom], atoms_per_oligomer: usize) -> Composition {
    if atoms_per_oligomer == 0 || atoms.len() < atoms_per_oligomer {
        warn!(
            total_atoms = atoms.len(),
            atoms_per_oligomer, "Structure is smaller than one oligomer; nothing detected."
        );
        return Composition::default();
    }

    let pattern: Vec<&str> = atoms[..atoms_per_oligomer]
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    let oligomers = atoms
        .chunks_exact(atoms_per_oligomer)
        .take_while(|chunk| chunk.iter().map(|a| a.name.as_str()).eq(pattern.iter().copied()))
        .count();
    let mut cursor = oligomers * atoms_per_oligomer;

    let ions = atoms[cursor..]
        .iter()
        .take_while(|a| is_ion(a))
        .count();
    cursor += ions;

    let waters = atoms[cursor..]
        .chunks_exact(WATER_ELEMENTS.len())
        .take_while(|chunk| {
            chunk
                .iter()
                .zip(WATER_ELEMENTS)
                .all(|(a, expected)| a.element.as_deref() == Some(expected))
        })
        .count();

    let composition = Composition::new(oligomers, ions, waters);
    debug!(?composition, "Detected system composition.");
    composition
}

fn is_ion(atom: &PdbAtom) -> bool {
    ION_NAMES.contains(atom.residue_name.to_ascii_uppercase().as_str())
        || ION_NAMES.contains(atom.name.to_ascii_uppercase().as_str())
}
