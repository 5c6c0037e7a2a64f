use super::detection::{Composition, WATER_ELEMENTS};
use crate::core::io::mol2::Mol2Atom;
use crate::core::io::pdb::{FragmentAtom, PdbAtom, PdbResidue, ResidueAtom};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoleculeKind {
    Oligomer,
    Ion,
    Water,
}

impl fmt::Display for MoleculeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MoleculeKind::Oligomer => "oligomer",
            MoleculeKind::Ion => "ion",
            MoleculeKind::Water => "water",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructureError {
    #[error("The mol2 template contains no atoms")]
    EmptyTemplate,
    #[error(
        "Atom mismatch ({molecule}) at atom record {record}: expected {expected_name} ({expected}), found {found}"
    )]
    ElementMismatch {
        molecule: MoleculeKind,
        record: usize,
        expected_name: String,
        expected: String,
        found: String,
    },
    #[error("No oligomers, ions or waters were detected and no fallback composition was given")]
    NothingDetected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IonSpec {
    pub residue_name: String,
    pub atom_name: String,
    pub element: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaterSpec {
    pub residue_name: String,
    pub atom_names: [String; 3],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelabelOptions {
    pub oligomer_residue: String,
    pub ion: IonSpec,
    pub water: WaterSpec,
}

impl Default for RelabelOptions {
    fn default() -> Self {
        Self {
            oligomer_residue: "MOL".to_string(),
            ion: IonSpec {
                residue_name: "Cl-".to_string(),
                atom_name: "Cl-".to_string(),
                element: "Cl".to_string(),
            },
            water: WaterSpec {
                residue_name: "WAT".to_string(),
                atom_names: ["O".to_string(), "H1".to_string(), "H2".to_string()],
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelabeledStructure {
    pub residues: Vec<PdbResidue>,
    /// The first complete oligomer, for building force-field parameters.
    pub first_oligomer: Vec<FragmentAtom>,
    /// Atoms of an incomplete trailing residue that were dropped.
    pub discarded_atoms: usize,
    /// Atoms beyond the described composition, left out of the output.
    pub unused_atoms: usize,
}

/// Renames every atom of a packed system according to `composition`.
///
/// Oligomer atoms take their names from the mol2 template, ions and waters take the names
/// in `options`. Each input atom's element must equal the expected element. Residues are
/// renumbered from 1 and serials run over the kept atoms.
///
/// # Errors
///
/// Returns [`StructureError::ElementMismatch`] at the first atom whose element disagrees,
/// which usually means an atom is missing from an earlier molecule.
pub fn relabel(
    atoms: &[PdbAtom],
    template: &[Mol2Atom],
    composition: &Composition,
    options: &RelabelOptions,
) -> Result<RelabeledStructure, StructureError> {
    if template.is_empty() {
        return Err(StructureError::EmptyTemplate);
    }

    let oligomer: Vec<(&str, &str)> = template
        .iter()
        .map(|a| (a.name.as_str(), a.element.as_str()))
        .collect();
    let ion = vec![(options.ion.atom_name.as_str(), options.ion.element.as_str())];
    let water: Vec<(&str, &str)> = options
        .water
        .atom_names
        .iter()
        .map(String::as_str)
        .zip(WATER_ELEMENTS)
        .collect();

    let blocks = [
        (
            MoleculeKind::Oligomer,
            composition.oligomers,
            options.oligomer_residue.as_str(),
            &oligomer,
        ),
        (
            MoleculeKind::Ion,
            composition.ions,
            options.ion.residue_name.as_str(),
            &ion,
        ),
        (
            MoleculeKind::Water,
            composition.waters,
            options.water.residue_name.as_str(),
            &water,
        ),
    ];

    let mut result = RelabeledStructure::default();
    let mut cursor = 0;
    let mut serial = 0;

    'blocks: for (kind, count, residue_name, pattern) in blocks {
        for _ in 0..count {
            let remaining = atoms.len() - cursor;
            if remaining == 0 {
                warn!(%kind, "Structure ended before the described composition was complete.");
                break 'blocks;
            }
            let take = pattern.len().min(remaining);
            let chunk = &atoms[cursor..cursor + take];
            check_elements(kind, chunk, pattern)?;
            cursor += take;

            if take < pattern.len() {
                warn!(
                    %kind,
                    atoms = take,
                    "Incomplete trailing residue found at end of structure; discarding."
                );
                result.discarded_atoms = take;
                break 'blocks;
            }

            if kind == MoleculeKind::Oligomer && result.first_oligomer.is_empty() {
                result.first_oligomer = chunk
                    .iter()
                    .zip(pattern.iter())
                    .map(|(atom, (_, element))| FragmentAtom {
                        element: element.to_string(),
                        position: atom.position,
                    })
                    .collect();
            }

            let residue_atoms = chunk
                .iter()
                .zip(pattern.iter())
                .map(|(atom, (name, _))| {
                    serial += 1;
                    ResidueAtom {
                        serial,
                        name: name.to_string(),
                        position: atom.position,
                    }
                })
                .collect();
            result.residues.push(PdbResidue {
                name: residue_name.to_string(),
                number: result.residues.len() + 1,
                atoms: residue_atoms,
            });
        }
    }

    result.unused_atoms = atoms.len() - cursor;
    if result.unused_atoms > 0 {
        debug!(
            unused = result.unused_atoms,
            "Atoms beyond the described composition were left out."
        );
    }
    Ok(result)
}

fn check_elements(
    kind: MoleculeKind,
    chunk: &[PdbAtom],
    pattern: &[(&str, &str)],
) -> Result<(), StructureError> {
    for (atom, (name, expected)) in chunk.iter().zip(pattern) {
        if atom.element.as_deref() != Some(*expected) {
            return Err(StructureError::ElementMismatch {
                molecule: kind,
                record: atom.record,
                expected_name: name.to_string(),
                expected: expected.to_string(),
                found: atom.element.clone().unwrap_or_else(|| "?".to_string()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structure::detection::tests::packed_system;

    fn template() -> Vec<Mol2Atom> {
        [("C01", "cc", "C"), ("S01", "ss", "S"), ("H01", "h4", "H")]
            .into_iter()
            .map(|(name, atom_type, element)| Mol2Atom {
                name: name.into(),
                atom_type: atom_type.into(),
                element: element.into(),
            })
            .collect()
    }

    #[test]
    fn relabels_every_block_with_target_names() {
        let atoms = packed_system(2, 1, 2);
        let result = relabel(
            &atoms,
            &template(),
            &Composition::new(2, 1, 2),
            &RelabelOptions::default(),
        )
        .unwrap();

        let names: Vec<&str> = result.residues.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["MOL", "MOL", "Cl-", "WAT", "WAT"]);
        let numbers: Vec<usize> = result.residues.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);

        let first: Vec<&str> = result.residues[0]
            .atoms
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(first, vec!["C01", "S01", "H01"]);
        assert_eq!(result.residues[2].atoms[0].name, "Cl-");
        assert_eq!(result.residues[4].atoms[2].name, "H2");
        assert_eq!(result.residues[4].atoms[2].serial, 13);

        assert_eq!(result.first_oligomer.len(), 3);
        assert_eq!(result.first_oligomer[1].element, "S");
        assert_eq!(result.discarded_atoms, 0);
        assert_eq!(result.unused_atoms, 0);
    }

    #[test]
    fn element_mismatch_names_the_offending_record() {
        let mut atoms = packed_system(2, 0, 0);
        atoms[4].element = Some("O".into());
        let err = relabel(
            &atoms,
            &template(),
            &Composition::new(2, 0, 0),
            &RelabelOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            StructureError::ElementMismatch {
                molecule: MoleculeKind::Oligomer,
                record: 5,
                expected_name: "S01".into(),
                expected: "S".into(),
                found: "O".into(),
            }
        );
    }

    #[test]
    fn incomplete_trailing_water_is_discarded() {
        let mut atoms = packed_system(1, 0, 2);
        atoms.pop();
        let result = relabel(
            &atoms,
            &template(),
            &Composition::new(1, 0, 2),
            &RelabelOptions::default(),
        )
        .unwrap();
        assert_eq!(result.residues.len(), 2);
        assert_eq!(result.discarded_atoms, 2);
    }

    #[test]
    fn atoms_beyond_the_composition_are_counted_as_unused() {
        let atoms = packed_system(2, 0, 1);
        let result = relabel(
            &atoms,
            &template(),
            &Composition::new(1, 0, 0),
            &RelabelOptions::default(),
        )
        .unwrap();
        assert_eq!(result.residues.len(), 1);
        assert_eq!(result.unused_atoms, 6);
    }

    #[test]
    fn empty_template_is_rejected() {
        let result = relabel(
            &packed_system(1, 0, 0),
            &[],
            &Composition::new(1, 0, 0),
            &RelabelOptions::default(),
        );
        assert_eq!(result, Err(StructureError::EmptyTemplate));
    }
}
