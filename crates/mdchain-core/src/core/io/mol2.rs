use super::traits::StructureFile;
use crate::core::utils::elements::element_from_atom_type;
use std::io::{self, BufRead};
use thiserror::Error;

const ATOM_SECTION: &str = "@<TRIPOS>ATOM";
const SECTION_PREFIX: &str = "@<TRIPOS>";

#[derive(Debug, Error)]
pub enum Mol2Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Line {line}: cannot derive an element from atom type '{atom_type}'")]
    UnknownAtomType { line: usize, atom_type: String },
    #[error("Missing required record: {0}")]
    MissingRecord(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mol2Atom {
    pub name: String,
    pub atom_type: String,
    pub element: String,
}

/// Reader for the atom table of a Tripos mol2 file.
///
/// Only the `@<TRIPOS>ATOM` section is consumed; reading stops at the next section header.
/// Rows with fewer than six columns are skipped.
pub struct Mol2File;

impl StructureFile for Mol2File {
    type Output = Vec<Mol2Atom>;
    type Error = Mol2Error;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error> {
        let mut atoms = Vec::new();
        let mut in_atoms = false;
        let mut seen_section = false;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            if line.starts_with(ATOM_SECTION) {
                in_atoms = true;
                seen_section = true;
                continue;
            }
            if line.starts_with(SECTION_PREFIX) {
                if in_atoms {
                    break;
                }
                continue;
            }
            if !in_atoms {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 {
                continue;
            }
            let element =
                element_from_atom_type(parts[5]).ok_or_else(|| Mol2Error::UnknownAtomType {
                    line: line_num,
                    atom_type: parts[5].to_string(),
                })?;
            atoms.push(Mol2Atom {
                name: parts[1].to_string(),
                atom_type: parts[5].to_string(),
                element,
            });
        }

        if !seen_section {
            return Err(Mol2Error::MissingRecord(ATOM_SECTION));
        }
        Ok(atoms)
    }
}
