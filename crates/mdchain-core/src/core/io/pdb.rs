use super::traits::StructureFile;
use crate::core::utils::elements::{element_from_atom_name, normalize_symbol};
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

const HEADER_RECORDS: [&str; 6] = ["CRYST1", "REMARK", "COMPND", "HEADER", "TITLE", "AUTHOR"];

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: &'static str, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: &'static str },
}

/// One `ATOM`/`HETATM` record as read from the input.
#[derive(Debug, Clone, PartialEq)]
pub struct PdbAtom {
    /// 1-based position of the record among the atom records of the file.
    pub record: usize,
    pub name: String,
    pub residue_name: String,
    pub position: Point3<f64>,
    /// Symbol from the element column, or guessed from the atom name when that is blank.
    pub element: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbStructure {
    pub header_lines: Vec<String>,
    pub atoms: Vec<PdbAtom>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResidueAtom {
    pub serial: usize,
    pub name: String,
    pub position: Point3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdbResidue {
    pub name: String,
    pub number: usize,
    pub atoms: Vec<ResidueAtom>,
}

/// An atom of a standalone fragment written for parameterization tools.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentAtom {
    pub element: String,
    pub position: Point3<f64>,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn parse_coordinate(
    line: &str,
    line_num: usize,
    start: usize,
    end: usize,
    columns: &'static str,
) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns,
            value: value.to_string(),
        },
    })
}

pub struct PdbFile;

impl StructureFile for PdbFile {
    type Output = PdbStructure;
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error> {
        let mut structure = PdbStructure::default();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            if line.starts_with("ATOM") || line.starts_with("HETATM") {
                let name = slice_and_trim(&line, 12, 16);
                if name.is_empty() {
                    return Err(PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::MissingRequiredField { columns: "13-16" },
                    });
                }
                let x = parse_coordinate(&line, line_num, 30, 38, "31-38")?;
                let y = parse_coordinate(&line, line_num, 38, 46, "39-46")?;
                let z = parse_coordinate(&line, line_num, 46, 54, "47-54")?;
                let element = normalize_symbol(slice_and_trim(&line, 76, 78))
                    .or_else(|| element_from_atom_name(name));

                structure.atoms.push(PdbAtom {
                    record: structure.atoms.len() + 1,
                    name: name.to_string(),
                    residue_name: slice_and_trim(&line, 17, 20).to_string(),
                    position: Point3::new(x, y, z),
                    element,
                });
            } else if HEADER_RECORDS.iter().any(|r| line.starts_with(r)) {
                structure.header_lines.push(line);
            }
        }

        Ok(structure)
    }
}

impl PdbFile {
    /// Writes header records, then each residue followed by `TER`, then `END`.
    pub fn write_residues(
        header_lines: &[String],
        residues: &[PdbResidue],
        writer: &mut impl Write,
    ) -> Result<(), PdbError> {
        for header in header_lines {
            writeln!(writer, "{}", header)?;
        }
        for residue in residues {
            for atom in &residue.atoms {
                writeln!(
                    writer,
                    "ATOM  {:5} {:^4} {:<3} {:4}    {:8.3}{:8.3}{:8.3}  1.00  0.00",
                    atom.serial,
                    atom.name,
                    residue.name,
                    residue.number,
                    atom.position.x,
                    atom.position.y,
                    atom.position.z
                )?;
            }
            writeln!(writer, "TER")?;
        }
        writeln!(writer, "END")?;
        Ok(())
    }

    /// Writes a single-residue `MOL` fragment named by element, numbered from 1.
    pub fn write_fragment(atoms: &[FragmentAtom], writer: &mut impl Write) -> Result<(), PdbError> {
        for (i, atom) in atoms.iter().enumerate() {
            writeln!(
                writer,
                "ATOM  {:5} {:^4} MOL     1    {:8.3}{:8.3}{:8.3}  1.00  0.00",
                i + 1,
                atom.element,
                atom.position.x,
                atom.position.y,
                atom.position.z
            )?;
        }
        Ok(())
    }

    pub fn write_residues_to_path<P: AsRef<Path>>(
        header_lines: &[String],
        residues: &[PdbResidue],
        path: P,
    ) -> Result<(), PdbError> {
        let mut writer = BufWriter::new(File::create(path)?);
        Self::write_residues(header_lines, residues, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_fragment_to_path<P: AsRef<Path>>(
        atoms: &[FragmentAtom],
        path: P,
    ) -> Result<(), PdbError> {
        let mut writer = BufWriter::new(File::create(path)?);
        Self::write_fragment(atoms, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SOLVATED: &str = "\
CRYST1   40.000   40.000   40.000  90.00  90.00  90.00 P 1           1
REMARK   generated by packmol
ATOM      1  C1  UNL     1       1.000   2.000   3.000  1.00  0.00           C
ATOM      2  CL1 UNL     1       1.500   2.500   3.500  1.00  0.00
HETATM    3 CL-  CL-     2      10.000  10.000  10.000  1.00  0.00          CL
ATOM      4  O   WAT     3      20.000  20.000  20.000  1.00  0.00           O
CONECT    1    2
";

    #[test]
    fn reads_atoms_headers_and_elements() {
        let structure = PdbFile::read_from(&mut Cursor::new(SOLVATED)).unwrap();

        assert_eq!(structure.header_lines.len(), 2);
        assert!(structure.header_lines[0].starts_with("CRYST1"));
        assert_eq!(structure.atoms.len(), 4);

        let first = &structure.atoms[0];
        assert_eq!(first.record, 1);
        assert_eq!(first.name, "C1");
        assert_eq!(first.residue_name, "UNL");
        assert_eq!(first.position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(first.element.as_deref(), Some("C"));

        assert_eq!(structure.atoms[1].element.as_deref(), Some("Cl"));
        assert_eq!(structure.atoms[2].element.as_deref(), Some("Cl"));
        assert_eq!(structure.atoms[2].residue_name, "CL-");
    }

    #[test]
    fn invalid_coordinate_reports_line_and_columns() {
        let input = "ATOM      1  C1  UNL     1       1.000   abc     3.000\n";
        match PdbFile::read_from(&mut Cursor::new(input)) {
            Err(PdbError::Parse {
                line,
                kind: PdbParseErrorKind::InvalidFloat { columns, .. },
            }) => {
                assert_eq!(line, 1);
                assert_eq!(columns, "39-46");
            }
            other => panic!("Expected InvalidFloat, got {:?}", other),
        }
    }

    #[test]
    fn residues_are_written_in_fixed_columns_with_ter_and_end() {
        let residues = vec![PdbResidue {
            name: "WAT".into(),
            number: 7,
            atoms: vec![ResidueAtom {
                serial: 12,
                name: "H1".into(),
                position: Point3::new(1.0, -2.5, 30.125),
            }],
        }];
        let mut out = Vec::new();
        PdbFile::write_residues(&["CRYST1 box".to_string()], &residues, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "CRYST1 box\n\
             ATOM     12  H1  WAT    7       1.000  -2.500  30.125  1.00  0.00\n\
             TER\n\
             END\n"
        );
    }

    #[test]
    fn fragment_atoms_are_named_by_element_and_renumbered() {
        let atoms = vec![
            FragmentAtom {
                element: "C".into(),
                position: Point3::new(0.0, 0.0, 0.0),
            },
            FragmentAtom {
                element: "Cl".into(),
                position: Point3::new(1.0, 1.0, 1.0),
            },
        ];
        let mut out = Vec::new();
        PdbFile::write_fragment(&atoms, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "ATOM      2  Cl  MOL     1       1.000   1.000   1.000  1.00  0.00"
        );
    }
}
