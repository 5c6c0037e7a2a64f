use crate::core::io::mol2::Mol2File;
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::StructureFile;
use crate::core::structure::{Composition, StructureError, detect_composition, relabel};
use crate::engine::config::PrepareConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PrepareReport {
    pub composition: Composition,
    /// False when the configured fallback counts were used.
    pub detected: bool,
    pub residues: usize,
    pub discarded_atoms: usize,
    pub unused_atoms: usize,
    pub output: PathBuf,
    /// Written only when at least one complete oligomer was found.
    pub extract: Option<PathBuf>,
}

/// Relabels a packed PDB system against a mol2 oligomer template.
#[instrument(skip_all, name = "prepare_workflow")]
pub fn run(config: &PrepareConfig, reporter: &ProgressReporter) -> Result<PrepareReport, EngineError> {
    // === Phase 1: Read inputs ===
    reporter.report(Progress::PhaseStart {
        name: "Reading Structures",
    });
    let template = Mol2File::read_from_path(&config.mol2_template).map_err(|source| {
        EngineError::Mol2 {
            path: config.mol2_template.clone(),
            source,
        }
    })?;
    let structure = PdbFile::read_from_path(&config.input_pdb).map_err(|source| {
        EngineError::Pdb {
            path: config.input_pdb.clone(),
            source,
        }
    })?;
    info!(
        template_atoms = template.len(),
        system_atoms = structure.atoms.len(),
        "Structures loaded."
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Composition ===
    reporter.report(Progress::PhaseStart {
        name: "Detecting Composition",
    });
    let detected = detect_composition(&structure.atoms, template.len());
    let (composition, was_detected) = if !detected.is_empty() {
        (detected, true)
    } else if let Some(fallback) = config.fallback {
        warn!(?fallback, "Automatic detection found nothing; using configured counts.");
        (fallback, false)
    } else {
        return Err(StructureError::NothingDetected.into());
    };
    reporter.message(format!(
        "{} oligomers, {} ions, {} waters",
        composition.oligomers, composition.ions, composition.waters
    ));
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Relabel and write ===
    reporter.report(Progress::PhaseStart {
        name: "Writing Structures",
    });
    let relabeled = relabel(&structure.atoms, &template, &composition, &config.options)?;
    PdbFile::write_residues_to_path(&structure.header_lines, &relabeled.residues, &config.output_pdb)
        .map_err(|source| EngineError::Pdb {
            path: config.output_pdb.clone(),
            source,
        })?;

    let extract = if relabeled.first_oligomer.is_empty() {
        warn!("No complete oligomer found; skipping extraction.");
        None
    } else {
        PdbFile::write_fragment_to_path(&relabeled.first_oligomer, &config.extract_path).map_err(
            |source| EngineError::Pdb {
                path: config.extract_path.clone(),
                source,
            },
        )?;
        Some(config.extract_path.clone())
    };
    reporter.report(Progress::PhaseFinish);

    info!(
        residues = relabeled.residues.len(),
        output = %config.output_pdb.display(),
        "Structure preparation finished."
    );
    Ok(PrepareReport {
        composition,
        detected: was_detected,
        residues: relabeled.residues.len(),
        discarded_atoms: relabeled.discarded_atoms,
        unused_atoms: relabeled.unused_atoms,
        output: config.output_pdb.clone(),
        extract,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::PrepareConfigBuilder;
    use crate::engine::error::FailureKind;
    use std::fs;
    use std::path::Path;

    const TEMPLATE: &str = "\
@<TRIPOS>MOLECULE
center1
    3     2     1     0     0
SMALL
bcc

@<TRIPOS>ATOM
      1 C1          -1.2070    0.7250    0.0000 cc         1 MOL      -0.1200
      2 S1           0.0000    1.5320    0.0000 ss         1 MOL      -0.0800
      3 H1          -2.1000    1.2000    0.0000 h4         1 MOL       0.1500
@<TRIPOS>BOND
     1     1     2 ar
";

    fn pdb_line(serial: usize, name: &str, residue: &str, x: f64, element: &str) -> String {
        format!(
            "ATOM  {:5} {:<4} {:<3}  {:4}    {:8.3}{:8.3}{:8.3}  1.00  0.00          {:>2}",
            serial, name, residue, 1, x, 0.0, 0.0, element
        )
    }

    fn packed_pdb(atoms: &[(&str, &str, &str)]) -> String {
        let mut lines = vec!["CRYST1   40.000   40.000   40.000  90.00  90.00  90.00 P 1           1".to_string()];
        for (i, (name, residue, element)) in atoms.iter().enumerate() {
            lines.push(pdb_line(i + 1, name, residue, i as f64, element));
        }
        lines.push("END".to_string());
        lines.join("\n") + "\n"
    }

    const SYSTEM: &[(&str, &str, &str)] = &[
        ("C1", "UNL", "C"),
        ("S1", "UNL", "S"),
        ("H1", "UNL", "H"),
        ("C1", "UNL", "C"),
        ("S1", "UNL", "S"),
        ("H1", "UNL", "H"),
        ("CL", "CL", "CL"),
        ("O", "HOH", "O"),
        ("H1", "HOH", "H"),
        ("H2", "HOH", "H"),
    ];

    fn config_for(dir: &Path, system: &str) -> PrepareConfigBuilder {
        fs::write(dir.join("center1.mol2"), TEMPLATE).unwrap();
        fs::write(dir.join("system.pdb"), system).unwrap();
        PrepareConfigBuilder::new()
            .input_pdb(dir.join("system.pdb"))
            .output_pdb(dir.join("system_processed.pdb"))
            .mol2_template(dir.join("center1.mol2"))
    }

    #[test]
    fn relabels_detected_system_and_extracts_first_oligomer() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path(), &packed_pdb(SYSTEM)).build().unwrap();

        let report = run(&config, &ProgressReporter::new()).unwrap();
        assert!(report.detected);
        assert_eq!(report.composition, Composition::new(2, 1, 1));
        assert_eq!(report.residues, 4);
        assert_eq!(report.extract, Some(dir.path().join("extracted_oligomer.pdb")));

        let output = fs::read_to_string(&config.output_pdb).unwrap();
        assert!(output.starts_with("CRYST1"));
        assert_eq!(output.matches("TER").count(), 4);
        assert!(output.contains(" MOL "));
        assert!(output.contains("Cl- "));
        assert!(output.contains("WAT "));
        assert!(output.trim_end().ends_with("END"));

        let extract = fs::read_to_string(dir.path().join("extracted_oligomer.pdb")).unwrap();
        assert_eq!(extract.lines().count(), 3);
    }

    #[test]
    fn fallback_counts_are_used_when_nothing_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let tiny = packed_pdb(&[("O", "HOH", "O"), ("H1", "HOH", "H")]);

        let without = config_for(dir.path(), &tiny).build().unwrap();
        let err = run(&without, &ProgressReporter::new()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Structure);

        let with = config_for(dir.path(), &tiny)
            .fallback(Some(Composition::new(0, 0, 1)))
            .build()
            .unwrap();
        let report = run(&with, &ProgressReporter::new()).unwrap();
        assert!(!report.detected);
        assert_eq!(report.residues, 0);
        assert_eq!(report.discarded_atoms, 2);
        assert_eq!(report.extract, None);
    }

    #[test]
    fn element_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut system = SYSTEM.to_vec();
        system[4] = ("S1", "UNL", "N");
        let config = config_for(dir.path(), &packed_pdb(&system)).build().unwrap();

        let err = run(&config, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Structure(StructureError::ElementMismatch { .. })
        ));
    }

    #[test]
    fn missing_template_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = PrepareConfigBuilder::new()
            .input_pdb(dir.path().join("system.pdb"))
            .output_pdb(dir.path().join("out.pdb"))
            .mol2_template(dir.path().join("missing.mol2"))
            .build()
            .unwrap();
        let err = run(&config, &ProgressReporter::new()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Mol2);
        assert!(err.to_string().contains("missing.mol2"));
    }
}
