use crate::core::cdft::input::{CdftInputParams, CdftTemplate, StateRestart, load_template};
use crate::core::cdft::output::{ConstraintStrength, extract_strength, output_is_finished, read_text};
use crate::engine::cancel::CancellationToken;
use crate::engine::config::{CouplingConfig, StateSpec};
use crate::engine::error::EngineError;
use crate::engine::process::{EngineRunner, ProcessError};
use crate::engine::progress::{Progress, ProgressReporter};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{error, info, instrument, warn};

const COUPLING_SUFFIX: &str = "AB_coupling";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    StateA,
    StateB,
    Coupling,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::StateA => "state A",
            Stage::StateB => "state B",
            Stage::Coupling => "coupling",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoleculeStatus {
    Completed,
    Failed { stage: Stage, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeReport {
    pub molecule: usize,
    pub atom_offset: i64,
    pub strength_a: Option<ConstraintStrength>,
    pub strength_b: Option<ConstraintStrength>,
    pub status: MoleculeStatus,
    /// Jobs actually run; jobs with an already finished output are skipped.
    pub jobs_run: usize,
}

impl MoleculeReport {
    pub fn is_completed(&self) -> bool {
        self.status == MoleculeStatus::Completed
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CouplingReport {
    pub molecules: Vec<MoleculeReport>,
    /// The molecule at which cancellation was observed, if any.
    pub cancelled_at: Option<usize>,
}

impl CouplingReport {
    pub fn completed(&self) -> usize {
        self.molecules.iter().filter(|m| m.is_completed()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &MoleculeReport> {
        self.molecules.iter().filter(|m| !m.is_completed())
    }
}

/// Names of the files belonging to one CP2K job, relative to the work directory.
struct JobFiles {
    project: String,
}

impl JobFiles {
    fn new(molecule: usize, suffix: &str) -> Self {
        Self {
            project: format!("mol{}_{}", molecule, suffix),
        }
    }

    fn input(&self) -> String {
        format!("{}.inp", self.project)
    }

    fn output(&self) -> String {
        format!("{}.out", self.project)
    }

    fn restart(&self) -> String {
        format!("{}-RESTART.wfn", self.project)
    }
}

enum JobOutcome {
    Finished { ran: bool },
    Failed(String),
}

struct Templates {
    state_a: CdftTemplate,
    state_b: CdftTemplate,
    coupling: CdftTemplate,
}

struct Context<'a, R: EngineRunner> {
    config: &'a CouplingConfig,
    templates: Templates,
    runner: &'a R,
    cancel: &'a CancellationToken,
}

/// Runs state A, state B and the coupling job for every configured molecule.
///
/// A molecule whose job fails, or whose outputs lack a strength or a restart file, is recorded
/// as failed and the workflow moves on. Failing to launch the engine at all, losing track of
/// it, and cancellation stop the whole run.
#[instrument(skip_all, name = "coupling_workflow")]
pub fn run(
    config: &CouplingConfig,
    runner: &impl EngineRunner,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<CouplingReport, EngineError> {
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let templates = Templates {
        state_a: load_template(&config.state_a.template)?,
        state_b: load_template(&config.state_b.template)?,
        coupling: load_template(&config.coupling_template)?,
    };
    fs::create_dir_all(&config.work_dir).map_err(|e| EngineError::io(&config.work_dir, e))?;
    reporter.report(Progress::PhaseFinish);

    let ctx = Context {
        config,
        templates,
        runner,
        cancel,
    };

    // === Phase 1: Per-molecule jobs ===
    reporter.report(Progress::PhaseStart {
        name: "Coupling Calculations",
    });
    reporter.report(Progress::TaskStart {
        total: config.molecules().count() as u64,
    });

    let mut report = CouplingReport::default();
    for molecule in config.molecules() {
        if cancel.is_cancelled() {
            report.cancelled_at = Some(molecule);
            break;
        }
        reporter.status(format!("Molecule {}", molecule));

        match process_molecule(&ctx, molecule) {
            Ok(result) => {
                match &result.status {
                    MoleculeStatus::Completed => info!(molecule, "Molecule finished."),
                    MoleculeStatus::Failed { stage, reason } => {
                        warn!(molecule, %stage, %reason, "Molecule failed; continuing with the next one.")
                    }
                }
                report.molecules.push(result);
            }
            Err(EngineError::Cancelled { .. }) => {
                report.cancelled_at = Some(molecule);
                break;
            }
            Err(e) => {
                error!(molecule, error = %e, "Aborting coupling workflow.");
                if let Err(summary_error) =
                    write_summary(&config.summary_path, config, &report.molecules)
                {
                    warn!(error = %summary_error, "Failed to write the partial summary.");
                }
                return Err(e);
            }
        }
        reporter.report(Progress::TaskIncrement { amount: 1 });
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    write_summary(&config.summary_path, config, &report.molecules)?;
    info!(
        completed = report.completed(),
        total = report.molecules.len(),
        summary = %config.summary_path.display(),
        "Coupling workflow finished."
    );
    Ok(report)
}

fn process_molecule<R: EngineRunner>(
    ctx: &Context<'_, R>,
    molecule: usize,
) -> Result<MoleculeReport, EngineError> {
    let config = ctx.config;
    let atom_offset = config.atom_offset(molecule);
    let mut report = MoleculeReport {
        molecule,
        atom_offset,
        strength_a: None,
        strength_b: None,
        status: MoleculeStatus::Completed,
        jobs_run: 0,
    };
    let mut failure: Option<(Stage, String)> = None;

    let states = [
        (Stage::StateA, &config.state_a, &ctx.templates.state_a),
        (Stage::StateB, &config.state_b, &ctx.templates.state_b),
    ];
    let mut strengths = Vec::with_capacity(2);
    for (stage, spec, template) in states {
        let strength = run_state(ctx, molecule, atom_offset, spec, template, &mut report)?;
        match strength {
            Ok(strength) => strengths.push(Some(strength)),
            Err(reason) => {
                strengths.push(None);
                if failure.is_none() {
                    failure = Some((stage, reason));
                }
            }
        }
    }
    report.strength_b = strengths.pop().flatten();
    report.strength_a = strengths.pop().flatten();

    if failure.is_none() {
        if let (Some(a), Some(b)) = (&report.strength_a, &report.strength_b) {
            if let Err(reason) = run_coupling(ctx, molecule, atom_offset, (a, b), &mut report.jobs_run)? {
                failure = Some((Stage::Coupling, reason));
            }
        }
    }

    if let Some((stage, reason)) = failure {
        report.status = MoleculeStatus::Failed { stage, reason };
    }
    Ok(report)
}

/// Runs one diabatic state and returns its converged strength, or the reason it has none.
fn run_state<R: EngineRunner>(
    ctx: &Context<'_, R>,
    molecule: usize,
    atom_offset: i64,
    spec: &StateSpec,
    template: &CdftTemplate,
    report: &mut MoleculeReport,
) -> Result<Result<ConstraintStrength, String>, EngineError> {
    let files = JobFiles::new(molecule, &spec.label);
    let params = CdftInputParams {
        project: &files.project,
        coord_file: ctx.config.coord_file.as_deref(),
        atom_offset,
        ..Default::default()
    };
    match run_job(ctx, molecule, &files, template, &params)? {
        JobOutcome::Finished { ran } => report.jobs_run += usize::from(ran),
        JobOutcome::Failed(reason) => return Ok(Err(reason)),
    }

    let output = ctx.config.work_dir.join(files.output());
    let content = read_text(&output)?;
    Ok(extract_strength(&content).ok_or_else(|| {
        format!(
            "no 'Strength of constraint' line in {}",
            output.display()
        )
    }))
}

fn run_coupling<R: EngineRunner>(
    ctx: &Context<'_, R>,
    molecule: usize,
    atom_offset: i64,
    strengths: (&ConstraintStrength, &ConstraintStrength),
    jobs_run: &mut usize,
) -> Result<Result<(), String>, EngineError> {
    let config = ctx.config;
    let restarts: Vec<StateRestart> = [&config.state_a, &config.state_b]
        .into_iter()
        .map(|spec| StateRestart {
            label: spec.label.clone(),
            wfn_file: JobFiles::new(molecule, &spec.label).restart(),
        })
        .collect();

    let missing: Vec<&str> = restarts
        .iter()
        .filter(|r| !config.work_dir.join(&r.wfn_file).is_file())
        .map(|r| r.wfn_file.as_str())
        .collect();
    if !missing.is_empty() {
        return Ok(Err(format!(
            "restart wavefunction missing: {}",
            missing.join(", ")
        )));
    }

    let files = JobFiles::new(molecule, COUPLING_SUFFIX);
    let params = CdftInputParams {
        project: &files.project,
        coord_file: config.coord_file.as_deref(),
        atom_offset,
        restarts: &restarts,
        strengths: Some(strengths),
    };
    Ok(match run_job(ctx, molecule, &files, &ctx.templates.coupling, &params)? {
        JobOutcome::Finished { ran } => {
            *jobs_run += usize::from(ran);
            Ok(())
        }
        JobOutcome::Failed(reason) => Err(reason),
    })
}

/// Renders and runs one CP2K job unless its output already shows a completed run.
fn run_job<R: EngineRunner>(
    ctx: &Context<'_, R>,
    molecule: usize,
    files: &JobFiles,
    template: &CdftTemplate,
    params: &CdftInputParams<'_>,
) -> Result<JobOutcome, EngineError> {
    let work_dir = &ctx.config.work_dir;
    let output = work_dir.join(files.output());
    if output_is_finished(&output)? {
        info!(project = %files.project, "Output already finished; skipping.");
        return Ok(JobOutcome::Finished { ran: false });
    }
    if output.exists() {
        info!(project = %files.project, "Found incomplete output; re-running.");
    }

    let content = match template.render(params) {
        Ok(content) => content,
        Err(e) => return Ok(JobOutcome::Failed(format!("input rendering failed: {}", e))),
    };
    let input = work_dir.join(files.input());
    fs::write(&input, content).map_err(|e| EngineError::io(&input, e))?;

    let invocation = ctx
        .config
        .engine
        .invocation(Path::new(&files.input()))
        .in_dir(work_dir)
        .capture_to(&output);
    info!(project = %files.project, command = %invocation.command_line(), "Running CP2K job.");

    let exit = match ctx.runner.run(&invocation, ctx.cancel) {
        Ok(exit) => exit,
        Err(ProcessError::Timeout(limit)) => {
            return Ok(JobOutcome::Failed(format!(
                "{} exceeded the time limit of {:?}",
                files.project, limit
            )));
        }
        Err(e) => return Err(EngineError::from_process(molecule, e)),
    };
    if !exit.success {
        return Ok(JobOutcome::Failed(format!(
            "{} exited with code {}",
            files.project,
            exit.code.map_or_else(|| "none".to_string(), |c| c.to_string())
        )));
    }
    if !output_is_finished(&output)? {
        return Ok(JobOutcome::Failed(format!(
            "{} has no completion footer",
            output.display()
        )));
    }
    Ok(JobOutcome::Finished { ran: true })
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    molecule: usize,
    atom_offset: i64,
    state_a: &'a str,
    strength_a: Option<f64>,
    state_b: &'a str,
    strength_b: Option<f64>,
    status: &'static str,
    failed_stage: Option<Stage>,
    reason: Option<&'a str>,
}

fn write_summary(
    path: &Path,
    config: &CouplingConfig,
    molecules: &[MoleculeReport],
) -> Result<(), EngineError> {
    let summary_err = |source: csv::Error| EngineError::Summary {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(summary_err)?;
    for m in molecules {
        let (status, failed_stage, reason) = match &m.status {
            MoleculeStatus::Completed => ("completed", None, None),
            MoleculeStatus::Failed { stage, reason } => ("failed", Some(*stage), Some(reason.as_str())),
        };
        writer
            .serialize(SummaryRow {
                molecule: m.molecule,
                atom_offset: m.atom_offset,
                state_a: &config.state_a.label,
                strength_a: m.strength_a.as_ref().map(ConstraintStrength::value),
                state_b: &config.state_b.label,
                strength_b: m.strength_b.as_ref().map(ConstraintStrength::value),
                status,
                failed_stage,
                reason,
            })
            .map_err(summary_err)?;
    }
    writer
        .flush()
        .map_err(|e| summary_err(csv::Error::from(e)))?;
    Ok(())
}
