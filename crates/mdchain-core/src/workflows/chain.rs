use crate::core::marker::ProgressMarker;
use crate::core::template::Template;
use crate::engine::cancel::CancellationToken;
use crate::engine::config::ChainConfig;
use crate::engine::error::EngineError;
use crate::engine::process::{EngineRunner, Invocation};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::{IterationState, TerminalOutcome};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug)]
pub struct ChainReport {
    pub outcome: TerminalOutcome,
    /// First iteration this invocation was responsible for (non-zero when resuming).
    pub start_iteration: usize,
    /// Iterations that completed during this invocation, in order.
    pub executed: Vec<usize>,
}

/// Runs the iteration chain described by `config`.
///
/// Preparation problems (unreadable or invalid template, missing initial state, a marker that
/// contradicts the naming scheme) are returned as errors before the engine is ever invoked.
/// Once the loop has started, every failure ends the run with a [`TerminalOutcome`] naming
/// the iteration it happened in.
#[instrument(skip_all, name = "chain_workflow")]
pub fn run(
    config: &ChainConfig,
    runner: &impl EngineRunner,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<ChainReport, EngineError> {
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let template = Template::load(&config.template_path)?;
    debug!(placeholders = ?template.placeholders(), "Template loaded.");

    if !config.initial_state.is_file() {
        return Err(EngineError::InputStateMissing {
            iteration: 0,
            path: config.initial_state.clone(),
        });
    }
    let work_dir = config.naming.work_dir();
    fs::create_dir_all(work_dir).map_err(|e| EngineError::io(work_dir, e))?;

    let start = resolve_start(config)?;
    reporter.report(Progress::PhaseFinish);

    let total = config.total_steps;
    let Some(mut state) = start else {
        info!(total, "Progress marker shows the chain already completed; nothing to do.");
        return Ok(ChainReport {
            outcome: TerminalOutcome::Completed(total),
            start_iteration: total,
            executed: Vec::new(),
        });
    };
    let start_iteration = state.index;

    // === Phase 1: Iterate ===
    info!(
        start = start_iteration,
        total, "Starting iteration chain."
    );
    reporter.report(Progress::PhaseStart { name: "Iterating" });
    reporter.report(Progress::TaskStart {
        total: (total - start_iteration) as u64,
    });

    let marker_path = config.naming.marker_path();
    let mut executed = Vec::new();
    let outcome = loop {
        if cancel.is_cancelled() {
            break TerminalOutcome::Cancelled(state.index);
        }
        reporter.status(format!("Iteration {}/{}", state.index + 1, total));

        if let Err(e) = run_iteration(&template, &state, config, runner, cancel) {
            break match e {
                EngineError::Cancelled { iteration } => {
                    warn!(iteration, "Chain cancelled while the engine was running.");
                    TerminalOutcome::Cancelled(iteration)
                }
                e => {
                    error!(iteration = state.index, error = %e, "Iteration failed; stopping chain.");
                    TerminalOutcome::Failed(state.index, e)
                }
            };
        }

        executed.push(state.index);
        let marker = ProgressMarker::new(state.index, state.write_path.clone(), total);
        if let Err(e) = marker.save(&marker_path) {
            error!(iteration = state.index, error = %e, "Failed to record progress; stopping chain.");
            break TerminalOutcome::Failed(state.index, e.into());
        }
        if config.remove_inputs {
            if let Err(e) = fs::remove_file(&state.input_path) {
                warn!(path = %state.input_path.display(), error = %e, "Failed to remove rendered input.");
            }
        }
        reporter.report(Progress::TaskIncrement { amount: 1 });
        info!(iteration = state.index, output = %state.write_path.display(), "Iteration completed.");

        if state.index + 1 >= total {
            break TerminalOutcome::Completed(total);
        }
        state = state.next(&config.naming);
    };

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    Ok(ChainReport {
        outcome,
        start_iteration,
        executed,
    })
}

/// Determines the first iteration to execute, or `None` when the chain is already complete.
fn resolve_start(config: &ChainConfig) -> Result<Option<IterationState>, EngineError> {
    let naming = &config.naming;
    let marker_path = naming.marker_path();

    if !config.resume {
        if ProgressMarker::remove(&marker_path)? {
            info!(path = %marker_path.display(), "Discarded existing progress marker.");
        }
        return Ok(Some(IterationState::new(
            naming,
            0,
            config.initial_state.clone(),
        )));
    }

    let Some(marker) = ProgressMarker::load(&marker_path)? else {
        return Ok(Some(IterationState::new(
            naming,
            0,
            config.initial_state.clone(),
        )));
    };

    let next = marker.next_iteration();
    if next >= config.total_steps {
        return Ok(None);
    }

    let expected = naming.state_path(next);
    if marker.state_artifact != expected {
        return Err(EngineError::ResumeMismatch {
            expected,
            recorded: marker.state_artifact,
        });
    }
    if !expected.is_file() {
        return Err(EngineError::InputStateMissing {
            iteration: next,
            path: expected,
        });
    }

    info!(
        iteration = next,
        state = %expected.display(),
        "Resuming chain from progress marker."
    );
    Ok(Some(IterationState::new(naming, next, expected)))
}

fn run_iteration(
    template: &Template,
    state: &IterationState,
    config: &ChainConfig,
    runner: &impl EngineRunner,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    if !state.read_path.is_file() {
        return Err(EngineError::InputStateMissing {
            iteration: state.index,
            path: state.read_path.clone(),
        });
    }

    let rendered = template.render(&state.bindings())?;
    fs::write(&state.input_path, rendered).map_err(|e| EngineError::io(&state.input_path, e))?;

    let mut invocation = config.engine.invocation(&state.input_path);
    if config.capture_output {
        invocation = invocation.capture_to(&state.screen_path);
    }

    let max_attempts = config.retry.max_attempts();
    let mut attempt = 1;
    loop {
        match execute(state, &invocation, runner, cancel) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_retryable() && attempt < max_attempts && !cancel.is_cancelled() => {
                warn!(
                    iteration = state.index,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Engine attempt failed; retrying."
                );
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn execute(
    state: &IterationState,
    invocation: &Invocation,
    runner: &impl EngineRunner,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    discard_stale(&state.write_path)?;

    let report = runner
        .run(invocation, cancel)
        .map_err(|e| EngineError::from_process(state.index, e))?;
    debug!(iteration = state.index, elapsed = ?report.elapsed, "Engine returned.");

    if !report.success {
        return Err(EngineError::EngineExecution {
            iteration: state.index,
            code: report.code,
        });
    }

    let produced = fs::metadata(&state.write_path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false);
    if !produced {
        return Err(EngineError::OutputArtifactMissing {
            iteration: state.index,
            path: state.write_path.clone(),
        });
    }
    Ok(())
}

fn discard_stale(path: &Path) -> Result<(), EngineError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale output artifact.");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EngineError::io(path, e)),
    }
}
