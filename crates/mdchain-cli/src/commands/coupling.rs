use super::spawn_interrupt_listener;
use crate::cli::CouplingArgs;
use crate::config::PartialCouplingConfig;
use crate::error::{CliError, Result};
use crate::ui::{CliProgressHandler, UiEvent};
use mdchain::engine::cancel::CancellationToken;
use mdchain::engine::process::ProcessRunner;
use mdchain::engine::progress::ProgressReporter;
use mdchain::workflows::{self, coupling::MoleculeStatus};
use tokio::sync::mpsc;
use tracing::info;

pub async fn run(args: CouplingArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    let partial_config = PartialCouplingConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    let cancel = CancellationToken::new();
    let interrupt_listener = spawn_interrupt_listener(cancel.clone());

    let runner = ProcessRunner::new(config.timeout);
    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Running CDFT coupling for molecules {}..={} ({} / {})",
        config.first_molecule, config.last_molecule, config.state_a.label, config.state_b.label
    );

    let result = tokio::task::block_in_place(|| {
        workflows::coupling::run(&config, &runner, &reporter, &cancel)
    });
    interrupt_listener.abort();
    let report = result?;

    for molecule in &report.molecules {
        match &molecule.status {
            MoleculeStatus::Completed => println!(
                "  mol{}: {} = {}, {} = {}",
                molecule.molecule,
                config.state_a.label,
                molecule
                    .strength_a
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string),
                config.state_b.label,
                molecule
                    .strength_b
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string),
            ),
            MoleculeStatus::Failed { stage, reason } => {
                println!("  mol{}: failed at {} ({})", molecule.molecule, stage, reason)
            }
        }
    }
    println!("Summary written to {}", config.summary_path.display());

    if let Some(molecule) = report.cancelled_at {
        return Err(CliError::Interrupted {
            context: format!("molecule {}", molecule),
        });
    }
    let failed = report.failed().count();
    if failed > 0 {
        return Err(CliError::MoleculesFailed {
            failed,
            total: report.molecules.len(),
            summary: config.summary_path.clone(),
        });
    }
    println!("✓ All {} molecule(s) completed.", report.completed());
    Ok(())
}
