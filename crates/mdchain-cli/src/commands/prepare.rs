use crate::cli::PrepareArgs;
use crate::config::PartialPrepareConfig;
use crate::error::Result;
use crate::ui::{CliProgressHandler, UiEvent};
use mdchain::engine::progress::ProgressReporter;
use mdchain::workflows;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn run(args: PrepareArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    let partial_config = PartialPrepareConfig::from_optional_file(args.config.as_deref())?;
    let config = partial_config.merge_with_cli(&args)?;

    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the structure preparation workflow...");
    let report = tokio::task::block_in_place(|| workflows::prepare::run(&config, &reporter))?;

    if !report.detected {
        warn!("Composition was taken from the configured fallback counts.");
    }
    println!(
        "✓ {} residue(s) written to {} ({} oligomers, {} ions, {} waters)",
        report.residues,
        report.output.display(),
        report.composition.oligomers,
        report.composition.ions,
        report.composition.waters
    );
    if report.discarded_atoms > 0 {
        println!(
            "  Discarded {} atom(s) of an incomplete trailing residue.",
            report.discarded_atoms
        );
    }
    if report.unused_atoms > 0 {
        println!(
            "  Left out {} atom(s) beyond the described composition.",
            report.unused_atoms
        );
    }
    if let Some(extract) = &report.extract {
        println!("  First oligomer extracted to {}", extract.display());
    }
    Ok(())
}
