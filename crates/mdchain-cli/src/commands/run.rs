use super::spawn_interrupt_listener;
use crate::cli::RunArgs;
use crate::config::PartialRunConfig;
use crate::error::{CliError, Result};
use crate::ui::{CliProgressHandler, UiEvent};
use mdchain::engine::cancel::CancellationToken;
use mdchain::engine::process::ProcessRunner;
use mdchain::engine::progress::ProgressReporter;
use mdchain::engine::state::TerminalOutcome;
use mdchain::workflows;
use tokio::sync::mpsc;
use tracing::info;

pub async fn run(args: RunArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    let partial_config = PartialRunConfig::from_optional_file(args.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    let cancel = CancellationToken::new();
    let interrupt_listener = spawn_interrupt_listener(cancel.clone());

    let runner = ProcessRunner::new(config.timeout);
    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Running {} segment(s) with '{}' in {}",
        config.total_steps,
        config.engine.program,
        config.naming.work_dir().display()
    );
    info!("Invoking the chain workflow...");

    let result = tokio::task::block_in_place(|| {
        workflows::chain::run(&config, &runner, &reporter, &cancel)
    });
    interrupt_listener.abort();
    let report = result?;

    match report.outcome {
        TerminalOutcome::Completed(total) => {
            println!(
                "✓ Chain complete: {} segment(s) run now, {} in total. Final state: {}",
                report.executed.len(),
                total,
                config.naming.state_path(total).display()
            );
            Ok(())
        }
        TerminalOutcome::Failed(iteration, source) => {
            Err(CliError::IterationFailed { iteration, source })
        }
        TerminalOutcome::Cancelled(iteration) => Err(CliError::Interrupted {
            context: format!("iteration {}", iteration),
        }),
    }
}
