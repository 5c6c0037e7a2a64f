use crate::error::{CliError, Result};
use crate::ui::UiEvent;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tokio::sync::mpsc;
use tracing_subscriber::{
    EnvFilter,
    filter::LevelFilter,
    fmt::{self, MakeWriter},
    prelude::*,
};

/// Environment variable holding an `EnvFilter` directive that replaces the `-v` level.
pub const LOG_ENV_VAR: &str = "MDCHAIN_LOG";

pub fn setup_logging(
    verbosity: u8,
    quiet: bool,
    log_file: Option<&Path>,
    ui_sender: mpsc::Sender<UiEvent>,
) -> Result<()> {
    let env_directive = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(verbosity, quiet, env_directive.as_deref())?;

    let console_layer = fmt::layer()
        .with_writer(UiLogWriter { sender: ui_sender })
        .with_ansi(true)
        .with_target(false)
        .compact();

    let file_layer = log_file
        .map(|path| {
            File::create(path).map(|file| {
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_target(true)
            })
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to install logger: {}", e)))
}

fn build_filter(verbosity: u8, quiet: bool, env_directive: Option<&str>) -> Result<EnvFilter> {
    if quiet {
        return Ok(EnvFilter::default().add_directive(LevelFilter::OFF.into()));
    }
    if let Some(directive) = env_directive.filter(|d| !d.trim().is_empty()) {
        return EnvFilter::try_new(directive).map_err(|e| {
            CliError::Config(format!("Invalid {} directive '{}': {}", LOG_ENV_VAR, directive, e))
        });
    }
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    Ok(EnvFilter::default().add_directive(level.into()))
}

/// Routes console log lines through the UI task so they print above the progress bars.
#[derive(Clone)]
struct UiLogWriter {
    sender: mpsc::Sender<UiEvent>,
}

impl Write for UiLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let line = String::from_utf8_lossy(buf);
        let line = line.trim_end();
        if !line.is_empty() && self.sender.try_send(UiEvent::Log(line.to_string())).is_err() {
            io::stderr().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for UiLogWriter {
    type Writer = UiLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
