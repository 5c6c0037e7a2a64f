use crate::cli::TemplateArgs;
use crate::error::{CliError, Result};
use mdchain::core::template::lammps::tokenize_script;
use std::fs;
use tracing::info;

pub fn run(args: TemplateArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        return Err(CliError::Argument(format!(
            "'{}' already exists; pass --force to overwrite it.",
            args.output.display()
        )));
    }

    info!("Tokenizing LAMMPS script {:?}", &args.input);
    let script = fs::read_to_string(&args.input)?;
    let (template, summary) =
        tokenize_script(&script, args.dump_tag.as_deref()).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;
    fs::write(&args.output, template.source())?;

    println!(
        "✓ Template written to {} (read_data: {}, write_data: {}, log: {}, dump: {})",
        args.output.display(),
        summary.read_data,
        summary.write_data,
        summary.log,
        summary.dump
    );
    Ok(())
}
