use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "mdchain - Chains LAMMPS segments restart by restart and prepares CP2K CDFT coupling runs.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a chain of MD segments, each restarting from the previous segment's state.
    Run(RunArgs),
    /// Show how far a chain has progressed.
    Status(StatusArgs),
    /// Convert a LAMMPS input script into a placeholder template.
    Template(TemplateArgs),
    /// Run CDFT state and coupling calculations for a range of molecules.
    Coupling(CouplingArgs),
    /// Relabel a packed PDB system against a mol2 oligomer template.
    Prepare(PrepareArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the chain configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Chain Overrides ---
    /// Placeholder template rendered for every segment.
    #[arg(short, long, value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// State file the first segment reads.
    #[arg(short, long, value_name = "PATH")]
    pub initial_state: Option<PathBuf>,

    /// Number of segments to run.
    #[arg(short = 'n', long, value_name = "INT")]
    pub steps: Option<usize>,

    /// Directory receiving inputs, logs and state files.
    #[arg(short, long, value_name = "PATH")]
    pub work_dir: Option<PathBuf>,

    /// Prefix of state file names.
    #[arg(long, value_name = "NAME")]
    pub prefix: Option<String>,

    /// Number of digits in artifact indices.
    #[arg(long, value_name = "INT")]
    pub index_width: Option<usize>,

    // --- Engine Overrides ---
    /// Engine command line, e.g. "mpirun -np 8 lmp".
    #[arg(short, long, value_name = "COMMAND")]
    pub engine: Option<String>,

    /// Flag placed before the input file; pass an empty string for none.
    #[arg(long, value_name = "FLAG", allow_hyphen_values = true)]
    pub input_flag: Option<String>,

    /// Kill a segment that runs longer than this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Re-run a failed segment up to this many times.
    #[arg(short, long, value_name = "INT")]
    pub retries: Option<u32>,

    /// Ignore any progress marker and start from the initial state.
    #[arg(long)]
    pub fresh: bool,

    /// Delete each rendered input once its segment succeeds.
    #[arg(long)]
    pub remove_inputs: bool,

    /// Let the engine write to the terminal instead of per-segment screen files.
    #[arg(long)]
    pub no_capture: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S chain.steps=50
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `status` subcommand.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Chain configuration file used for the run.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Work directory of the run.
    #[arg(short, long, value_name = "PATH")]
    pub work_dir: Option<PathBuf>,

    /// Prefix of state file names.
    #[arg(long, value_name = "NAME")]
    pub prefix: Option<String>,
}

/// Arguments for the `template` subcommand.
#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// LAMMPS input script to convert.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Where to write the template.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Only rewrite dump commands whose file name contains this text.
    #[arg(long, value_name = "TEXT")]
    pub dump_tag: Option<String>,

    /// Overwrite the output file if it exists.
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the `coupling` subcommand.
#[derive(Args, Debug)]
pub struct CouplingArgs {
    /// Path to the coupling configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// First molecule index, overriding the config file.
    #[arg(long, value_name = "INT")]
    pub start: Option<usize>,

    /// Last molecule index (inclusive), overriding the config file.
    #[arg(long, value_name = "INT")]
    pub end: Option<usize>,

    /// Directory holding inputs, outputs and restart files.
    #[arg(short, long, value_name = "PATH")]
    pub work_dir: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S molecules.base=49
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `prepare` subcommand.
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Packed system in PDB format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Where to write the relabelled system.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// mol2 file of one oligomer, giving atom names and order.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub mol2: PathBuf,

    /// Where to write the first oligomer on its own.
    #[arg(long, value_name = "PATH")]
    pub extract: Option<PathBuf>,

    /// Optional TOML file with residue names and fallback counts.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Fallback oligomer count used when detection finds nothing.
    #[arg(long, value_name = "INT")]
    pub oligomers: Option<usize>,

    /// Fallback ion count used when detection finds nothing.
    #[arg(long, value_name = "INT")]
    pub ions: Option<usize>,

    /// Fallback water count used when detection finds nothing.
    #[arg(long, value_name = "INT")]
    pub waters: Option<usize>,
}
