mod defaults;

use crate::cli::{CouplingArgs, PrepareArgs, RunArgs, StatusArgs};
use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use mdchain::core::naming::{ArtifactNaming, DEFAULT_PREFIX};
use mdchain::core::structure::{Composition, IonSpec, RelabelOptions, WaterSpec};
use mdchain::engine::config as core_config;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Loading configuration from file: {:?}", path);
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

fn split_set_value(kv_pair: &str) -> Result<(&str, &str)> {
    kv_pair.split_once('=').ok_or_else(|| {
        CliError::Config(format!(
            "Invalid --set format: '{}'. Expected KEY=VALUE.",
            kv_pair
        ))
    })
}

fn parse_set_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| CliError::Config(format!("Invalid value for {}: '{}' ({})", key, value, e)))
}

fn unsupported_key(key: &str) -> CliError {
    CliError::Config(format!("Unsupported configuration key for --set: '{}'", key))
}

fn core_error(e: core_config::ConfigError) -> CliError {
    CliError::Config(e.to_string())
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialEngineConfig {
    command: Option<String>,
    input_flag: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    capture_output: Option<bool>,
    env: Option<BTreeMap<String, String>>,
}

impl PartialEngineConfig {
    fn build(
        &self,
        cli_command: Option<&str>,
        cli_input_flag: Option<&str>,
        default_command: &str,
        default_input_flag: &str,
    ) -> Result<core_config::EngineCommand> {
        let command_line = cli_command
            .or(self.command.as_deref())
            .unwrap_or(default_command);
        let input_flag = cli_input_flag
            .or(self.input_flag.as_deref())
            .unwrap_or(default_input_flag);

        let mut engine = core_config::EngineCommand::parse(command_line)
            .map_err(core_error)?
            .with_input_flag(input_flag);
        for (key, value) in self.env.iter().flatten() {
            engine = engine.with_env(key, value);
        }
        Ok(engine)
    }

    fn timeout(&self, cli_timeout: Option<u64>) -> Option<Duration> {
        cli_timeout.or(self.timeout_secs).map(Duration::from_secs)
    }

    fn apply_set_value(&mut self, field: &str, key: &str, value: &str) -> Result<()> {
        match field {
            "command" => self.command = Some(value.to_string()),
            "input-flag" => self.input_flag = Some(value.to_string()),
            "timeout-secs" => self.timeout_secs = Some(parse_set_value(key, value)?),
            "max-retries" => self.max_retries = Some(parse_set_value(key, value)?),
            "capture-output" => self.capture_output = Some(parse_set_value(key, value)?),
            _ => return Err(unsupported_key(key)),
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialChainSection {
    steps: Option<usize>,
    template: Option<PathBuf>,
    initial_state: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    prefix: Option<String>,
    index_width: Option<usize>,
    resume: Option<bool>,
    remove_inputs: Option<bool>,
}

/// The `run` configuration file. Every value is optional so command-line flags can fill
/// the gaps.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    chain: Option<PartialChainSection>,
    engine: Option<PartialEngineConfig>,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        load_toml(path)
    }

    pub fn from_optional_file(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    pub fn merge_with_cli(mut self, args: &RunArgs) -> Result<core_config::ChainConfig> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();

        let chain = self.chain.take().unwrap_or_default();
        let engine_file = self.engine.take().unwrap_or_default();

        let steps = args.steps.or(chain.steps).ok_or_else(|| {
            CliError::Config(
                "The number of steps is required (`chain.steps` or --steps).".to_string(),
            )
        })?;
        let template = args
            .template
            .clone()
            .or(chain.template)
            .ok_or_else(|| {
                CliError::Config("A template is required (`chain.template` or --template).".to_string())
            })?;
        let initial_state = args
            .initial_state
            .clone()
            .or(chain.initial_state)
            .ok_or_else(|| {
                CliError::Config(
                    "An initial state is required (`chain.initial-state` or --initial-state)."
                        .to_string(),
                )
            })?;

        let engine = engine_file.build(
            args.engine.as_deref(),
            args.input_flag.as_deref(),
            defaults.chain_engine,
            defaults.chain_input_flag,
        )?;
        let max_retries = args
            .retries
            .or(engine_file.max_retries)
            .unwrap_or(defaults.max_retries);
        let resume = !args.fresh && chain.resume.unwrap_or(defaults.resume);
        let remove_inputs =
            args.remove_inputs || chain.remove_inputs.unwrap_or(defaults.remove_inputs);
        let capture_output =
            !args.no_capture && engine_file.capture_output.unwrap_or(defaults.capture_output);

        let mut builder = core_config::ChainConfigBuilder::new()
            .total_steps(steps)
            .template_path(template)
            .initial_state(initial_state)
            .engine(engine)
            .timeout(engine_file.timeout(args.timeout))
            .retry(core_config::RetryPolicy::from_max_retries(max_retries))
            .resume(resume)
            .remove_inputs(remove_inputs)
            .capture_output(capture_output);

        if let Some(work_dir) = args.work_dir.clone().or(chain.work_dir) {
            builder = builder.work_dir(work_dir);
        }
        if let Some(prefix) = args.prefix.clone().or(chain.prefix) {
            builder = builder.prefix(prefix);
        }
        if let Some(width) = args.index_width.or(chain.index_width) {
            builder = builder.index_width(width);
        }

        builder.build().map_err(core_error)
    }

    /// Naming scheme of an existing run, for locating its progress marker.
    pub fn status_naming(self, args: &StatusArgs) -> ArtifactNaming {
        let chain = self.chain.unwrap_or_default();
        let work_dir = args
            .work_dir
            .clone()
            .or(chain.work_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        let prefix = args
            .prefix
            .clone()
            .or(chain.prefix)
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        let naming = ArtifactNaming::new(work_dir, prefix);
        match chain.index_width {
            Some(width) => naming.with_width(width),
            None => naming,
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value) = split_set_value(kv_pair)?;
            match key.split_once('.') {
                Some(("chain", field)) => {
                    let chain = self.chain.get_or_insert_with(Default::default);
                    match field {
                        "steps" => chain.steps = Some(parse_set_value(key, value)?),
                        "template" => chain.template = Some(PathBuf::from(value)),
                        "initial-state" => chain.initial_state = Some(PathBuf::from(value)),
                        "work-dir" => chain.work_dir = Some(PathBuf::from(value)),
                        "prefix" => chain.prefix = Some(value.to_string()),
                        "index-width" => chain.index_width = Some(parse_set_value(key, value)?),
                        "resume" => chain.resume = Some(parse_set_value(key, value)?),
                        "remove-inputs" => {
                            chain.remove_inputs = Some(parse_set_value(key, value)?)
                        }
                        _ => return Err(unsupported_key(key)),
                    }
                }
                Some(("engine", field)) => self
                    .engine
                    .get_or_insert_with(Default::default)
                    .apply_set_value(field, key, value)?,
                _ => return Err(unsupported_key(key)),
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialMoleculesSection {
    first: Option<usize>,
    last: Option<usize>,
    base: Option<usize>,
    atoms_per_molecule: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialStateSection {
    label: Option<String>,
    template: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialStatesSection {
    a: Option<PartialStateSection>,
    b: Option<PartialStateSection>,
    coupling_template: Option<PathBuf>,
    coord_file: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOutputSection {
    work_dir: Option<PathBuf>,
    summary: Option<PathBuf>,
}

/// The `coupling` configuration file.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialCouplingConfig {
    molecules: Option<PartialMoleculesSection>,
    states: Option<PartialStatesSection>,
    output: Option<PartialOutputSection>,
    engine: Option<PartialEngineConfig>,
}

impl PartialCouplingConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        load_toml(path)
    }

    pub fn merge_with_cli(mut self, args: &CouplingArgs) -> Result<core_config::CouplingConfig> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();

        let molecules = self.molecules.take().unwrap_or_default();
        let states = self.states.take().unwrap_or_default();
        let output = self.output.take().unwrap_or_default();
        let engine_file = self.engine.take().unwrap_or_default();

        let first = args.start.or(molecules.first).ok_or_else(|| {
            CliError::Config("`molecules.first` (or --start) is required.".to_string())
        })?;
        let last = args.end.or(molecules.last).ok_or_else(|| {
            CliError::Config("`molecules.last` (or --end) is required.".to_string())
        })?;
        let atoms_per_molecule = molecules.atoms_per_molecule.ok_or_else(|| {
            CliError::Config("`molecules.atoms-per-molecule` is required.".to_string())
        })?;

        let state_a = states.a.unwrap_or_default();
        let label_a = state_a
            .label
            .ok_or_else(|| CliError::Config("`states.a.label` is required.".to_string()))?;
        let template_a = state_a
            .template
            .ok_or_else(|| CliError::Config("`states.a.template` is required.".to_string()))?;
        let state_b = states.b.unwrap_or_default();
        let label_b = state_b
            .label
            .ok_or_else(|| CliError::Config("`states.b.label` is required.".to_string()))?;
        let coupling_template = states.coupling_template.ok_or_else(|| {
            CliError::Config("`states.coupling-template` is required.".to_string())
        })?;

        let engine = engine_file.build(
            None,
            None,
            defaults.coupling_engine,
            defaults.coupling_input_flag,
        )?;

        let mut builder = core_config::CouplingConfigBuilder::new()
            .molecules(first, last)
            .atoms_per_molecule(atoms_per_molecule)
            .state_a(label_a, template_a)
            .state_b(label_b, state_b.template)
            .coupling_template(coupling_template)
            .coord_file(states.coord_file)
            .engine(engine)
            .timeout(engine_file.timeout(None));

        if let Some(base) = molecules.base {
            builder = builder.base_molecule(base);
        }
        if let Some(work_dir) = args.work_dir.clone().or(output.work_dir) {
            builder = builder.work_dir(work_dir);
        }
        if let Some(summary) = output.summary {
            builder = builder.summary_path(summary);
        }

        builder.build().map_err(core_error)
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value) = split_set_value(kv_pair)?;
            match key.split_once('.') {
                Some(("molecules", field)) => {
                    let molecules = self.molecules.get_or_insert_with(Default::default);
                    let parsed = Some(parse_set_value(key, value)?);
                    match field {
                        "first" => molecules.first = parsed,
                        "last" => molecules.last = parsed,
                        "base" => molecules.base = parsed,
                        "atoms-per-molecule" => molecules.atoms_per_molecule = parsed,
                        _ => return Err(unsupported_key(key)),
                    }
                }
                Some(("states", "coord-file")) => {
                    self.states.get_or_insert_with(Default::default).coord_file =
                        Some(value.to_string())
                }
                Some(("output", "work-dir")) => {
                    self.output.get_or_insert_with(Default::default).work_dir =
                        Some(PathBuf::from(value))
                }
                Some(("output", "summary")) => {
                    self.output.get_or_insert_with(Default::default).summary =
                        Some(PathBuf::from(value))
                }
                Some(("engine", field)) => self
                    .engine
                    .get_or_insert_with(Default::default)
                    .apply_set_value(field, key, value)?,
                _ => return Err(unsupported_key(key)),
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialLabelsSection {
    oligomer_residue: Option<String>,
    ion_residue: Option<String>,
    ion_atom: Option<String>,
    ion_element: Option<String>,
    water_residue: Option<String>,
    water_atoms: Option<[String; 3]>,
}

impl PartialLabelsSection {
    fn into_options(self) -> RelabelOptions {
        let defaults = RelabelOptions::default();
        RelabelOptions {
            oligomer_residue: self.oligomer_residue.unwrap_or(defaults.oligomer_residue),
            ion: IonSpec {
                residue_name: self.ion_residue.unwrap_or(defaults.ion.residue_name),
                atom_name: self.ion_atom.unwrap_or(defaults.ion.atom_name),
                element: self.ion_element.unwrap_or(defaults.ion.element),
            },
            water: WaterSpec {
                residue_name: self.water_residue.unwrap_or(defaults.water.residue_name),
                atom_names: self.water_atoms.unwrap_or(defaults.water.atom_names),
            },
        }
    }
}

/// The optional `prepare` configuration file.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialPrepareConfig {
    fallback: Option<Composition>,
    labels: Option<PartialLabelsSection>,
}

impl PartialPrepareConfig {
    pub fn from_optional_file(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), load_toml)
    }

    pub fn merge_with_cli(self, args: &PrepareArgs) -> Result<core_config::PrepareConfig> {
        let fallback = if args.oligomers.is_some() || args.ions.is_some() || args.waters.is_some()
        {
            let base = self.fallback.unwrap_or_default();
            Some(Composition::new(
                args.oligomers.unwrap_or(base.oligomers),
                args.ions.unwrap_or(base.ions),
                args.waters.unwrap_or(base.waters),
            ))
        } else {
            self.fallback
        };

        let mut builder = core_config::PrepareConfigBuilder::new()
            .input_pdb(args.input.clone())
            .output_pdb(args.output.clone())
            .mol2_template(args.mol2.clone())
            .fallback(fallback)
            .options(self.labels.unwrap_or_default().into_options());
        if let Some(extract) = &args.extract {
            builder = builder.extract_path(extract.clone());
        }
        builder.build().map_err(core_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use once_cell::sync::Lazy;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    static TEST_DIR: Lazy<TempDir> = Lazy::new(|| tempdir().expect("Failed to create temp dir"));

    fn write_config_file(name: &str, content: &str) -> PathBuf {
        let file_path = TEST_DIR.path().join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn run_args(extra: &[&str]) -> RunArgs {
        let args = ["mdchain", "run"].iter().chain(extra);
        match Cli::parse_from(args).command {
            Commands::Run(args) => args,
            _ => panic!("Expected 'run' subcommand"),
        }
    }

    fn coupling_args(extra: &[&str]) -> CouplingArgs {
        let args = ["mdchain", "coupling"].iter().chain(extra);
        match Cli::parse_from(args).command {
            Commands::Coupling(args) => args,
            _ => panic!("Expected 'coupling' subcommand"),
        }
    }

    const RUN_CONFIG: &str = r#"
        [chain]
        steps = 40
        template = "loop.in"
        initial-state = "state_0000.data"
        work-dir = "runs"
        index-width = 3

        [engine]
        command = "mpirun -np 8 lmp"
        timeout-secs = 7200
        max-retries = 2

        [engine.env]
        OMP_NUM_THREADS = "4"
    "#;

    #[test]
    fn run_config_file_is_merged_with_defaults() {
        let path = write_config_file("run.toml", RUN_CONFIG);
        let config = PartialRunConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&run_args(&["-c", path.to_str().unwrap()]))
            .unwrap();

        assert_eq!(config.total_steps, 40);
        assert_eq!(config.naming.work_dir(), Path::new("runs"));
        assert_eq!(config.naming.width(), 3);
        assert_eq!(config.engine.program, "mpirun");
        assert_eq!(config.engine.input_flag.as_deref(), Some("-in"));
        assert_eq!(
            config.engine.env,
            vec![("OMP_NUM_THREADS".to_string(), "4".to_string())]
        );
        assert_eq!(config.timeout, Some(Duration::from_secs(7200)));
        assert_eq!(
            config.retry,
            core_config::RetryPolicy::Retry { max_retries: 2 }
        );
        assert!(config.resume);
        assert!(config.capture_output);
    }

    #[test]
    fn run_cli_flags_override_file_values() {
        let path = write_config_file("run_override.toml", RUN_CONFIG);
        let args = run_args(&[
            "--steps",
            "5",
            "--engine",
            "lmp_serial",
            "--input-flag",
            "",
            "--fresh",
            "--no-capture",
            "--retries",
            "0",
        ]);
        let config = PartialRunConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();

        assert_eq!(config.total_steps, 5);
        assert_eq!(config.engine.program, "lmp_serial");
        assert_eq!(config.engine.input_flag, None);
        assert!(!config.resume);
        assert!(!config.capture_output);
        assert_eq!(config.retry, core_config::RetryPolicy::Abort);
    }

    #[test]
    fn run_set_values_override_file() {
        let path = write_config_file("run_set.toml", RUN_CONFIG);
        let args = run_args(&["-S", "chain.steps=12", "-S", "engine.timeout-secs=60"]);
        let config = PartialRunConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();
        assert_eq!(config.total_steps, 12);
        assert_eq!(config.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn run_set_value_errors_are_reported() {
        let bad_format = PartialRunConfig::default().merge_with_cli(&run_args(&["-S", "chain.steps"]));
        assert!(matches!(bad_format, Err(CliError::Config(_))));

        let bad_key = PartialRunConfig::default().merge_with_cli(&run_args(&["-S", "chain.colour=red"]));
        assert!(matches!(bad_key, Err(CliError::Config(msg)) if msg.contains("chain.colour")));

        let bad_value =
            PartialRunConfig::default().merge_with_cli(&run_args(&["-S", "chain.steps=many"]));
        assert!(matches!(bad_value, Err(CliError::Config(msg)) if msg.contains("many")));
    }

    #[test]
    fn run_without_steps_is_a_config_error() {
        let args = run_args(&["--template", "loop.in", "--initial-state", "s.data"]);
        let result = PartialRunConfig::default().merge_with_cli(&args);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("steps")));
    }

    #[test]
    fn unknown_keys_in_file_are_rejected() {
        let path = write_config_file("run_unknown.toml", "[chain]\nstpes = 3\n");
        assert!(matches!(
            PartialRunConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn status_naming_uses_file_then_flags() {
        let path = write_config_file("run_status.toml", RUN_CONFIG);
        let args = match Cli::parse_from(["mdchain", "status", "--prefix", "eq"]).command {
            Commands::Status(args) => args,
            _ => panic!("Expected 'status' subcommand"),
        };
        let naming = PartialRunConfig::from_file(&path).unwrap().status_naming(&args);
        assert_eq!(naming.marker_path(), Path::new("runs").join("eq.progress.toml"));
    }

    const COUPLING_CONFIG: &str = r#"
        [molecules]
        first = 49
        last = 64
        atoms-per-molecule = 173

        [states]
        coupling-template = "template_coupling.inp"
        a = { label = "GACA", template = "template_GACA.inp" }
        b = { label = "GACB" }

        [output]
        work-dir = "cdft"

        [engine]
        env = { OMP_NUM_THREADS = "8" }
    "#;

    #[test]
    fn coupling_config_uses_cp2k_defaults_and_range_overrides() {
        let path = write_config_file("coupling.toml", COUPLING_CONFIG);
        let args = coupling_args(&["-c", path.to_str().unwrap(), "--start", "50", "--end", "52"]);
        let config = PartialCouplingConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();

        assert_eq!(config.molecules(), 50..=52);
        assert_eq!(config.base_molecule, 50);
        assert_eq!(config.engine.program, "cp2k.ssmp");
        assert_eq!(config.engine.input_flag.as_deref(), Some("-i"));
        assert_eq!(config.state_b.template, PathBuf::from("template_GACA.inp"));
        assert_eq!(config.summary_path, Path::new("cdft").join("coupling_summary.csv"));
    }

    #[test]
    fn coupling_set_values_reach_the_config() {
        let path = write_config_file("coupling_set.toml", COUPLING_CONFIG);
        let args = coupling_args(&[
            "-c",
            path.to_str().unwrap(),
            "-S",
            "molecules.base=49",
            "-S",
            "output.summary=out.csv",
        ]);
        let config = PartialCouplingConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();
        assert_eq!(config.atom_offset(50), 173);
        assert_eq!(config.summary_path, PathBuf::from("out.csv"));
    }

    #[test]
    fn coupling_requires_state_labels() {
        let path = write_config_file(
            "coupling_missing.toml",
            "[molecules]\nfirst = 1\nlast = 2\natoms-per-molecule = 10\n",
        );
        let args = coupling_args(&["-c", path.to_str().unwrap()]);
        let result = PartialCouplingConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("states.a.label")));
    }

    #[test]
    fn prepare_counts_and_labels_are_merged() {
        let path = write_config_file(
            "prepare.toml",
            "[fallback]\noligomers = 16\nions = 16\nwaters = 2000\n\n[labels]\nwater-residue = \"HOH\"\n",
        );
        let args = match Cli::parse_from([
            "mdchain",
            "prepare",
            "-i",
            "in.pdb",
            "-o",
            "out/out.pdb",
            "-m",
            "center1.mol2",
            "--waters",
            "1800",
        ])
        .command
        {
            Commands::Prepare(args) => args,
            _ => panic!("Expected 'prepare' subcommand"),
        };

        let config = PartialPrepareConfig::from_optional_file(Some(&path))
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();
        assert_eq!(config.fallback, Some(Composition::new(16, 16, 1800)));
        assert_eq!(config.options.water.residue_name, "HOH");
        assert_eq!(config.options.oligomer_residue, "MOL");
        assert_eq!(config.extract_path, PathBuf::from("out/extracted_oligomer.pdb"));
    }
}
