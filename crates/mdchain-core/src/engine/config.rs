use super::process::Invocation;
use crate::core::naming::{ArtifactNaming, DEFAULT_INDEX_WIDTH, DEFAULT_PREFIX};
use crate::core::structure::{Composition, RelabelOptions};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SUMMARY_FILE: &str = "coupling_summary.csv";
pub const DEFAULT_EXTRACT_FILE: &str = "extracted_oligomer.pdb";

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    Invalid {
        parameter: &'static str,
        reason: String,
    },
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        parameter,
        reason: reason.into(),
    }
}

/// How to start the simulation program for one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Flag placed before the input path (`-in` for LAMMPS, `-i` for CP2K). Without one the
    /// input path is passed as a bare trailing argument.
    pub input_flag: Option<String>,
    pub env: Vec<(String, String)>,
}

impl EngineCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            input_flag: None,
            env: Vec::new(),
        }
    }

    /// Splits a command line on whitespace: the first word is the program, the rest are
    /// fixed leading arguments (e.g. `mpirun -np 8 lmp`).
    pub fn parse(command_line: &str) -> Result<Self, ConfigError> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| invalid("engine", "command line is empty"))?;
        Ok(Self {
            program,
            args: words.collect(),
            input_flag: None,
            env: Vec::new(),
        })
    }

    pub fn with_input_flag(mut self, flag: impl Into<String>) -> Self {
        let flag = flag.into();
        self.input_flag = (!flag.is_empty()).then_some(flag);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn invocation(&self, input: &Path) -> Invocation {
        let mut invocation = Invocation::new(self.program.clone());
        invocation.args = self.args.clone();
        invocation.env = self.env.clone();
        if let Some(flag) = &self.input_flag {
            invocation.args.push(flag.clone());
        }
        invocation.args.push(input.display().to_string());
        invocation
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Stop the chain at the first failed iteration.
    #[default]
    Abort,
    /// Re-run a failed iteration up to `max_retries` more times before stopping.
    Retry { max_retries: u32 },
}

impl RetryPolicy {
    pub fn from_max_retries(max_retries: u32) -> Self {
        if max_retries == 0 {
            RetryPolicy::Abort
        } else {
            RetryPolicy::Retry { max_retries }
        }
    }

    pub fn max_attempts(&self) -> u32 {
        match self {
            RetryPolicy::Abort => 1,
            RetryPolicy::Retry { max_retries } => max_retries.saturating_add(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainConfig {
    pub total_steps: usize,
    pub template_path: PathBuf,
    pub initial_state: PathBuf,
    pub naming: ArtifactNaming,
    pub engine: EngineCommand,
    pub timeout: Option<Duration>,
    pub retry: RetryPolicy,
    pub resume: bool,
    pub remove_inputs: bool,
    pub capture_output: bool,
}

#[derive(Default)]
pub struct ChainConfigBuilder {
    total_steps: Option<usize>,
    template_path: Option<PathBuf>,
    initial_state: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    prefix: Option<String>,
    index_width: Option<usize>,
    engine: Option<EngineCommand>,
    timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
    resume: Option<bool>,
    remove_inputs: Option<bool>,
    capture_output: Option<bool>,
}

impl ChainConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_steps(mut self, steps: usize) -> Self {
        self.total_steps = Some(steps);
        self
    }
    pub fn template_path(mut self, path: PathBuf) -> Self {
        self.template_path = Some(path);
        self
    }
    pub fn initial_state(mut self, path: PathBuf) -> Self {
        self.initial_state = Some(path);
        self
    }
    pub fn work_dir(mut self, path: PathBuf) -> Self {
        self.work_dir = Some(path);
        self
    }
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
    pub fn index_width(mut self, width: usize) -> Self {
        self.index_width = Some(width);
        self
    }
    pub fn engine(mut self, engine: EngineCommand) -> Self {
        self.engine = Some(engine);
        self
    }
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }
    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = Some(resume);
        self
    }
    pub fn remove_inputs(mut self, remove: bool) -> Self {
        self.remove_inputs = Some(remove);
        self
    }
    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = Some(capture);
        self
    }

    pub fn build(self) -> Result<ChainConfig, ConfigError> {
        let total_steps = self
            .total_steps
            .ok_or(ConfigError::MissingParameter("total_steps"))?;
        if total_steps == 0 {
            return Err(invalid("total_steps", "must be at least 1"));
        }

        let prefix = self.prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        validate_prefix(&prefix)?;

        let naming = ArtifactNaming::new(self.work_dir.unwrap_or_else(|| PathBuf::from(".")), prefix)
            .with_width(self.index_width.unwrap_or(DEFAULT_INDEX_WIDTH));
        if total_steps >= naming.capacity() {
            return Err(invalid(
                "total_steps",
                format!(
                    "{} steps do not fit in {}-digit artifact indices",
                    total_steps,
                    naming.width()
                ),
            ));
        }

        if self.timeout == Some(Duration::ZERO) {
            return Err(invalid("timeout", "must be greater than zero"));
        }

        let initial_state = self
            .initial_state
            .ok_or(ConfigError::MissingParameter("initial_state"))?;
        validate_initial_state(&naming, &initial_state)?;

        Ok(ChainConfig {
            total_steps,
            template_path: self
                .template_path
                .ok_or(ConfigError::MissingParameter("template_path"))?,
            initial_state,
            naming,
            engine: self.engine.ok_or(ConfigError::MissingParameter("engine"))?,
            timeout: self.timeout,
            retry: self.retry.unwrap_or_default(),
            resume: self.resume.unwrap_or(true),
            remove_inputs: self.remove_inputs.unwrap_or(false),
            capture_output: self.capture_output.unwrap_or(true),
        })
    }
}

/// The chain deletes and rewrites every state artifact from index 1 on, so an initial state
/// carrying one of those names would be destroyed before the first engine run.
fn validate_initial_state(naming: &ArtifactNaming, initial: &Path) -> Result<(), ConfigError> {
    let Some(index) = naming.state_index(initial).filter(|&k| k >= 1) else {
        return Ok(());
    };
    let parent = initial.parent().unwrap_or_else(|| Path::new(""));
    if same_directory(parent, naming.work_dir()) {
        return Err(invalid(
            "initial_state",
            format!(
                "'{}' is the name of state artifact {} of this chain; copy it to another name or start from index 0",
                initial.display(),
                index
            ),
        ));
    }
    Ok(())
}

fn same_directory(a: &Path, b: &Path) -> bool {
    let resolve = |p: &Path| {
        if p.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            p.to_path_buf()
        }
    };
    match (fs::canonicalize(resolve(a)), fs::canonicalize(resolve(b))) {
        (Ok(a), Ok(b)) => a == b,
        _ => lexical(a) == lexical(b),
    }
}

fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn validate_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty() {
        return Err(invalid("prefix", "must not be empty"));
    }
    if prefix
        .chars()
        .any(|c| c.is_whitespace() || std::path::is_separator(c))
    {
        return Err(invalid(
            "prefix",
            format!("'{}' must not contain whitespace or path separators", prefix),
        ));
    }
    Ok(())
}

/// One diabatic state of a coupling calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSpec {
    pub label: String,
    pub template: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CouplingConfig {
    pub first_molecule: usize,
    pub last_molecule: usize,
    pub base_molecule: usize,
    pub atoms_per_molecule: usize,
    pub state_a: StateSpec,
    pub state_b: StateSpec,
    pub coupling_template: PathBuf,
    pub coord_file: Option<String>,
    pub work_dir: PathBuf,
    pub engine: EngineCommand,
    pub timeout: Option<Duration>,
    pub summary_path: PathBuf,
}

impl CouplingConfig {
    /// Signed atom-index shift of `molecule` relative to the base molecule.
    pub fn atom_offset(&self, molecule: usize) -> i64 {
        (molecule as i64 - self.base_molecule as i64) * self.atoms_per_molecule as i64
    }

    pub fn molecules(&self) -> std::ops::RangeInclusive<usize> {
        self.first_molecule..=self.last_molecule
    }
}

#[derive(Default)]
pub struct CouplingConfigBuilder {
    first_molecule: Option<usize>,
    last_molecule: Option<usize>,
    base_molecule: Option<usize>,
    atoms_per_molecule: Option<usize>,
    state_a: Option<(String, PathBuf)>,
    state_b_label: Option<String>,
    state_b_template: Option<PathBuf>,
    coupling_template: Option<PathBuf>,
    coord_file: Option<String>,
    work_dir: Option<PathBuf>,
    engine: Option<EngineCommand>,
    timeout: Option<Duration>,
    summary_path: Option<PathBuf>,
}

impl CouplingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn molecules(mut self, first: usize, last: usize) -> Self {
        self.first_molecule = Some(first);
        self.last_molecule = Some(last);
        self
    }
    pub fn base_molecule(mut self, base: usize) -> Self {
        self.base_molecule = Some(base);
        self
    }
    pub fn atoms_per_molecule(mut self, atoms: usize) -> Self {
        self.atoms_per_molecule = Some(atoms);
        self
    }
    pub fn state_a(mut self, label: impl Into<String>, template: PathBuf) -> Self {
        self.state_a = Some((label.into(), template));
        self
    }
    /// Without a template, state B is rendered from state A's template.
    pub fn state_b(mut self, label: impl Into<String>, template: Option<PathBuf>) -> Self {
        self.state_b_label = Some(label.into());
        self.state_b_template = template;
        self
    }
    pub fn coupling_template(mut self, path: PathBuf) -> Self {
        self.coupling_template = Some(path);
        self
    }
    pub fn coord_file(mut self, file: Option<String>) -> Self {
        self.coord_file = file;
        self
    }
    pub fn work_dir(mut self, path: PathBuf) -> Self {
        self.work_dir = Some(path);
        self
    }
    pub fn engine(mut self, engine: EngineCommand) -> Self {
        self.engine = Some(engine);
        self
    }
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn summary_path(mut self, path: PathBuf) -> Self {
        self.summary_path = Some(path);
        self
    }

    pub fn build(self) -> Result<CouplingConfig, ConfigError> {
        let first_molecule = self
            .first_molecule
            .ok_or(ConfigError::MissingParameter("first_molecule"))?;
        let last_molecule = self
            .last_molecule
            .ok_or(ConfigError::MissingParameter("last_molecule"))?;
        if first_molecule > last_molecule {
            return Err(invalid(
                "last_molecule",
                format!(
                    "range {}..={} is empty",
                    first_molecule, last_molecule
                ),
            ));
        }

        let atoms_per_molecule = self
            .atoms_per_molecule
            .ok_or(ConfigError::MissingParameter("atoms_per_molecule"))?;
        if atoms_per_molecule == 0 {
            return Err(invalid("atoms_per_molecule", "must be at least 1"));
        }

        let (label_a, template_a) = self
            .state_a
            .ok_or(ConfigError::MissingParameter("state_a"))?;
        let label_b = self
            .state_b_label
            .ok_or(ConfigError::MissingParameter("state_b"))?;
        for label in [&label_a, &label_b] {
            if label.trim().is_empty() {
                return Err(invalid("state label", "must not be empty"));
            }
        }
        if label_a.eq_ignore_ascii_case(&label_b) {
            return Err(invalid(
                "state_b",
                format!("label '{}' must differ from state A's label", label_b),
            ));
        }
        let template_b = self.state_b_template.unwrap_or_else(|| template_a.clone());

        if self.timeout == Some(Duration::ZERO) {
            return Err(invalid("timeout", "must be greater than zero"));
        }

        let work_dir = self.work_dir.unwrap_or_else(|| PathBuf::from("."));
        let summary_path = self
            .summary_path
            .unwrap_or_else(|| work_dir.join(DEFAULT_SUMMARY_FILE));

        Ok(CouplingConfig {
            first_molecule,
            last_molecule,
            base_molecule: self.base_molecule.unwrap_or(first_molecule),
            atoms_per_molecule,
            state_a: StateSpec {
                label: label_a,
                template: template_a,
            },
            state_b: StateSpec {
                label: label_b,
                template: template_b,
            },
            coupling_template: self
                .coupling_template
                .ok_or(ConfigError::MissingParameter("coupling_template"))?,
            coord_file: self.coord_file,
            work_dir,
            engine: self.engine.ok_or(ConfigError::MissingParameter("engine"))?,
            timeout: self.timeout,
            summary_path,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrepareConfig {
    pub input_pdb: PathBuf,
    pub output_pdb: PathBuf,
    pub mol2_template: PathBuf,
    pub extract_path: PathBuf,
    /// Counts used when automatic detection finds nothing.
    pub fallback: Option<Composition>,
    pub options: RelabelOptions,
}

#[derive(Default)]
pub struct PrepareConfigBuilder {
    input_pdb: Option<PathBuf>,
    output_pdb: Option<PathBuf>,
    mol2_template: Option<PathBuf>,
    extract_path: Option<PathBuf>,
    fallback: Option<Composition>,
    options: Option<RelabelOptions>,
}

impl PrepareConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_pdb(mut self, path: PathBuf) -> Self {
        self.input_pdb = Some(path);
        self
    }
    pub fn output_pdb(mut self, path: PathBuf) -> Self {
        self.output_pdb = Some(path);
        self
    }
    pub fn mol2_template(mut self, path: PathBuf) -> Self {
        self.mol2_template = Some(path);
        self
    }
    pub fn extract_path(mut self, path: PathBuf) -> Self {
        self.extract_path = Some(path);
        self
    }
    pub fn fallback(mut self, composition: Option<Composition>) -> Self {
        self.fallback = composition;
        self
    }
    pub fn options(mut self, options: RelabelOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn build(self) -> Result<PrepareConfig, ConfigError> {
        let input_pdb = self
            .input_pdb
            .ok_or(ConfigError::MissingParameter("input_pdb"))?;
        let output_pdb = self
            .output_pdb
            .ok_or(ConfigError::MissingParameter("output_pdb"))?;
        if input_pdb == output_pdb {
            return Err(invalid("output_pdb", "must differ from the input file"));
        }
        let extract_path = self.extract_path.unwrap_or_else(|| {
            output_pdb
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(DEFAULT_EXTRACT_FILE)
        });
        Ok(PrepareConfig {
            input_pdb,
            output_pdb,
            mol2_template: self
                .mol2_template
                .ok_or(ConfigError::MissingParameter("mol2_template"))?,
            extract_path,
            fallback: self.fallback,
            options: self.options.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_builder() -> ChainConfigBuilder {
        ChainConfigBuilder::new()
            .total_steps(10)
            .template_path(PathBuf::from("loop.in"))
            .initial_state(PathBuf::from("state_0000.data"))
            .engine(EngineCommand::new("lmp").with_input_flag("-in"))
    }

    #[test]
    fn chain_defaults_are_applied() {
        let config = chain_builder().build().unwrap();
        assert_eq!(config.retry, RetryPolicy::Abort);
        assert!(config.resume);
        assert!(!config.remove_inputs);
        assert!(config.capture_output);
        assert_eq!(config.naming.prefix(), DEFAULT_PREFIX);
        assert_eq!(config.naming.width(), DEFAULT_INDEX_WIDTH);
        assert_eq!(config.naming.work_dir(), Path::new("."));
    }

    #[test]
    fn initial_state_must_not_be_a_generated_state_artifact() {
        let own = chain_builder()
            .work_dir(PathBuf::from("run"))
            .initial_state(PathBuf::from("./run/state_0001.data"))
            .build();
        assert!(matches!(
            own,
            Err(ConfigError::Invalid { parameter: "initial_state", .. })
        ));

        let in_cwd = chain_builder()
            .initial_state(PathBuf::from("state_0007.data"))
            .build();
        assert!(matches!(
            in_cwd,
            Err(ConfigError::Invalid { parameter: "initial_state", .. })
        ));

        let seed = chain_builder()
            .work_dir(PathBuf::from("run"))
            .initial_state(PathBuf::from("run/state_0000.data"))
            .build();
        assert!(seed.is_ok());

        let previous_run = chain_builder()
            .work_dir(PathBuf::from("run"))
            .initial_state(PathBuf::from("equilibration/state_0005.data"))
            .build();
        assert!(previous_run.is_ok());
    }

    #[test]
    fn chain_requires_template_and_engine() {
        let missing = ChainConfigBuilder::new()
            .total_steps(1)
            .initial_state(PathBuf::from("a"))
            .engine(EngineCommand::new("lmp"))
            .build();
        assert_eq!(
            missing.unwrap_err(),
            ConfigError::MissingParameter("template_path")
        );
    }

    #[test]
    fn zero_steps_and_zero_timeout_are_invalid() {
        assert!(matches!(
            chain_builder().total_steps(0).build(),
            Err(ConfigError::Invalid { parameter: "total_steps", .. })
        ));
        assert!(matches!(
            chain_builder().timeout(Some(Duration::ZERO)).build(),
            Err(ConfigError::Invalid { parameter: "timeout", .. })
        ));
    }

    #[test]
    fn steps_must_fit_the_index_width() {
        assert!(chain_builder().index_width(2).total_steps(99).build().is_ok());
        assert!(matches!(
            chain_builder().index_width(2).total_steps(100).build(),
            Err(ConfigError::Invalid { parameter: "total_steps", .. })
        ));
    }

    #[test]
    fn prefix_with_separator_is_rejected() {
        assert!(matches!(
            chain_builder().prefix("runs/state").build(),
            Err(ConfigError::Invalid { parameter: "prefix", .. })
        ));
        assert!(chain_builder().prefix("").build().is_err());
    }

    #[test]
    fn engine_command_builds_invocation_with_flag_and_input() {
        let engine = EngineCommand::parse("mpirun -np 8 lmp")
            .unwrap()
            .with_input_flag("-in")
            .with_env("OMP_NUM_THREADS", "4");
        let invocation = engine.invocation(Path::new("runs/input_0003.in"));
        assert_eq!(invocation.program, "mpirun");
        assert_eq!(
            invocation.args,
            vec!["-np", "8", "lmp", "-in", "runs/input_0003.in"]
        );
        assert_eq!(invocation.env, vec![("OMP_NUM_THREADS".to_string(), "4".to_string())]);

        let bare = EngineCommand::new("cp2k.ssmp").with_input_flag("");
        assert_eq!(bare.invocation(Path::new("a.inp")).args, vec!["a.inp"]);
        assert!(EngineCommand::parse("   ").is_err());
    }

    #[test]
    fn retry_policy_counts_attempts() {
        assert_eq!(RetryPolicy::Abort.max_attempts(), 1);
        assert_eq!(RetryPolicy::from_max_retries(0), RetryPolicy::Abort);
        assert_eq!(RetryPolicy::from_max_retries(2).max_attempts(), 3);
    }

    fn coupling_builder() -> CouplingConfigBuilder {
        CouplingConfigBuilder::new()
            .molecules(49, 64)
            .base_molecule(49)
            .atoms_per_molecule(173)
            .state_a("GACA", PathBuf::from("template_GACA.inp"))
            .state_b("GACB", None)
            .coupling_template(PathBuf::from("template_coupling.inp"))
            .engine(EngineCommand::new("cp2k.ssmp").with_input_flag("-i"))
    }

    #[test]
    fn coupling_state_b_falls_back_to_state_a_template() {
        let config = coupling_builder().build().unwrap();
        assert_eq!(config.state_b.template, PathBuf::from("template_GACA.inp"));
        assert_eq!(config.summary_path, Path::new(".").join(DEFAULT_SUMMARY_FILE));
    }

    #[test]
    fn coupling_offsets_are_signed() {
        let config = coupling_builder().molecules(45, 55).build().unwrap();
        assert_eq!(config.atom_offset(49), 0);
        assert_eq!(config.atom_offset(50), 173);
        assert_eq!(config.atom_offset(45), -692);
        assert_eq!(config.molecules().count(), 11);
    }

    #[test]
    fn coupling_rejects_empty_range_and_duplicate_labels() {
        assert!(matches!(
            coupling_builder().molecules(10, 9).build(),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            coupling_builder().state_b("gaca", None).build(),
            Err(ConfigError::Invalid { parameter: "state_b", .. })
        ));
    }

    #[test]
    fn prepare_extract_path_defaults_next_to_output() {
        let config = PrepareConfigBuilder::new()
            .input_pdb(PathBuf::from("in/system.pdb"))
            .output_pdb(PathBuf::from("out/system_processed.pdb"))
            .mol2_template(PathBuf::from("center1.mol2"))
            .build()
            .unwrap();
        assert_eq!(config.extract_path, PathBuf::from("out/extracted_oligomer.pdb"));
        assert_eq!(config.options, RelabelOptions::default());
    }

    #[test]
    fn prepare_refuses_to_overwrite_its_input() {
        let result = PrepareConfigBuilder::new()
            .input_pdb(PathBuf::from("a.pdb"))
            .output_pdb(PathBuf::from("a.pdb"))
            .mol2_template(PathBuf::from("m.mol2"))
            .build();
        assert!(result.is_err());
    }
}
