/// Values used when neither the config file nor the command line sets them.
pub struct DefaultsConfig {
    pub chain_engine: &'static str,
    pub chain_input_flag: &'static str,
    pub coupling_engine: &'static str,
    pub coupling_input_flag: &'static str,
    pub max_retries: u32,
    pub resume: bool,
    pub remove_inputs: bool,
    pub capture_output: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            chain_engine: "lmp",
            chain_input_flag: "-in",
            coupling_engine: "cp2k.ssmp",
            coupling_input_flag: "-i",
            max_retries: 0,
            resume: true,
            remove_inputs: false,
            capture_output: true,
        }
    }
}
