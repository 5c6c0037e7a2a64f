//! Deterministic, collision-free file names for every artifact of a chain.
//!
//! State artifacts are numbered by the number of completed segments: state `0` is the initial
//! configuration, iteration `i` reads state `i` and writes state `i + 1`. Every per-iteration
//! file carries the iteration index. Indices are zero-padded to a fixed width so a plain
//! directory listing sorts in chain order.

use std::path::{Path, PathBuf};

pub const DEFAULT_PREFIX: &str = "state";
pub const DEFAULT_INDEX_WIDTH: usize = 4;

const STATE_EXTENSION: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNaming {
    work_dir: PathBuf,
    prefix: String,
    width: usize,
}

impl ArtifactNaming {
    pub fn new(work_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            prefix: prefix.into(),
            width: DEFAULT_INDEX_WIDTH,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of distinct indices representable at the configured width.
    pub fn capacity(&self) -> usize {
        u32::try_from(self.width)
            .ok()
            .and_then(|w| 10usize.checked_pow(w))
            .unwrap_or(usize::MAX)
    }

    pub fn state_path(&self, segment: usize) -> PathBuf {
        self.indexed(&self.prefix, segment, STATE_EXTENSION)
    }

    pub fn input_path(&self, iteration: usize) -> PathBuf {
        self.indexed("input", iteration, "in")
    }

    pub fn log_path(&self, iteration: usize) -> PathBuf {
        self.indexed("log", iteration, "lammps")
    }

    pub fn dump_path(&self, iteration: usize) -> PathBuf {
        self.indexed("traj", iteration, "lammpstrj")
    }

    pub fn screen_path(&self, iteration: usize) -> PathBuf {
        self.indexed("screen", iteration, "out")
    }

    pub fn marker_path(&self) -> PathBuf {
        self.work_dir.join(format!("{}.progress.toml", self.prefix))
    }

    /// Recovers the segment index from a state artifact name produced by [`Self::state_path`].
    pub fn state_index(&self, path: &Path) -> Option<usize> {
        let name = path.file_name()?.to_str()?;
        let digits = name
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix('_')?
            .strip_suffix(STATE_EXTENSION)?
            .strip_suffix('.')?;
        if digits.len() < self.width || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    fn indexed(&self, stem: &str, index: usize, extension: &str) -> PathBuf {
        self.work_dir.join(format!(
            "{stem}_{index:0width$}.{extension}",
            width = self.width
        ))
    }
}
