//! Supervised execution of the external simulation program.
//!
//! Workflows never spawn processes directly; they go through [`EngineRunner`], so tests can
//! substitute an in-process fake. [`ProcessRunner`] is the real implementation: it launches
//! the program with a null stdin, optionally redirects stdout and stderr into a file, and
//! polls the child until it exits, the deadline passes, or cancellation is requested.

use super::cancel::CancellationToken;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Process exceeded the time limit of {0:?}")]
    Timeout(Duration),
    #[error("Process was cancelled")]
    Cancelled,
    #[error("I/O error while supervising process: {0}")]
    Io(#[from] io::Error),
}

/// A fully specified program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
    /// File receiving both stdout and stderr; the streams are inherited when unset.
    pub capture: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: None,
            capture: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn capture_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.capture = Some(path.into());
        self
    }

    /// Human-readable rendering for logs; not meant to be fed back to a shell.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub success: bool,
    pub elapsed: Duration,
}

impl ExitReport {
    fn from_status(status: ExitStatus, elapsed: Duration) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
            elapsed,
        }
    }
}

/// Runs an [`Invocation`] to completion.
///
/// Implementations must block until the program has terminated and must not leave it running
/// when they return, whatever the outcome.
pub trait EngineRunner {
    fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<ExitReport, ProcessError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
    poll_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn spawn(&self, invocation: &Invocation) -> Result<ChildGuard, ProcessError> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).stdin(Stdio::null());
        command.envs(invocation.env.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }
        if let Some(capture) = &invocation.capture {
            let (stdout, stderr) = open_capture(capture)?;
            command.stdout(stdout).stderr(stderr);
        }
        // Own process group, so termination also reaches engines forked by `mpirun` and the like.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        command
            .spawn()
            .map(ChildGuard)
            .map_err(|source| ProcessError::Launch {
                program: invocation.program.clone(),
                source,
            })
    }
}

impl EngineRunner for ProcessRunner {
    fn run(
        &self,
        invocation: &Invocation,
        cancel: &CancellationToken,
    ) -> Result<ExitReport, ProcessError> {
        debug!(command = %invocation.command_line(), "Launching engine.");
        let started = Instant::now();
        let mut child = self.spawn(invocation)?;

        loop {
            if let Some(status) = child.0.try_wait()? {
                let report = ExitReport::from_status(status, started.elapsed());
                debug!(code = ?report.code, elapsed = ?report.elapsed, "Engine exited.");
                return Ok(report);
            }
            if cancel.is_cancelled() {
                warn!(command = %invocation.command_line(), "Cancellation requested; terminating engine.");
                return Err(ProcessError::Cancelled);
            }
            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    warn!(command = %invocation.command_line(), ?limit, "Engine exceeded its time limit; terminating.");
                    return Err(ProcessError::Timeout(limit));
                }
            }
            thread::sleep(self.poll_interval);
        }
    }
}

fn open_capture(path: &Path) -> io::Result<(Stdio, Stdio)> {
    let file = File::create(path)?;
    let clone = file.try_clone()?;
    Ok((Stdio::from(file), Stdio::from(clone)))
}

/// Owns a running child and reaps it when dropped, killing its whole process group first if
/// it is still alive.
struct ChildGuard(Child);

impl ChildGuard {
    #[cfg(unix)]
    fn terminate(&mut self) {
        let pgid = self.0.id() as libc::pid_t;
        // SAFETY: killpg only sends a signal; it has no memory-safety preconditions.
        if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
            return;
        }
        warn!(pgid, error = %io::Error::last_os_error(), "Failed to kill engine process group.");
        if let Err(e) = self.0.kill() {
            warn!(pid = self.0.id(), error = %e, "Failed to kill engine process.");
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) {
        if let Err(e) = self.0.kill() {
            warn!(pid = self.0.id(), error = %e, "Failed to kill engine process.");
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Ok(None) = self.0.try_wait() {
            self.terminate();
        }
        let _ = self.0.wait();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    fn shell(script: &str) -> Invocation {
        Invocation::new("sh").arg("-c").arg(script)
    }

    fn fast_runner(timeout: Option<Duration>) -> ProcessRunner {
        ProcessRunner::new(timeout).with_poll_interval(Duration::from_millis(10))
    }

    #[test]
    fn successful_exit_is_reported() {
        let report = fast_runner(None)
            .run(&shell("exit 0"), &CancellationToken::new())
            .unwrap();
        assert!(report.success);
        assert_eq!(report.code, Some(0));
    }

    #[test]
    fn nonzero_exit_code_is_reported_not_raised() {
        let report = fast_runner(None)
            .run(&shell("exit 3"), &CancellationToken::new())
            .unwrap();
        assert!(!report.success);
        assert_eq!(report.code, Some(3));
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let result = fast_runner(None).run(
            &Invocation::new("definitely-not-an-md-engine-7f3a"),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(ProcessError::Launch { .. })));
    }

    #[test]
    fn long_running_program_is_killed_at_the_deadline() {
        let started = Instant::now();
        let result = fast_runner(Some(Duration::from_millis(200)))
            .run(&shell("sleep 30"), &CancellationToken::new());
        assert!(matches!(result, Err(ProcessError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn cancellation_terminates_the_program() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });
        let started = Instant::now();
        let result = fast_runner(None).run(&shell("sleep 30"), &token);
        handle.join().unwrap();
        assert!(matches!(result, Err(ProcessError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    /// Live (non-zombie) processes whose process group is `pgid`.
    #[cfg(target_os = "linux")]
    fn live_group_members(pgid: u32) -> Vec<u32> {
        let mut members = Vec::new();
        for entry in fs::read_dir("/proc").unwrap().flatten() {
            let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            let Ok(stat) = fs::read_to_string(entry.path().join("stat")) else {
                continue;
            };
            // Fields after the parenthesised command name: state, ppid, pgrp, ...
            let Some((_, rest)) = stat.rsplit_once(')') else {
                continue;
            };
            let fields: Vec<&str> = rest.split_whitespace().collect();
            if fields.len() > 2 && fields[0] != "Z" && fields[2] == pgid.to_string() {
                members.push(pid);
            }
        }
        members
    }

    #[cfg(target_os = "linux")]
    fn assert_group_terminated(pid_file: &Path) {
        let pgid: u32 = fs::read_to_string(pid_file).unwrap().trim().parse().unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut survivors = live_group_members(pgid);
        while !survivors.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
            survivors = live_group_members(pgid);
        }
        assert!(survivors.is_empty(), "engine processes survived: {:?}", survivors);
    }

    /// A launcher shell that forks the long-running "engine" and waits on it.
    #[cfg(target_os = "linux")]
    fn launcher(pid_file: &Path) -> Invocation {
        shell(&format!(
            "echo $$ > '{}'; sleep 31.4159 & wait",
            pid_file.display()
        ))
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn timeout_kills_processes_forked_by_the_launcher() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("launcher.pid");
        let result = fast_runner(Some(Duration::from_millis(300)))
            .run(&launcher(&pid_file), &CancellationToken::new());
        assert!(matches!(result, Err(ProcessError::Timeout(_))));
        assert_group_terminated(&pid_file);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn cancellation_kills_processes_forked_by_the_launcher() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("launcher.pid");
        let token = CancellationToken::new();
        let trigger = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            trigger.cancel();
        });
        let result = fast_runner(None).run(&launcher(&pid_file), &token);
        handle.join().unwrap();
        assert!(matches!(result, Err(ProcessError::Cancelled)));
        assert_group_terminated(&pid_file);
    }

    #[test]
    fn output_is_captured_and_environment_and_directory_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("screen.out");
        let mut invocation = shell("echo \"threads=$OMP_NUM_THREADS\"; pwd; echo oops >&2")
            .in_dir(dir.path())
            .capture_to(&capture);
        invocation.env.push(("OMP_NUM_THREADS".into(), "16".into()));

        let report = fast_runner(None)
            .run(&invocation, &CancellationToken::new())
            .unwrap();
        assert!(report.success);

        let text = fs::read_to_string(&capture).unwrap();
        assert!(text.contains("threads=16"));
        assert!(text.contains("oops"));
        let dir_name = dir.path().file_name().unwrap().to_str().unwrap();
        assert!(text.contains(dir_name));
    }

    #[test]
    fn command_line_joins_program_and_arguments() {
        let invocation = Invocation::new("lmp").arg("-in").arg("input_0000.in");
        assert_eq!(invocation.command_line(), "lmp -in input_0000.in");
    }
}
