//! Worker process command configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;

/// Command line for the isolated interpreter worker.
///
/// The worker is invoked as
/// `program [args..] [--timeout=SECS] [--tmp=DIR] [target]` and reads the
/// prepared snippet from its standard input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerCommand {
    pub program: PathBuf,

    /// Fixed leading arguments, before the generated ones.
    #[serde(default)]
    pub args: Vec<String>,

    /// Fixed target script passed as the final argument.
    #[serde(default)]
    pub target: Option<PathBuf>,

    /// Scratch directory handed to the worker (`--tmp=`); also used for
    /// spooling the worker's input.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Pass the deadline down to the worker as `--timeout=SECS`.
    #[serde(default)]
    pub pass_timeout: bool,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            target: None,
            temp_dir: None,
            pass_timeout: false,
        }
    }

    /// A restricted-interpreter worker with the full argument convention.
    pub fn sandboxed_interpreter(
        program: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            target: Some(target.into()),
            temp_dir: Some(temp_dir.into()),
            pass_timeout: true,
        }
    }

    /// A plain `sh` worker that executes the snippet from stdin.
    ///
    /// Offers no isolation beyond the process boundary; only suitable for
    /// local experiments and the test suites.
    pub fn shell() -> Self {
        Self::new("sh")
    }

    /// Assemble the argv for one run.
    pub fn build(&self, timeout: Option<Duration>) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if self.pass_timeout {
            if let Some(limit) = timeout {
                command.arg(format!("--timeout={}", limit.as_secs()));
            }
        }
        if let Some(dir) = &self.temp_dir {
            command.arg(format!("--tmp={}", dir.display()));
        }
        if let Some(target) = &self.target {
            command.arg(target);
        }
        command
    }
}
