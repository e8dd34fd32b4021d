//! Run a generator command with the output path appended.

use crate::error::GetExecError;

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Executes generator commands directly (never through a shell).
///
/// stdin is closed and stdout is captured: the special remote talks to
/// git-annex over both, so a child must never touch them. stderr is inherited.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    workdir: Option<PathBuf>,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run commands from `dir` instead of the current directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: Some(dir.into()),
        }
    }

    /// Execute `command target`. Only the exit status is checked; the file
    /// left at `target` (if any) is not inspected.
    pub fn generate(&self, command: &[String], target: &Path) -> Result<(), GetExecError> {
        let Some((program, args)) = command.split_first() else {
            return Err(GetExecError::GeneratorLaunch {
                program: String::new(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "empty command"),
            });
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        info!(?command, target = %target.display(), "executing generator");
        let output = cmd.output().map_err(|source| GetExecError::GeneratorLaunch {
            program: program.clone(),
            source,
        })?;

        if !output.stdout.is_empty() {
            info!(stdout = %String::from_utf8_lossy(&output.stdout), "generator output");
        }

        if !output.status.success() {
            return Err(GetExecError::GenerationFailed {
                command: command.to_vec(),
                code: output.status.code(),
            });
        }
        debug!(target = %target.display(), "generator succeeded");
        Ok(())
    }
}
