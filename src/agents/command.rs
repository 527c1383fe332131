use crate::error::{DoctorError, Result};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Captured result of an external command.
///
/// The exit status is kept apart from the output: tools like `npm outdated`
/// exit non-zero while still printing a valid payload, so callers decide
/// per command whether the status matters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Trimmed stdout, or `None` when the command printed nothing.
    pub fn payload(&self) -> Option<&str> {
        let trimmed = self.stdout.trim();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    }

    pub fn ensure_success(&self, command: &str) -> Result<&Self> {
        if self.success() {
            return Ok(self);
        }

        Err(DoctorError::CommandExecution(format!(
            "{} exited with code {}: {}",
            command,
            self.code.map_or_else(|| "none".to_string(), |c| c.to_string()),
            self.stderr.trim()
        )))
    }
}

/// Runs external programs. Only failing to launch the program is an error.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str], dir: &Path) -> Result<CommandOutput>;
}

/// Runs commands as blocking child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str], dir: &Path) -> Result<CommandOutput> {
        debug!(program, args = %args.join(" "), dir = %dir.display(), "running command");

        let output = Command::new(program)
            .current_dir(dir)
            .args(args)
            .output()
            .map_err(|e| {
                DoctorError::CommandExecution(format!(
                    "Failed to execute '{} {}': {e}",
                    program,
                    args.join(" ")
                ))
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
