//! Toolchain execution
//!
//! Runs the `configure` / `make` / `make install` sequence of an autoconf
//! project. It's the equivalent of:
//! ```bash
//! cd _deps/onig-6.9.4
//! ./configure CFLAGS=-fPIC --prefix=$PWD/../onig-install-6.9.4
//! make
//! make install
//! ```
//! with the first failing step ending the sequence.

use super::types::BuildCommand;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};

/// Number of trailing output lines kept in a quiet-mode failure.
const OUTPUT_TAIL_LINES: usize = 40;

#[derive(Debug, Error)]
pub enum BuildCommandError {
    #[error(
        "`{command}` failed with exit code {} in {}{}",
        exit_code.map_or_else(|| "unknown".to_string(), |c| c.to_string()),
        working_dir.display(),
        output_suffix(output.as_deref())
    )]
    Failed {
        command: String,
        exit_code: Option<i32>,
        working_dir: PathBuf,
        output: Option<String>,
    },

    #[error("Failed to run `{command}` in {}: {source}", working_dir.display())]
    Spawn {
        command: String,
        working_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn output_suffix(output: Option<&str>) -> String {
    output
        .filter(|o| !o.is_empty())
        .map(|o| format!("\n--- output ---\n{o}"))
        .unwrap_or_default()
}

impl BuildCommandError {
    /// The command that failed, as logged
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::Failed { command, .. } | Self::Spawn { command, .. } => command,
        }
    }

    /// Exit code, when the command ran and exited normally
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { exit_code, .. } => *exit_code,
            Self::Spawn { .. } => None,
        }
    }

    /// Directory the command ran in
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        match self {
            Self::Failed { working_dir, .. } | Self::Spawn { working_dir, .. } => working_dir,
        }
    }
}

/// Runs build commands in order, stopping at the first failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolchainRunner {
    /// Capture child output instead of passing it through
    quiet: bool,
}

impl ToolchainRunner {
    /// Create a runner. In quiet mode child output is captured and only shown
    /// when a command fails.
    #[must_use]
    pub const fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Run `commands` in `working_dir` with `env` set on top of the inherited
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`BuildCommandError`] for the first command that cannot be
    /// started or exits unsuccessfully; later commands are not run.
    pub fn run(
        &self,
        working_dir: &Path,
        commands: &[BuildCommand],
        env: &BTreeMap<String, String>,
    ) -> Result<(), BuildCommandError> {
        for command in commands {
            self.run_one(working_dir, command, env)?;
        }
        Ok(())
    }

    fn run_one(
        &self,
        working_dir: &Path,
        command: &BuildCommand,
        env: &BTreeMap<String, String>,
    ) -> Result<(), BuildCommandError> {
        let rendered = command.to_string();
        info!(cwd = %working_dir.display(), "Executing: {rendered}");

        let mut cmd = Command::new(command.program());
        cmd.args(command.args())
            .current_dir(working_dir)
            .envs(env)
            .stdin(Stdio::null());

        if !env.is_empty() {
            debug!(?env, "environment overlay");
        }

        if self.quiet {
            let output = cmd.output().map_err(|source| BuildCommandError::Spawn {
                command: rendered.clone(),
                working_dir: working_dir.to_path_buf(),
                source,
            })?;

            if output.status.success() {
                return Ok(());
            }

            let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
            captured.push_str(&String::from_utf8_lossy(&output.stderr));
            debug!(output = %captured, "command output");

            Err(BuildCommandError::Failed {
                command: rendered,
                exit_code: output.status.code(),
                working_dir: working_dir.to_path_buf(),
                output: Some(tail(&captured, OUTPUT_TAIL_LINES)),
            })
        } else {
            // Stdout belongs to the caller's own output, so the child's goes to stderr
            let status = cmd
                .stdout(std::io::stderr())
                .status().map_err(|source| BuildCommandError::Spawn {
                command: rendered.clone(),
                working_dir: working_dir.to_path_buf(),
                source,
            })?;

            if status.success() {
                Ok(())
            } else {
                Err(BuildCommandError::Failed {
                    command: rendered,
                    exit_code: status.code(),
                    working_dir: working_dir.to_path_buf(),
                    output: None,
                })
            }
        }
    }
}

// Last `n` lines of `text`
fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines.get(start..).unwrap_or(&[]).join("\n")
}
