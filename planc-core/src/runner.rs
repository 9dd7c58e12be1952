//! Web-app runner process
//!
//! Starts the runner (`streamlit run <script>` by default) and waits for it.
//! Ctrl+C is intercepted so the launcher outlives the child: the first
//! interrupt lets the child shut down on its own, the second kills it.

use std::env;
use std::ffi::OsStr;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::LaunchError;

/// Exit code reported when the runner was stopped by an interrupt
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// How the runner process ended
#[derive(Debug, Clone, Copy)]
pub struct LaunchOutcome {
    pub status: ExitStatus,
    /// At least one Ctrl+C arrived while the runner was alive
    pub interrupted: bool,
}

impl LaunchOutcome {
    /// Exit code for the launcher process.
    pub fn exit_code(&self) -> i32 {
        match self.status.code() {
            Some(code) => code,
            None if self.interrupted => INTERRUPTED_EXIT_CODE,
            None => 1,
        }
    }
}

/// A runner invocation: `<program> <args...> <script>`
#[derive(Debug, Clone)]
pub struct Runner {
    program: String,
    args: Vec<String>,
    script: PathBuf,
    stdout_to_stderr: bool,
}

impl Runner {
    pub fn new(program: impl Into<String>, args: Vec<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            script: script.into(),
            stdout_to_stderr: false,
        }
    }

    /// Send the runner's stdout to our stderr, keeping stdout for results.
    pub fn stdout_to_stderr(mut self, redirect: bool) -> Self {
        self.stdout_to_stderr = redirect;
        self
    }

    /// Full argument list passed to the program.
    pub fn argv(&self) -> Vec<&OsStr> {
        self.args
            .iter()
            .map(OsStr::new)
            .chain(std::iter::once(self.script.as_os_str()))
            .collect()
    }

    /// Find the program on `path`.
    pub fn resolve(&self, path: Option<&OsStr>) -> Result<PathBuf, LaunchError> {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        which::which_in(&self.program, path, cwd).map_err(|source| LaunchError::RunnerNotFound {
            program: self.program.clone(),
            source,
        })
    }

    /// Start the runner against the current PATH and wait for it to exit.
    pub async fn run(&self) -> Result<LaunchOutcome, LaunchError> {
        let program = self.resolve(env::var_os("PATH").as_deref())?;
        info!("Starting {} {:?}", program.display(), self.argv());

        let mut command = Command::new(&program);
        command.args(self.argv());
        if self.stdout_to_stderr {
            command.stdout(Stdio::from(io::stderr()));
        }
        let mut child = command
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: program.display().to_string(),
                source,
            })?;
        debug!("Runner started with pid {:?}", child.id());

        let mut interrupts = 0u32;
        let mut listening = true;
        let status = loop {
            tokio::select! {
                status = child.wait() => break status.map_err(LaunchError::Wait)?,
                signal = tokio::signal::ctrl_c(), if listening => match signal {
                    Ok(()) => {
                        interrupts += 1;
                        if interrupts == 1 {
                            info!(
                                "Interrupt received, waiting for the runner to stop \
                                 (Ctrl+C again to force)"
                            );
                        } else {
                            warn!("Second interrupt, killing the runner");
                            if let Err(e) = child.start_kill() {
                                warn!("Failed to kill the runner: {}", e);
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Cannot listen for Ctrl+C: {}", e);
                        listening = false;
                    }
                },
            }
        };

        info!("Runner exited with {}", status);
        Ok(LaunchOutcome {
            status,
            interrupted: interrupts > 0,
        })
    }
}
