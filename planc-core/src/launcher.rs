//! Launcher
//!
//! Prints the banner, activates the virtual environment, runs the web app
//! and deactivates the environment once the app has exited.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::banner;
use crate::config::LauncherConfig;
use crate::error::LaunchError;
use crate::runner::{LaunchOutcome, Runner};
use crate::venv::VirtualEnv;

pub struct Launcher {
    config: LauncherConfig,
    base_dir: PathBuf,
    show_banner: bool,
}

impl Launcher {
    /// Relative paths in `config` are resolved against `base_dir`.
    pub fn new(config: LauncherConfig, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            base_dir: base_dir.into(),
            show_banner: true,
        }
    }

    /// Keep stdout for other output: skip the banner and send the runner's
    /// stdout to stderr.
    pub fn quiet(mut self) -> Self {
        self.show_banner = false;
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Run the whole launch sequence, blocking until the runner exits.
    pub fn launch(&self) -> Result<LaunchOutcome, LaunchError> {
        let script = self.resolve(&self.config.script);

        if self.show_banner {
            // A closed stdout should not keep the app from starting
            let shown = self.config.script.to_string_lossy();
            if let Err(e) = banner::print(&shown, self.config.color) {
                warn!("Failed to print banner: {}", e);
            }
        }

        let venv = VirtualEnv::open(self.resolve(&self.config.venv_dir))?;
        if !script.is_file() {
            return Err(LaunchError::ScriptNotFound { path: script });
        }

        let guard = venv.activate(self.config.prompt.as_deref())?;
        info!("Activated {}", venv.root().display());

        let runner = Runner::new(
            self.config.runner.clone(),
            self.config.runner_args.clone(),
            script,
        )
        .stdout_to_stderr(!self.show_banner);

        // The runtime only lives while the environment is active and is gone
        // before the guard restores it
        let outcome = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(LaunchError::Runtime)
            .and_then(|runtime| runtime.block_on(runner.run()));

        guard.release();
        info!("Deactivated {}", venv.root().display());

        outcome
    }
}
