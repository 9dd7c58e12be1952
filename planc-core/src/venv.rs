//! Virtual environment activation
//!
//! Activation is computed as a list of [`EnvChange`]s and applied through an
//! [`EnvGuard`]. Dropping the guard restores every touched variable, so the
//! environment is deactivated on every exit path of the caller.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::LaunchError;

#[cfg(windows)]
pub const BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
pub const BIN_DIR: &str = "bin";

/// A single variable change. `value: None` removes the variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvChange {
    pub key: OsString,
    pub value: Option<OsString>,
}

impl EnvChange {
    pub fn set(key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn remove(key: impl Into<OsString>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }
}

/// An isolated environment directory
#[derive(Debug, Clone)]
pub struct VirtualEnv {
    root: PathBuf,
    bin_dir: PathBuf,
}

impl VirtualEnv {
    /// Locate a virtual environment. The directory and its executable
    /// directory must both exist.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, LaunchError> {
        let root = root.as_ref();
        let bin_dir = root.join(BIN_DIR);
        if !bin_dir.is_dir() {
            return Err(LaunchError::VenvNotFound {
                path: root.to_path_buf(),
                bin: BIN_DIR,
            });
        }

        // VIRTUAL_ENV is conventionally absolute
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        let bin_dir = root.join(BIN_DIR);
        Ok(Self { root, bin_dir })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Compute the changes that activate this environment on top of
    /// `current_path`. Does not touch the process environment.
    pub fn activation(
        &self,
        current_path: Option<&OsStr>,
        prompt: Option<&str>,
    ) -> Result<Vec<EnvChange>, LaunchError> {
        let mut entries = vec![self.bin_dir.clone()];
        if let Some(path) = current_path {
            entries.extend(env::split_paths(path));
        }
        let path = env::join_paths(entries)?;

        let prompt = prompt.map(str::to_string).unwrap_or_else(|| {
            self.root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        Ok(vec![
            EnvChange::set("VIRTUAL_ENV", self.root.as_os_str()),
            EnvChange::set("VIRTUAL_ENV_PROMPT", prompt),
            EnvChange::set("PATH", path),
            EnvChange::remove("PYTHONHOME"),
        ])
    }

    /// Activate this environment in the current process.
    ///
    /// The caller must not have other threads reading the environment while
    /// the returned guard is alive.
    pub fn activate(&self, prompt: Option<&str>) -> Result<EnvGuard, LaunchError> {
        let current = env::var_os("PATH");
        let changes = self.activation(current.as_deref(), prompt)?;
        debug!("Activating virtual environment at {}", self.root.display());
        Ok(EnvGuard::apply(changes))
    }
}

/// Restores the process environment to its state before [`EnvGuard::apply`]
/// when dropped.
#[must_use = "the environment is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct EnvGuard {
    saved: Vec<(OsString, Option<OsString>)>,
}

impl EnvGuard {
    /// Apply `changes`, remembering the prior value of each key.
    pub fn apply(changes: Vec<EnvChange>) -> Self {
        let mut saved = Vec::with_capacity(changes.len());
        for change in changes {
            saved.push((change.key.clone(), env::var_os(&change.key)));
            match change.value {
                Some(value) => env::set_var(&change.key, value),
                None => env::remove_var(&change.key),
            }
        }
        Self { saved }
    }

    /// Keys touched by this guard, in application order.
    pub fn keys(&self) -> impl Iterator<Item = &OsStr> {
        self.saved.iter().map(|(key, _)| key.as_os_str())
    }

    /// Restore now (deactivate).
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // Reverse order so a key changed twice ends up at its original value
        for (key, prior) in self.saved.drain(..).rev() {
            match prior {
                Some(value) => env::set_var(&key, value),
                None => env::remove_var(&key),
            }
        }
        debug!("Virtual environment deactivated");
    }
}
