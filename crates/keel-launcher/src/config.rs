//! Launcher configuration file support.
//!
//! Settings are read from `~/.keel/config.toml` and then `./.keelrc`; the
//! local file overrides the global one.

use crate::error::{LaunchError, LaunchResult};
use crate::options::{LaunchOptions, Scheduler};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherConfig {
    #[serde(default)]
    pub scheduler: Option<Scheduler>,

    #[serde(default)]
    pub system: Option<String>,

    #[serde(default)]
    pub partition: Option<String>,

    #[serde(default)]
    pub account: Option<String>,

    /// Path of the training executable.
    #[serde(default)]
    pub trainer_executable: Option<String>,

    #[serde(default)]
    pub procs_per_node: Option<u32>,

    #[serde(default)]
    pub log_level: Option<String>,

    /// Exported in every batch script.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl LauncherConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> LaunchResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LaunchError::Config { path: path.to_path_buf(), message: e.to_string() })?;
        toml::from_str(&content).map_err(|e| LaunchError::Config { path: path.to_path_buf(), message: e.to_string() })
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> LaunchResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LaunchError::Config { path: path.to_path_buf(), message: e.to_string() })?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `~/.keel/config.toml`, if a home directory is known.
    pub fn default_global_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".keel").join("config.toml"))
    }

    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".keelrc")
    }

    /// Load the global then the local configuration. Missing files are
    /// skipped; a file that cannot be read or parsed is an error.
    pub fn discover_and_load() -> LaunchResult<Self> {
        let candidates = Self::default_global_path().into_iter().chain(std::iter::once(Self::default_local_path()));
        Self::load_layered(candidates)
    }

    /// Merge the files in `paths` in order, later files winning.
    pub fn load_layered(paths: impl IntoIterator<Item = PathBuf>) -> LaunchResult<Self> {
        let mut config = Self::default();
        for path in paths {
            if !path.exists() {
                continue;
            }
            config.merge(&Self::load_from_file(&path)?);
            tracing::debug!(path = %path.display(), "loaded configuration file");
        }
        Ok(config)
    }

    /// Values set in `other` override values in `self`.
    pub fn merge(&mut self, other: &Self) {
        if other.scheduler.is_some() {
            self.scheduler = other.scheduler;
        }
        if let Some(ref system) = other.system {
            self.system = Some(system.clone());
        }
        if let Some(ref partition) = other.partition {
            self.partition = Some(partition.clone());
        }
        if let Some(ref account) = other.account {
            self.account = Some(account.clone());
        }
        if let Some(ref exe) = other.trainer_executable {
            self.trainer_executable = Some(exe.clone());
        }
        if other.procs_per_node.is_some() {
            self.procs_per_node = other.procs_per_node;
        }
        if let Some(ref log_level) = other.log_level {
            self.log_level = Some(log_level.clone());
        }
        self.environment.extend(other.environment.clone());
    }

    /// Fill `options` with the configured values. Environment entries
    /// already present in `options` are kept.
    pub fn apply(&self, mut options: LaunchOptions) -> LaunchOptions {
        if let Some(scheduler) = self.scheduler {
            options.scheduler = scheduler;
        }
        if let Some(ref system) = self.system {
            options.system = Some(system.clone());
        }
        if let Some(ref partition) = self.partition {
            options.partition = Some(partition.clone());
        }
        if let Some(ref account) = self.account {
            options.account = Some(account.clone());
        }
        if let Some(ref exe) = self.trainer_executable {
            options.trainer_executable = exe.clone();
        }
        if let Some(procs) = self.procs_per_node {
            options.procs_per_node = procs;
        }
        for (key, value) in &self.environment {
            options.environment.entry(key.clone()).or_insert_with(|| value.clone());
        }
        options
    }
}
