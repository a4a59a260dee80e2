//! Launch options and scheduler selection.

use crate::error::{LaunchError, LaunchResult};
use crate::platform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default training executable.
pub const DEFAULT_TRAINER: &str = "lbann";

/// Default job name.
pub const DEFAULT_JOB_NAME: &str = "keel";

/// Batch-script file name inside the work directory.
pub const SCRIPT_FILE: &str = "batch.sh";

/// Job scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheduler {
    /// Slurm (`sbatch`/`srun`).
    #[default]
    Slurm,
    /// IBM Spectrum LSF (`bsub`/`jsrun`).
    Lsf,
    /// No scheduler; `mpirun` in a plain shell.
    #[serde(alias = "mpirun", alias = "openmpi")]
    Shell,
}

impl Scheduler {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Scheduler::Slurm => "slurm",
            Scheduler::Lsf => "lsf",
            Scheduler::Shell => "shell",
        }
    }
}

impl fmt::Display for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheduler {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "slurm" => Ok(Scheduler::Slurm),
            "lsf" => Ok(Scheduler::Lsf),
            "shell" | "mpirun" | "openmpi" => Ok(Scheduler::Shell),
            _ => Err(LaunchError::UnknownScheduler(s.to_string())),
        }
    }
}

/// Options for building and launching a batch script.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
    /// Directory holding the script, logs and experiment file. Defaults to
    /// `<cwd>/<timestamp>_<job_name>`.
    pub work_dir: Option<PathBuf>,
    /// Defaults to `<work_dir>/batch.sh`.
    pub script_file: Option<PathBuf>,
    pub nodes: u32,
    pub procs_per_node: u32,
    /// Wall-clock limit in minutes.
    pub time_limit: Option<u32>,
    pub scheduler: Scheduler,
    pub job_name: String,
    pub system: Option<String>,
    pub partition: Option<String>,
    pub account: Option<String>,
    pub reservation: Option<String>,
    /// Parallel launcher program; `srun`, `jsrun` or `mpirun` by default.
    pub launcher: Option<String>,
    pub launcher_args: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub trainer_executable: String,
    pub trainer_args: Vec<String>,
    pub overwrite_script: bool,
    pub setup_only: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            work_dir: None,
            script_file: None,
            nodes: 1,
            procs_per_node: 1,
            time_limit: None,
            scheduler: Scheduler::default(),
            job_name: DEFAULT_JOB_NAME.to_string(),
            system: None,
            partition: None,
            account: None,
            reservation: None,
            launcher: None,
            launcher_args: Vec::new(),
            environment: BTreeMap::new(),
            trainer_executable: DEFAULT_TRAINER.to_string(),
            trainer_args: Vec::new(),
            overwrite_script: false,
            setup_only: false,
        }
    }
}

impl LaunchOptions {
    /// Options with defaults for `system` from the platform table.
    ///
    /// Unknown systems keep the generic defaults.
    pub fn for_system(system: impl Into<String>) -> Self {
        let system = system.into();
        let mut options = Self::default();
        if let Some(platform) = platform::lookup(&system) {
            options.scheduler = platform.scheduler;
            options.partition = Some(platform.partition.to_string());
            options.procs_per_node = platform.default_procs_per_node();
        }
        options.system = Some(system);
        options
    }

    /// Options for the system this process runs on.
    pub fn detect() -> Self {
        platform::detect_system().map_or_else(Self::default, |system| Self::for_system(system))
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn with_script_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_file = Some(path.into());
        self
    }

    pub fn with_nodes(mut self, nodes: u32) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_procs_per_node(mut self, procs: u32) -> Self {
        self.procs_per_node = procs;
        self
    }

    pub fn with_time_limit(mut self, minutes: u32) -> Self {
        self.time_limit = Some(minutes);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = name.into();
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_reservation(mut self, reservation: impl Into<String>) -> Self {
        self.reservation = Some(reservation.into());
        self
    }

    pub fn with_launcher(mut self, launcher: impl Into<String>) -> Self {
        self.launcher = Some(launcher.into());
        self
    }

    pub fn with_launcher_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.launcher_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.environment.insert(key.into(), value.to_string());
        self
    }

    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment.extend(environment);
        self
    }

    pub fn with_trainer_executable(mut self, exe: impl Into<String>) -> Self {
        self.trainer_executable = exe.into();
        self
    }

    pub fn with_trainer_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trainer_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite_script = overwrite;
        self
    }

    pub fn with_setup_only(mut self, setup_only: bool) -> Self {
        self.setup_only = setup_only;
        self
    }

    pub fn validate(&self) -> LaunchResult<()> {
        if self.nodes == 0 {
            return Err(LaunchError::InvalidOptions("nodes must be at least 1".to_string()));
        }
        if self.procs_per_node == 0 {
            return Err(LaunchError::InvalidOptions("procs_per_node must be at least 1".to_string()));
        }
        if self.trainer_executable.trim().is_empty() {
            return Err(LaunchError::InvalidOptions("trainer executable is empty".to_string()));
        }
        self.total_procs()?;
        Ok(())
    }

    /// Absolute work directory, falling back to a timestamped directory
    /// under the current one.
    pub fn resolved_work_dir(&self) -> LaunchResult<PathBuf> {
        if let Some(dir) = &self.work_dir {
            return absolute(dir);
        }
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        Ok(std::env::current_dir()?.join(format!("{stamp}_{}", self.job_name)))
    }

    /// Absolute script path, `<work_dir>/batch.sh` unless set.
    pub fn resolved_script_file(&self, work_dir: &Path) -> LaunchResult<PathBuf> {
        match &self.script_file {
            Some(path) => absolute(path),
            None => Ok(work_dir.join(SCRIPT_FILE)),
        }
    }

    /// Total number of ranks across all nodes.
    pub fn total_procs(&self) -> LaunchResult<u32> {
        self.nodes.checked_mul(self.procs_per_node).ok_or_else(|| {
            LaunchError::InvalidOptions(format!(
                "{} nodes x {} procs per node exceeds the maximum number of processes",
                self.nodes, self.procs_per_node
            ))
        })
    }
}

// The script runs from its work directory, so relative paths would resolve
// against the wrong base.
fn absolute(path: &Path) -> LaunchResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_parse() {
        assert_eq!("SLURM".parse::<Scheduler>().unwrap(), Scheduler::Slurm);
        assert_eq!("mpirun".parse::<Scheduler>().unwrap(), Scheduler::Shell);
        assert!(matches!("pbs".parse::<Scheduler>(), Err(LaunchError::UnknownScheduler(_))));
    }

    #[test]
    fn test_for_system_uses_platform_defaults() {
        let options = LaunchOptions::for_system("lassen");
        assert_eq!(options.scheduler, Scheduler::Lsf);
        assert_eq!(options.procs_per_node, 4);
        assert_eq!(options.partition.as_deref(), Some("pbatch"));

        let unknown = LaunchOptions::for_system("laptop");
        assert_eq!(unknown.scheduler, Scheduler::Slurm);
        assert_eq!(unknown.system.as_deref(), Some("laptop"));
        assert!(unknown.partition.is_none());
    }

    #[test]
    fn test_builder() {
        let options = LaunchOptions::default()
            .with_nodes(4)
            .with_procs_per_node(2)
            .with_time_limit(90)
            .with_env("OMP_NUM_THREADS", 8)
            .with_trainer_args(["--num_epochs=2"]);
        assert_eq!(options.total_procs().unwrap(), 8);
        assert_eq!(options.environment.get("OMP_NUM_THREADS").map(String::as_str), Some("8"));
        assert_eq!(options.trainer_args, vec!["--num_epochs=2"]);
    }

    #[test]
    fn test_validate() {
        assert!(LaunchOptions::default().validate().is_ok());
        assert!(LaunchOptions::default().with_nodes(0).validate().is_err());
        assert!(LaunchOptions::default().with_trainer_executable(" ").validate().is_err());
    }

    #[test]
    fn test_rank_count_overflow_rejected() {
        let options = LaunchOptions::default().with_nodes(70_000).with_procs_per_node(70_000);
        assert!(matches!(options.total_procs(), Err(LaunchError::InvalidOptions(_))));
        assert!(matches!(options.validate(), Err(LaunchError::InvalidOptions(_))));
        assert!(LaunchOptions::default().with_nodes(65_536).with_procs_per_node(65_535).validate().is_ok());
    }

    #[test]
    fn test_default_work_dir_is_timestamped() {
        let dir = LaunchOptions::default().with_job_name("mnist").resolved_work_dir().unwrap();
        let name = dir.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("_mnist"));
        assert_eq!(name.len(), "YYYYmmdd_HHMMSS_mnist".len());
    }

    #[test]
    fn test_relative_paths_are_absolute() {
        let options = LaunchOptions::default().with_work_dir("job").with_script_file("scripts/run.sh");
        let work_dir = options.resolved_work_dir().unwrap();
        assert!(work_dir.is_absolute());
        assert!(work_dir.ends_with("job"));
        let script = options.resolved_script_file(&work_dir).unwrap();
        assert!(script.is_absolute());
        assert!(script.ends_with("scripts/run.sh"));

        let options = LaunchOptions::default().with_work_dir("/w");
        assert_eq!(options.resolved_script_file(Path::new("/w")).unwrap(), PathBuf::from("/w/batch.sh"));
    }
}
