//! Batch-script generation and job launching for HPC schedulers.
//!
//! A [`LaunchOptions`] value describes the allocation; [`make_batch_script`]
//! turns it into a Slurm, LSF or plain `mpirun` script tuned for the target
//! system, and [`run`] writes the experiment next to it and writes, runs
//! or submits the script.

pub mod config;
pub mod error;
pub mod launcher;
pub mod options;
pub mod platform;
pub mod scheduler;
pub mod tuning;

pub use config::LauncherConfig;
pub use error::{LaunchError, LaunchResult};
pub use launcher::{execute, make_batch_script, prepare, profiling_args, run, Action};
pub use options::{LaunchOptions, Scheduler};
pub use platform::{detect_system, Platform, Topology, PLATFORMS};
pub use scheduler::{BatchScript, LsfScript, ShellScript, SlurmScript};
pub use tuning::distconv_environment;
