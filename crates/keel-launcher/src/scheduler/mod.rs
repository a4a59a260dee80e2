//! Scheduler-specific batch scripts.

pub mod lsf;
pub mod script;
pub mod shell;
pub mod slurm;

pub use lsf::LsfScript;
pub use script::{BatchScript, ScriptCore};
pub use shell::ShellScript;
pub use slurm::SlurmScript;
