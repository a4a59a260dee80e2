//! Building batch scripts from launch options and carrying out the job.

use crate::error::LaunchResult;
use crate::options::{LaunchOptions, Scheduler};
use crate::platform;
use crate::scheduler::{BatchScript, LsfScript, ShellScript, SlurmScript};
use crate::tuning;
use keel_schema::experiment::{save_prototext, EXPERIMENT_FILE};
use keel_schema::prost_reflect::DynamicMessage;
use std::fmt;

/// What to do with a prepared script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Persist only.
    Write,
    /// Execute inside the current allocation.
    Run,
    /// Queue with the scheduler.
    Submit,
}

impl Action {
    #[must_use]
    pub fn select(setup_only: bool, has_allocation: bool) -> Self {
        if setup_only {
            Action::Write
        } else if has_allocation {
            Action::Run
        } else {
            Action::Submit
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Write => write!(f, "write"),
            Action::Run => write!(f, "run"),
            Action::Submit => write!(f, "submit"),
        }
    }
}

/// Create the batch script for `options` with platform tuning applied and
/// the environment exported at the top of the body.
pub fn make_batch_script(options: &LaunchOptions) -> LaunchResult<Box<dyn BatchScript>> {
    options.validate()?;

    let work_dir = options.resolved_work_dir()?;
    let script_file = options.resolved_script_file(&work_dir)?;

    let platform = options.system.as_deref().and_then(platform::lookup);
    if platform.is_none() {
        tracing::debug!(system = ?options.system, "no platform tuning for system");
    }
    let tuned = tuning::tune(platform, options.scheduler, options.procs_per_node);
    let launcher_args = tuning::merge_launcher_args(&tuned.launcher_args, &options.launcher_args);
    let environment = tuning::merge_environment(&tuned.environment, &options.environment);

    let mut script: Box<dyn BatchScript> = match options.scheduler {
        Scheduler::Slurm => Box::new(SlurmScript::new(script_file, work_dir, options, launcher_args)?),
        Scheduler::Lsf => Box::new(LsfScript::new(script_file, work_dir, options, launcher_args)),
        Scheduler::Shell => Box::new(ShellScript::new(script_file, work_dir, options, launcher_args)?),
    };

    for (key, value) in &environment {
        script.add_environment(key, value);
    }

    tracing::debug!(
        scheduler = %options.scheduler,
        nodes = options.nodes,
        procs_per_node = options.procs_per_node,
        "created batch script"
    );
    Ok(script)
}

/// Write the experiment and build the complete script that trains on it.
pub fn prepare(experiment: &DynamicMessage, options: &LaunchOptions) -> LaunchResult<Box<dyn BatchScript>> {
    let mut script = make_batch_script(options)?;

    let prototext = script.work_dir().join(EXPERIMENT_FILE);
    save_prototext(&prototext, experiment)?;

    let mut command = vec![options.trainer_executable.clone()];
    command.extend(options.trainer_args.iter().cloned());
    command.push(format!("--prototext={}", prototext.display()));

    script.add_command(r#"echo "Started at $(date)""#);
    script.add_parallel_command(&command);
    script.add_command("status=$?");
    script.add_command(r#"echo "Finished at $(date)""#);
    script.add_command("exit ${status}");
    Ok(script)
}

/// Prepare the job and write, run or submit it.
///
/// Returns the exit status of the executed program, or 0 when only writing.
pub fn run(experiment: &DynamicMessage, options: &LaunchOptions) -> LaunchResult<i32> {
    let script = prepare(experiment, options)?;
    let action = Action::select(options.setup_only, script.has_allocation());
    execute(script.as_ref(), action, options.overwrite_script)
}

/// Carry out `action` on a prepared script.
pub fn execute(script: &dyn BatchScript, action: Action, overwrite: bool) -> LaunchResult<i32> {
    tracing::info!(%action, scheduler = %script.scheduler(), script = %script.script_file().display(), "launching");
    let status = match action {
        Action::Write => {
            script.write(overwrite)?;
            0
        }
        Action::Run => script.run(overwrite)?,
        Action::Submit => script.submit(overwrite)?,
    };
    if status != 0 {
        tracing::warn!(%action, status, "job exited with non-zero status");
    }
    Ok(status)
}

/// Trainer arguments enabling Caliper profiling. A configuration string
/// implies `--caliper`.
#[must_use]
pub fn profiling_args(caliper: bool, caliper_config: Option<&str>) -> Vec<String> {
    match caliper_config {
        Some(config) if !config.is_empty() => {
            vec!["--caliper".to_string(), "--caliper_config".to_string(), format!("\"{config}\"")]
        }
        _ if caliper => vec!["--caliper".to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_selection() {
        assert_eq!(Action::select(true, true), Action::Write);
        assert_eq!(Action::select(true, false), Action::Write);
        assert_eq!(Action::select(false, true), Action::Run);
        assert_eq!(Action::select(false, false), Action::Submit);
    }

    #[test]
    fn test_profiling_args() {
        assert!(profiling_args(false, None).is_empty());
        assert_eq!(profiling_args(true, None), vec!["--caliper"]);
        assert_eq!(profiling_args(false, Some("runtime-report")), vec!["--caliper", "--caliper_config", "\"runtime-report\""]);
        assert_eq!(profiling_args(true, Some("")), vec!["--caliper"]);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = LaunchOptions::default().with_procs_per_node(0).with_work_dir("/nonexistent");
        assert!(make_batch_script(&options).is_err());
    }
}
