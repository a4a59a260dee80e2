//! `keel launch`: build an experiment and write, run or submit it.

use super::load_experiment;
use super::types::LaunchArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use keel_launcher::{Action, LaunchOptions, LauncherConfig, detect_system, execute as execute_script, prepare};
use keel_schema::TypeRegistry;
use serde_json::json;

/// Execute the launch command, returning the job's exit status.
pub fn execute(registry: &TypeRegistry, args: &LaunchArgs, config: &LauncherConfig) -> Result<i32> {
    let message = load_experiment(registry, &args.input, &args.optimizer, &args.profiling)?;
    let options = launch_options(args, config);

    let script = prepare(&message, &options).context("Failed to prepare the batch script")?;
    let action = Action::select(options.setup_only, script.has_allocation());
    let status = execute_script(script.as_ref(), action, options.overwrite_script)
        .with_context(|| format!("Failed to {action} {}", script.script_file().display()))?;

    if args.json {
        let output = json!({
            "action": action.to_string(),
            "scheduler": script.scheduler(),
            "script": script.script_file().display().to_string(),
            "work_dir": script.work_dir().display().to_string(),
            "status": status,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(status);
    }

    let verb = match action {
        Action::Write => "Wrote",
        Action::Run => "Ran",
        Action::Submit => "Submitted",
    };
    let path = script.script_file().display().to_string();
    if status == 0 {
        println!("{} {}", verb.green().bold(), path);
    } else {
        println!("{} {} {}", verb.yellow().bold(), path, format!("(exit status {status})").red());
    }
    Ok(status)
}

/// Platform defaults, then the configuration file, then the command line.
pub fn launch_options(args: &LaunchArgs, config: &LauncherConfig) -> LaunchOptions {
    let system = args.system.clone().or_else(|| config.system.clone()).or_else(detect_system);
    let mut options = system.as_deref().map_or_else(LaunchOptions::default, |s| LaunchOptions::for_system(s));
    options = config.apply(options);
    options.system = system;

    if let Some(scheduler) = args.scheduler {
        options.scheduler = scheduler;
    }
    if let Some(ref name) = args.job_name {
        options.job_name = name.clone();
    }
    if let Some(ref dir) = args.work_dir {
        options.work_dir = Some(dir.clone());
    }
    if let Some(ref file) = args.script_file {
        options.script_file = Some(file.clone());
    }
    if let Some(ref trainer) = args.trainer {
        options.trainer_executable = trainer.clone();
    }
    if let Some(ref launcher) = args.launcher {
        options.launcher = Some(launcher.clone());
    }
    options.launcher_args.extend(args.launcher_args.iter().cloned());
    for (key, value) in &args.environment {
        options.environment.insert(key.clone(), value.clone());
    }
    options.overwrite_script |= args.overwrite;

    options = args.scheduler_args.apply(options);
    options = args.distconv.apply(options);

    options.trainer_args = args.profiling.trainer_args();
    options.trainer_args.extend(args.trainer_args.iter().cloned());
    options
}
