//! `keel platform`: show the known HPC systems and their tuning.

use anyhow::{Result, bail};
use colored::Colorize;
use keel_launcher::platform::{self, Platform};
use keel_launcher::tuning;
use keel_launcher::{PLATFORMS, Scheduler, detect_system};
use serde_json::json;

/// Execute the platform command.
pub fn execute(system: Option<&str>, procs_per_node: Option<u32>, scheduler: Option<Scheduler>, json_output: bool) -> Result<()> {
    let detected = detect_system();
    match system {
        None => list(detected.as_deref(), json_output),
        Some(name) => {
            let Some(platform) = platform::lookup(name) else {
                let known: Vec<&str> = PLATFORMS.iter().map(|p| p.name).collect();
                bail!("Unknown system: {name} (known: {})", known.join(", "));
            };
            show(platform, procs_per_node, scheduler, json_output)
        }
    }
}

fn list(detected: Option<&str>, json_output: bool) -> Result<()> {
    if json_output {
        let platforms: Vec<_> = PLATFORMS.iter().map(platform_json).collect();
        let output = json!({ "detected": detected, "platforms": platforms });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match detected {
        Some(system) => println!("Detected system: {}", system.bold()),
        None => println!("Detected system: {}", "unknown".dimmed()),
    }
    println!();
    println!("{}", format!("{:<10} {:<10} {:>6} {:>6}  {}", "SYSTEM", "SCHEDULER", "CORES", "GPUS", "PARTITION").bold());
    for p in PLATFORMS {
        let marker = if detected == Some(p.name) { "*".green().to_string() } else { " ".to_string() };
        println!("{:<10} {:<10} {:>6} {:>6}  {}{}", p.name, p.scheduler.as_str(), p.cores_per_node, p.gpus_per_node, p.partition, marker);
    }
    Ok(())
}

fn show(platform: &Platform, procs_per_node: Option<u32>, scheduler: Option<Scheduler>, json_output: bool) -> Result<()> {
    let procs_per_node = procs_per_node.unwrap_or_else(|| platform.default_procs_per_node());
    let scheduler = scheduler.unwrap_or(platform.scheduler);
    let tuned = tuning::tune(Some(platform), scheduler, procs_per_node);

    if json_output {
        let mut output = platform_json(platform);
        output["procs_per_node"] = json!(procs_per_node);
        output["launcher_args"] = json!(tuned.launcher_args);
        output["environment"] = json!(tuned.environment);
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", platform.name.bold().cyan());
    println!("  Scheduler:      {scheduler}");
    println!("  Cores per node: {}", platform.cores_per_node);
    println!("  GPUs per node:  {}", platform.gpus_per_node);
    println!("  Partition:      {}", platform.partition);
    println!("  Procs per node: {procs_per_node}");
    if !tuned.launcher_args.is_empty() {
        println!("  Launcher args:  {}", tuned.launcher_args.join(" "));
    }
    println!("  Environment:");
    for (key, value) in &tuned.environment {
        println!("    {key}={value}");
    }
    Ok(())
}

fn platform_json(platform: &Platform) -> serde_json::Value {
    json!({
        "name": platform.name,
        "scheduler": platform.scheduler,
        "cores_per_node": platform.cores_per_node,
        "gpus_per_node": platform.gpus_per_node,
        "partition": platform.partition,
        "topology": format!("{:?}", platform.topology),
    })
}
