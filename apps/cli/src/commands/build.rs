//! `keel build`: turn a JSON description into an experiment file.

use super::load_experiment;
use super::types::{OptimizerArgs, ProfilingArgs};
use anyhow::{Context, Result};
use colored::Colorize;
use keel_schema::{TypeRegistry, experiment};
use std::path::Path;

/// Execute the build command.
///
/// Without `output` the text format is written to stdout.
pub fn execute(
    registry: &TypeRegistry,
    input: &Path,
    output: Option<&Path>,
    binary: bool,
    optimizer: &OptimizerArgs,
    profiling: &ProfilingArgs,
) -> Result<()> {
    if profiling.caliper || profiling.caliper_config.is_some() {
        tracing::warn!("Caliper options only apply to `keel launch`");
    }

    let message = load_experiment(registry, input, optimizer, profiling)?;

    match output {
        Some(path) if binary => {
            experiment::save_binary(path, &message).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {}", "Wrote".green(), path.display());
        }
        Some(path) => {
            experiment::save_prototext(path, &message)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {}", "Wrote".green(), path.display());
        }
        None if binary => anyhow::bail!("--binary requires --output"),
        None => print!("{}", experiment::to_prototext(&message)),
    }
    Ok(())
}
