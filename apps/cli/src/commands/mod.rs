//! Command implementations for the keel CLI.

pub mod build;
pub mod catalog;
pub mod describe;
pub mod launch;
pub mod platform;
pub mod types;

use anyhow::{Context, Result, bail};
use keel_schema::prost_reflect::DynamicMessage;
use keel_schema::{FieldValue, Instance, TypeRegistry, builtin, json, presets};
use std::path::Path;

use types::{OptimizerArgs, ProfilingArgs, SchemaArgs};

/// Build the type registry from the built-in schema or a descriptor set.
pub fn load_registry(schema: &SchemaArgs) -> Result<TypeRegistry> {
    let (pool, default_packages) = match &schema.descriptor_set {
        Some(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("Failed to read descriptor set {}", path.display()))?;
            let pool = builtin::load_descriptor_set(&bytes)
                .with_context(|| format!("Invalid descriptor set {}", path.display()))?;
            let packages = TypeRegistry::packages_of(&pool);
            (pool, packages)
        }
        None => (builtin::pool()?, vec![builtin::PACKAGE.to_string()]),
    };

    let packages = if schema.packages.is_empty() { default_packages } else { schema.packages.clone() };
    TypeRegistry::standard(pool, packages).context("Failed to build the type registry")
}

/// Read a JSON experiment description from `path`, or stdin for `-`.
pub fn read_description(registry: &TypeRegistry, path: &Path) -> Result<Instance> {
    let text = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    };
    json::instance_from_str(registry, &text).with_context(|| format!("Invalid experiment {}", path.display()))
}

/// Apply the optimizer and profiler options to an experiment instance.
pub fn apply_presets(
    registry: &TypeRegistry,
    experiment: &mut Instance,
    optimizer: &OptimizerArgs,
    profiling: &ProfilingArgs,
) -> Result<()> {
    if let Some(preset) = optimizer.optimizer {
        let instance = presets::optimizer(registry, preset, optimizer.optimizer_learning_rate)?;
        let type_name = experiment.type_name().to_string();
        experiment.set("optimizer", instance).with_context(|| format!("Cannot set an optimizer on {type_name}"))?;
        tracing::debug!(%preset, learning_rate = optimizer.optimizer_learning_rate, "replaced optimizer");
    }

    if profiling.profile {
        let callback = presets::profiler_callback(registry, profiling.profile_init)?;
        add_model_callback(registry, experiment, callback)?;
    }
    Ok(())
}

fn add_model_callback(registry: &TypeRegistry, experiment: &mut Instance, callback: Instance) -> Result<()> {
    let type_name = experiment.type_name().to_string();
    let mut model = match experiment.unset("model").with_context(|| format!("Cannot add callbacks to {type_name}"))? {
        Some(FieldValue::Instance(model)) => *model,
        Some(other) => {
            experiment.set("model", other)?;
            bail!("The model must be described as an object to add callbacks");
        }
        None => registry.get("Model")?.empty(),
    };
    model.push("callback", callback)?;
    experiment.set("model", model)?;
    Ok(())
}

/// Read, adjust and export an experiment.
pub fn load_experiment(
    registry: &TypeRegistry,
    path: &Path,
    optimizer: &OptimizerArgs,
    profiling: &ProfilingArgs,
) -> Result<DynamicMessage> {
    let mut experiment = read_description(registry, path)?;
    apply_presets(registry, &mut experiment, optimizer, profiling)?;
    experiment.export().with_context(|| format!("Failed to export {}", experiment.type_name()))
}
