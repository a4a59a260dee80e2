//! `keel describe`: show the fields of a type.

use anyhow::Result;
use colored::Colorize;
use keel_schema::TypeRegistry;
use serde_json::json;

/// Execute the describe command.
pub fn execute(registry: &TypeRegistry, name: &str, json_output: bool) -> Result<()> {
    let ty = registry.get(name)?;
    let summary = ty.summary();
    let base_params = ty.base().ctor_params();

    if json_output {
        let output = json!({
            "name": ty.name(),
            "message": summary.full_name,
            "family": ty.family(),
            "base": ty.base().name(),
            "base_params": base_params,
            "fields": summary.fields,
            "enums": summary.enums,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} {}", ty.name().bold().cyan(), format!("({})", summary.full_name).dimmed());
    if let Some(family) = ty.family() {
        println!("Family: {family}");
    }
    if !base_params.is_empty() {
        println!("Base parameters: {}", base_params.join(", "));
    }
    print!("{}", ty.doc());
    for namespace in ty.enum_namespaces() {
        println!("Enum {}:", namespace.name().bold());
        for (value, number) in namespace.values() {
            println!("    {value} = {number}");
        }
    }
    Ok(())
}
