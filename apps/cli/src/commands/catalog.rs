//! `keel types`: list the synthesized types.

use anyhow::{Result, bail};
use colored::Colorize;
use keel_schema::{SynthesizedType, TypeRegistry};
use serde_json::json;
use std::sync::Arc;

const STANDALONE: &str = "Standalone";

/// Execute the types command.
pub fn execute(registry: &TypeRegistry, family: Option<&str>, json_output: bool) -> Result<()> {
    let groups = groups(registry, family)?;

    if json_output {
        let types: Vec<_> = groups
            .iter()
            .flat_map(|(group, types)| {
                types.iter().map(move |ty| {
                    json!({
                        "name": ty.name(),
                        "family": group,
                        "message": ty.descriptor().full_name(),
                        "fields": ty.field_names().collect::<Vec<_>>(),
                    })
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&types)?);
        return Ok(());
    }

    for (group, types) in &groups {
        println!("{} {}", group.bold().cyan(), format!("({})", types.len()).dimmed());
        for ty in types {
            println!("  {}", ty.name());
        }
        println!();
    }
    Ok(())
}

fn groups<'a>(registry: &'a TypeRegistry, family: Option<&str>) -> Result<Vec<(String, Vec<&'a Arc<SynthesizedType>>)>> {
    let mut groups: Vec<(String, Vec<&Arc<SynthesizedType>>)> = registry
        .families()
        .into_iter()
        .map(|name| (name.to_string(), registry.family(name).collect()))
        .collect();
    groups.push((STANDALONE.to_string(), registry.standalone().collect()));

    let Some(family) = family else {
        return Ok(groups);
    };
    match groups.into_iter().find(|(name, _)| name.eq_ignore_ascii_case(family)) {
        Some(group) => Ok(vec![group]),
        None => {
            let known: Vec<&str> = registry.families().into_iter().chain(std::iter::once(STANDALONE)).collect();
            bail!("Unknown family: {family} (known: {})", known.join(", "))
        }
    }
}
