//! Registry of synthesized types, keyed by type name.
//!
//! Messages are looked up by short name across an ordered list of candidate
//! packages. A name that matches in more than one package is rejected rather
//! than resolved by search order.

use crate::base::{BaseType, ContainerBase, ObjectBase};
use crate::error::{SchemaError, SchemaResult};
use crate::synth::{Instance, SynthesizedType};
use crate::value::FieldValue;
use prost_reflect::{DescriptorPool, MessageDescriptor};
use std::collections::HashMap;
use std::sync::Arc;

/// Constructor parameters reserved by layer types.
pub const LAYER_PARAMS: &[&str] =
    &["name", "parents", "children", "weights", "device_allocation", "data_layout", "hint_layer"];

/// Containers expanded into one type per member, in registration order.
pub const CONTAINER_FAMILIES: &[&str] = &["Layer", "Callback", "Initializer", "Optimizer", "Metric"];

/// Messages registered as standalone types.
pub const STANDALONE_TYPES: &[&str] =
    &["Experiment", "Trainer", "Model", "Weights", "DataReader", "Reader", "ObjectiveFunction"];

/// Container whose members become objective-function terms.
pub const OBJECTIVE_FUNCTION: &str = "ObjectiveFunction";

#[derive(Debug)]
pub struct TypeRegistry {
    pool: DescriptorPool,
    packages: Vec<String>,
    types: Vec<Arc<SynthesizedType>>,
    index: HashMap<String, usize>,
}

impl TypeRegistry {
    /// Empty registry resolving messages in `packages`, in order.
    pub fn new<I, S>(pool: DescriptorPool, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { pool, packages: packages.into_iter().map(Into::into).collect(), types: Vec::new(), index: HashMap::new() }
    }

    /// Registry populated with the standard catalog: layers, callbacks,
    /// initializers, optimizers, metrics, objective terms and the standalone
    /// experiment messages.
    pub fn standard<I, S>(pool: DescriptorPool, packages: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new(pool, packages);

        for family in CONTAINER_FAMILIES {
            let container = registry.resolve_message(family)?;
            let (base, skip): (Arc<dyn BaseType>, &[&str]) = if *family == "Layer" {
                let base = ContainerBase::new(container.clone()).with_params(LAYER_PARAMS.iter().copied())?.with_auto_name("layer");
                (Arc::new(base), LAYER_PARAMS)
            } else {
                (Arc::new(ContainerBase::new(container.clone())), &[])
            };
            registry.register_family(&container, skip, base)?;
        }

        let objective = registry.resolve_message(OBJECTIVE_FUNCTION)?;
        registry.register_family(&objective, &[], Arc::new(ObjectBase))?;

        for name in STANDALONE_TYPES {
            registry.register_standalone(name)?;
        }

        tracing::debug!(types = registry.len(), packages = ?registry.packages, "built standard type registry");
        Ok(registry)
    }

    /// Every package declared by files in `pool`, in file order.
    #[must_use]
    pub fn packages_of(pool: &DescriptorPool) -> Vec<String> {
        let mut packages: Vec<String> = Vec::new();
        for file in pool.files() {
            let package = file.package_name().to_string();
            if !packages.contains(&package) {
                packages.push(package);
            }
        }
        packages
    }

    #[must_use]
    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }

    #[must_use]
    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    /// Find the message `name` in the candidate packages.
    ///
    /// A fully qualified name containing a dot is looked up directly.
    pub fn resolve_message(&self, name: &str) -> SchemaResult<MessageDescriptor> {
        if name.contains('.') {
            return self.pool.get_message_by_name(name).ok_or_else(|| SchemaError::UnknownType(name.to_string()));
        }

        let mut found: Option<MessageDescriptor> = None;
        for package in &self.packages {
            let full_name = if package.is_empty() { name.to_string() } else { format!("{package}.{name}") };
            let Some(message) = self.pool.get_message_by_name(&full_name) else {
                continue;
            };
            if let Some(first) = &found {
                return Err(SchemaError::AmbiguousType {
                    name: name.to_string(),
                    first: first.full_name().to_string(),
                    second: message.full_name().to_string(),
                });
            }
            found = Some(message);
        }
        found.ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    /// Add a type. Names must be unique across the registry.
    pub fn register(&mut self, ty: Arc<SynthesizedType>) -> SchemaResult<()> {
        if let Some(&idx) = self.index.get(ty.name()) {
            return Err(SchemaError::AmbiguousType {
                name: ty.name().to_string(),
                first: self.types[idx].descriptor().full_name().to_string(),
                second: ty.descriptor().full_name().to_string(),
            });
        }
        self.index.insert(ty.name().to_string(), self.types.len());
        self.types.push(ty);
        Ok(())
    }

    /// Synthesize and register one type per member of `container`.
    pub fn register_family(
        &mut self,
        container: &MessageDescriptor,
        skip_fields: &[&str],
        base: Arc<dyn BaseType>,
    ) -> SchemaResult<usize> {
        let types = SynthesizedType::generate_types(container, skip_fields, base)?;
        let count = types.len();
        for ty in types {
            self.register(ty)?;
        }
        tracing::debug!(family = container.name(), count, "registered type family");
        Ok(count)
    }

    /// Synthesize and register the message `name` with no base type.
    pub fn register_standalone(&mut self, name: &str) -> SchemaResult<Arc<SynthesizedType>> {
        let descriptor = self.resolve_message(name)?;
        let field_name = descriptor.name().to_string();
        let ty = SynthesizedType::synthesize(descriptor, field_name, Arc::new(ObjectBase))?;
        self.register(Arc::clone(&ty))?;
        Ok(ty)
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Arc<SynthesizedType>> {
        self.index.get(name).map(|&idx| &self.types[idx])
    }

    pub fn get(&self, name: &str) -> SchemaResult<&Arc<SynthesizedType>> {
        self.lookup(name).ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    pub fn instantiate<I, K, V>(&self, name: &str, kwargs: I) -> SchemaResult<Instance>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.get(name)?.instantiate(kwargs.into_iter().map(|(k, v)| (k.into(), v.into())))
    }

    /// Types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SynthesizedType>> {
        self.types.iter()
    }

    /// Distinct family names in registration order.
    #[must_use]
    pub fn families(&self) -> Vec<&str> {
        let mut families: Vec<&str> = Vec::new();
        for family in self.types.iter().filter_map(|t| t.family()) {
            if !families.contains(&family) {
                families.push(family);
            }
        }
        families
    }

    /// Types generated from the container `family`.
    pub fn family<'a>(&'a self, family: &'a str) -> impl Iterator<Item = &'a Arc<SynthesizedType>> + 'a {
        self.types.iter().filter(move |t| t.family() == Some(family))
    }

    /// Types not generated from any container.
    pub fn standalone(&self) -> impl Iterator<Item = &Arc<SynthesizedType>> {
        self.types.iter().filter(|t| t.family().is_none())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FileBuilder, MessageBuilder, ScalarType};

    fn two_package_pool() -> DescriptorPool {
        let mut pool = DescriptorPool::new();
        pool.add_file_descriptor_proto(
            FileBuilder::new("a.proto", "alpha")
                .message(MessageBuilder::new("Shared").field("x", 1, ScalarType::Int32))
                .message(MessageBuilder::new("OnlyAlpha"))
                .build(),
        )
        .unwrap();
        pool.add_file_descriptor_proto(
            FileBuilder::new("b.proto", "beta").message(MessageBuilder::new("Shared").field("y", 1, ScalarType::Int32)).build(),
        )
        .unwrap();
        pool
    }

    #[test]
    fn test_resolve_rejects_ambiguous_names() {
        let registry = TypeRegistry::new(two_package_pool(), ["alpha", "beta"]);
        let err = registry.resolve_message("Shared").unwrap_err();
        assert!(matches!(err, SchemaError::AmbiguousType { .. }));

        assert_eq!(registry.resolve_message("OnlyAlpha").unwrap().full_name(), "alpha.OnlyAlpha");
        assert_eq!(registry.resolve_message("beta.Shared").unwrap().full_name(), "beta.Shared");
        assert!(matches!(registry.resolve_message("Missing"), Err(SchemaError::UnknownType(_))));
    }

    #[test]
    fn test_resolve_limited_to_candidate_packages() {
        let registry = TypeRegistry::new(two_package_pool(), ["beta"]);
        let shared = registry.resolve_message("Shared").unwrap();
        assert_eq!(shared.full_name(), "beta.Shared");
        assert!(registry.resolve_message("OnlyAlpha").is_err());
    }

    #[test]
    fn test_register_rejects_duplicate_names() {
        let pool = two_package_pool();
        let mut registry = TypeRegistry::new(pool.clone(), ["alpha"]);
        registry.register_standalone("Shared").unwrap();

        let other = SynthesizedType::synthesize(
            pool.get_message_by_name("beta.Shared").unwrap(),
            "shared",
            Arc::new(ObjectBase),
        )
        .unwrap();
        assert!(matches!(registry.register(other), Err(SchemaError::AmbiguousType { .. })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_packages_of_pool() {
        assert_eq!(TypeRegistry::packages_of(&two_package_pool()), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_instantiate_unknown_type() {
        let registry = TypeRegistry::new(two_package_pool(), ["alpha"]);
        let err = registry.instantiate("Nope", Vec::<(String, FieldValue)>::new()).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType(ref n) if n == "Nope"));
    }
}
