//! Runtime types synthesized from message descriptors.
//!
//! A [`SynthesizedType`] exposes one keyword per schema field and validates
//! arguments against the descriptor; an [`Instance`] holds the values and
//! exports them back to a schema message.

use crate::base::{BaseArgs, BaseType};
use crate::error::{SchemaError, SchemaResult};
use crate::introspect::{describe, MessageSummary};
use crate::value::{FieldValue, Kwargs};
use prost_reflect::{DynamicMessage, Kind, MessageDescriptor};
use std::fmt;
use std::sync::Arc;

/// Enum-like namespace: value names bound to plain integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumNamespace {
    name: String,
    values: Vec<(String, i32)>,
}

impl EnumNamespace {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn get(&self, value_name: &str) -> Option<i32> {
        self.values.iter().find(|(n, _)| n == value_name).map(|(_, v)| *v)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, i32)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }
}

pub struct SynthesizedType {
    name: String,
    descriptor: MessageDescriptor,
    base_field_name: String,
    base: Arc<dyn BaseType>,
    field_names: Vec<String>,
    enums: Vec<EnumNamespace>,
    summary: MessageSummary,
    family: Option<String>,
}

impl fmt::Debug for SynthesizedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesizedType")
            .field("name", &self.name)
            .field("message", &self.descriptor.full_name())
            .field("base", &self.base.name())
            .field("base_field_name", &self.base_field_name)
            .finish()
    }
}

impl SynthesizedType {
    /// Create a type for `descriptor` extending `base`.
    ///
    /// `base_field_name` names the field of the base's container message that
    /// holds this type's exported message.
    pub fn synthesize(
        descriptor: MessageDescriptor,
        base_field_name: impl Into<String>,
        base: Arc<dyn BaseType>,
    ) -> SchemaResult<Arc<Self>> {
        Self::build_type(descriptor, base_field_name.into(), base, None).map(Arc::new)
    }

    fn build_type(
        descriptor: MessageDescriptor,
        base_field_name: String,
        base: Arc<dyn BaseType>,
        family: Option<String>,
    ) -> SchemaResult<Self> {
        let summary = describe(&descriptor);
        let field_names: Vec<String> = summary.fields.iter().map(|f| f.name.clone()).collect();

        if let Some(param) = base.ctor_params().iter().find(|p| field_names.contains(p)) {
            return Err(SchemaError::FieldCollision {
                type_name: descriptor.name().to_string(),
                base: base.name().to_string(),
                field: param.clone(),
            });
        }

        let enums = summary
            .enums
            .iter()
            .map(|e| EnumNamespace { name: e.name.clone(), values: e.values.clone() })
            .collect();

        tracing::debug!(
            type_name = descriptor.name(),
            base = base.name(),
            fields = field_names.len(),
            "synthesized type"
        );

        Ok(Self {
            name: descriptor.name().to_string(),
            descriptor,
            base_field_name,
            base,
            field_names,
            enums,
            summary,
            family,
        })
    }

    /// Synthesize one type per field of `container`, skipping `skip_fields`.
    ///
    /// Every remaining field must be message-typed.
    pub fn generate_types(
        container: &MessageDescriptor,
        skip_fields: &[&str],
        base: Arc<dyn BaseType>,
    ) -> SchemaResult<Vec<Arc<Self>>> {
        let mut types = Vec::new();
        for field in container.fields() {
            if skip_fields.contains(&field.name()) {
                continue;
            }
            let Kind::Message(message) = field.kind() else {
                return Err(SchemaError::NotAMessage {
                    container: container.name().to_string(),
                    field: field.name().to_string(),
                });
            };
            let ty = Self::build_type(
                message,
                field.name().to_string(),
                Arc::clone(&base),
                Some(container.name().to_string()),
            )?;
            types.push(Arc::new(ty));
        }
        Ok(types)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn base_field_name(&self) -> &str {
        &self.base_field_name
    }

    #[must_use]
    pub fn base(&self) -> &Arc<dyn BaseType> {
        &self.base
    }

    /// Container message this type was generated from, if any.
    #[must_use]
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.field_names.iter().map(String::as_str)
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.field_index(name).is_some()
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.field_names.iter().position(|f| f == name)
    }

    /// Keywords accepted by the constructor: base parameters then fields.
    #[must_use]
    pub fn accepted_keywords(&self) -> Vec<&str> {
        self.base.ctor_params().iter().map(String::as_str).chain(self.field_names()).collect()
    }

    #[must_use]
    pub fn enum_namespace(&self, name: &str) -> Option<&EnumNamespace> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn enum_namespaces(&self) -> impl Iterator<Item = &EnumNamespace> {
        self.enums.iter()
    }

    /// `Type.Enum.VALUE`, as a plain integer.
    #[must_use]
    pub fn enum_value(&self, enum_name: &str, value_name: &str) -> Option<i32> {
        self.enum_namespace(enum_name)?.get(value_name)
    }

    #[must_use]
    pub fn summary(&self) -> &MessageSummary {
        &self.summary
    }

    #[must_use]
    pub fn doc(&self) -> String {
        self.summary.render_doc()
    }

    /// Build an instance from keyword arguments.
    ///
    /// Base parameters are captured for the base type; every other keyword
    /// must name a field. Fields not supplied stay unset.
    pub fn instantiate(self: &Arc<Self>, kwargs: impl IntoIterator<Item = (String, FieldValue)>) -> SchemaResult<Instance> {
        let mut base_args = BaseArgs::new();
        let mut fields: Vec<Option<FieldValue>> = vec![None; self.field_names.len()];

        for (name, value) in kwargs {
            if self.base.ctor_params().contains(&name) {
                base_args.insert(name, value);
            } else if let Some(idx) = self.field_index(&name) {
                fields[idx] = Some(value);
            } else {
                return Err(SchemaError::UnknownArgument { type_name: self.name.clone(), argument: name });
            }
        }

        self.base.init(&mut base_args);
        Ok(Instance { ty: Arc::clone(self), base_args, fields })
    }

    /// Instance with every field unset.
    #[must_use]
    pub fn empty(self: &Arc<Self>) -> Instance {
        let mut base_args = BaseArgs::new();
        self.base.init(&mut base_args);
        Instance { ty: Arc::clone(self), base_args, fields: vec![None; self.field_names.len()] }
    }
}

/// Values for one synthesized type.
#[derive(Debug, Clone)]
pub struct Instance {
    ty: Arc<SynthesizedType>,
    base_args: BaseArgs,
    fields: Vec<Option<FieldValue>>,
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.ty, &other.ty) && self.base_args == other.base_args && self.fields == other.fields
    }
}

impl Instance {
    #[must_use]
    pub fn synthesized_type(&self) -> &Arc<SynthesizedType> {
        &self.ty
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.ty.field_names()
    }

    /// Field value, or `None` while unset.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.ty.field_index(field).and_then(|idx| self.fields[idx].as_ref())
    }

    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> SchemaResult<()> {
        let idx = self.index_of(field)?;
        self.fields[idx] = Some(value.into());
        Ok(())
    }

    /// Reset a field to unset, returning the previous value.
    pub fn unset(&mut self, field: &str) -> SchemaResult<Option<FieldValue>> {
        let idx = self.index_of(field)?;
        Ok(self.fields[idx].take())
    }

    /// Append to a list-valued field, starting a list if unset.
    pub fn push(&mut self, field: &str, value: impl Into<FieldValue>) -> SchemaResult<()> {
        let idx = self.index_of(field)?;
        let value = value.into();
        let slot = &mut self.fields[idx];
        *slot = Some(match slot.take() {
            Some(FieldValue::List(mut items)) => {
                items.push(value);
                FieldValue::List(items)
            }
            Some(other) => FieldValue::List(vec![other, value]),
            None => FieldValue::List(vec![value]),
        });
        Ok(())
    }

    /// Fields that currently hold a value, in declaration order.
    pub fn set_fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.ty
            .field_names
            .iter()
            .zip(&self.fields)
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.as_str(), v)))
    }

    #[must_use]
    pub fn base_args(&self) -> &BaseArgs {
        &self.base_args
    }

    #[must_use]
    pub fn base_arg(&self, name: &str) -> Option<&FieldValue> {
        self.base_args.get(name)
    }

    /// Name used when this instance is referenced from a string field:
    /// the `name` base argument, else a string `name` field.
    #[must_use]
    pub fn reference_name(&self) -> Option<&str> {
        self.base_arg("name").or_else(|| self.get("name")).and_then(FieldValue::as_str)
    }

    pub fn export(&self) -> SchemaResult<DynamicMessage> {
        crate::export::export(self)
    }

    fn index_of(&self, field: &str) -> SchemaResult<usize> {
        self.ty.field_index(field).ok_or_else(|| SchemaError::UnknownField {
            type_name: self.ty.name().to_string(),
            field: field.to_string(),
        })
    }
}

impl SynthesizedType {
    /// Convenience over [`SynthesizedType::instantiate`] taking [`Kwargs`].
    pub fn build(self: &Arc<Self>, kwargs: Kwargs) -> SchemaResult<Instance> {
        self.instantiate(kwargs)
    }
}
