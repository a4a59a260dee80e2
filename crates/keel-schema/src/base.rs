//! Base types extended by synthesized types.
//!
//! A base type owns a set of constructor parameters that are kept apart from
//! the synthesized type's own fields and, optionally, an export routine that
//! produces the enclosing container message.

use crate::error::{SchemaError, SchemaResult};
use crate::export::assign_field;
use crate::value::FieldValue;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Arguments captured for the base type at construction.
pub type BaseArgs = BTreeMap<String, FieldValue>;

pub trait BaseType: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Constructor keywords reserved by the base type.
    fn ctor_params(&self) -> &[String];

    /// Whether [`BaseType::export`] produces a container message.
    fn has_export(&self) -> bool;

    /// Called once per instance after argument validation.
    fn init(&self, _args: &mut BaseArgs) {}

    /// Build the container message, or `None` when the base has no export
    /// routine.
    fn export(&self, args: &BaseArgs) -> SchemaResult<Option<DynamicMessage>>;
}

/// Base with no constructor parameters and no export routine.
#[derive(Debug, Default, Clone)]
pub struct ObjectBase;

impl BaseType for ObjectBase {
    fn name(&self) -> &str {
        "object"
    }

    fn ctor_params(&self) -> &[String] {
        &[]
    }

    fn has_export(&self) -> bool {
        false
    }

    fn export(&self, _args: &BaseArgs) -> SchemaResult<Option<DynamicMessage>> {
        Ok(None)
    }
}

#[derive(Debug)]
struct AutoName {
    prefix: String,
    counter: AtomicU64,
}

/// Base bound to a container message.
///
/// Its constructor parameters are fields of the container; export creates
/// the container and assigns the captured arguments to it. Synthesized types
/// then fill the sub-field named after themselves.
#[derive(Debug)]
pub struct ContainerBase {
    container: MessageDescriptor,
    params: Vec<String>,
    auto_name: Option<AutoName>,
}

impl ContainerBase {
    #[must_use]
    pub fn new(container: MessageDescriptor) -> Self {
        Self { container, params: Vec::new(), auto_name: None }
    }

    /// Reserve container fields as constructor parameters.
    pub fn with_params<I, S>(mut self, params: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for param in params {
            let param = param.into();
            if self.container.get_field_by_name(&param).is_none() {
                return Err(SchemaError::UnknownField {
                    type_name: self.container.name().to_string(),
                    field: param,
                });
            }
            if !self.params.contains(&param) {
                self.params.push(param);
            }
        }
        Ok(self)
    }

    /// Generate `<prefix><n>` names for instances built without a `name`
    /// argument. Only effective when `name` is a constructor parameter.
    #[must_use]
    pub fn with_auto_name(mut self, prefix: impl Into<String>) -> Self {
        self.auto_name = Some(AutoName { prefix: prefix.into(), counter: AtomicU64::new(0) });
        self
    }

    #[must_use]
    pub fn container(&self) -> &MessageDescriptor {
        &self.container
    }
}

impl BaseType for ContainerBase {
    fn name(&self) -> &str {
        self.container.name()
    }

    fn ctor_params(&self) -> &[String] {
        &self.params
    }

    fn has_export(&self) -> bool {
        true
    }

    fn init(&self, args: &mut BaseArgs) {
        let Some(auto) = &self.auto_name else {
            return;
        };
        if !self.params.iter().any(|p| p == "name") || args.contains_key("name") {
            return;
        }
        let n = auto.counter.fetch_add(1, Ordering::Relaxed) + 1;
        args.insert("name".to_string(), FieldValue::from(format!("{}{n}", auto.prefix)));
    }

    fn export(&self, args: &BaseArgs) -> SchemaResult<Option<DynamicMessage>> {
        let mut message = DynamicMessage::new(self.container.clone());
        for (name, value) in args {
            assign_field(&mut message, name, value)?;
        }
        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldType, FileBuilder, MessageBuilder, ScalarType};

    fn container() -> MessageDescriptor {
        FileBuilder::new("c.proto", "c")
            .message(MessageBuilder::new("Leaf").field("x", 1, ScalarType::Int64))
            .message(
                MessageBuilder::new("Node")
                    .field("name", 1, ScalarType::String)
                    .field("parents", 2, ScalarType::String)
                    .oneof_field("node_type", "leaf", 10, FieldType::message("Leaf")),
            )
            .into_pool()
            .unwrap()
            .get_message_by_name("c.Node")
            .unwrap()
    }

    #[test]
    fn test_params_must_be_container_fields() {
        let err = ContainerBase::new(container()).with_params(["name", "device"]).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownField { .. }));
    }

    #[test]
    fn test_auto_name_counts_per_base() {
        let base = ContainerBase::new(container()).with_params(["name"]).unwrap().with_auto_name("node");
        let mut first = BaseArgs::new();
        base.init(&mut first);
        let mut second = BaseArgs::new();
        base.init(&mut second);
        assert_eq!(first.get("name").and_then(FieldValue::as_str), Some("node1"));
        assert_eq!(second.get("name").and_then(FieldValue::as_str), Some("node2"));
    }

    #[test]
    fn test_auto_name_keeps_explicit_name() {
        let base = ContainerBase::new(container()).with_params(["name"]).unwrap().with_auto_name("node");
        let mut args = BaseArgs::new();
        args.insert("name".to_string(), FieldValue::from("fc"));
        base.init(&mut args);
        assert_eq!(args.get("name").and_then(FieldValue::as_str), Some("fc"));
    }

    #[test]
    fn test_container_export_assigns_args() {
        let base = ContainerBase::new(container()).with_params(["name", "parents"]).unwrap();
        let mut args = BaseArgs::new();
        args.insert("name".to_string(), FieldValue::from("fc"));
        let message = base.export(&args).unwrap().unwrap();
        assert_eq!(message.get_field_by_name("name").unwrap().as_str(), Some("fc"));
        assert!(!message.has_field_by_name("parents"));
    }

    #[test]
    fn test_object_base_has_no_export() {
        assert!(!ObjectBase.has_export());
        assert!(ObjectBase.export(&BaseArgs::new()).unwrap().is_none());
    }
}
