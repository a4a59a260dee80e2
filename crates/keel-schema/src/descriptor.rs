//! Builders for constructing Protobuf file descriptors in code.
//!
//! Used for small ad-hoc schemas (proto2 files, `required` fields, schemas
//! assembled by tools) that have no `.proto` source. Type references are
//! written relative to the file's package (`"Node"`, `"Conv.Mode"`) and
//! qualified when the file is built.

use crate::error::SchemaResult;
use prost_reflect::DescriptorPool;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, OneofDescriptorProto,
};

pub use prost_types::field_descriptor_proto::Type as ScalarType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Proto2,
    Proto3,
}

/// Type of a declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Scalar(Type),
    /// Message type, relative to the file package.
    Message(String),
    /// Enum type, relative to the file package.
    Enum(String),
}

impl FieldType {
    pub fn message(name: impl Into<String>) -> Self {
        Self::Message(name.into())
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::Enum(name.into())
    }
}

impl From<Type> for FieldType {
    fn from(value: Type) -> Self {
        Self::Scalar(value)
    }
}

#[derive(Debug, Clone)]
struct FieldDecl {
    name: String,
    number: i32,
    label: Label,
    ty: FieldType,
    oneof: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MessageBuilder {
    name: String,
    fields: Vec<FieldDecl>,
    enums: Vec<(String, Vec<(String, i32)>)>,
}

impl MessageBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new(), enums: Vec::new() }
    }

    /// Singular field (`optional` label).
    #[must_use]
    pub fn field(self, name: &str, number: i32, ty: impl Into<FieldType>) -> Self {
        self.push(name, number, Label::Optional, ty.into(), None)
    }

    #[must_use]
    pub fn required(self, name: &str, number: i32, ty: impl Into<FieldType>) -> Self {
        self.push(name, number, Label::Required, ty.into(), None)
    }

    #[must_use]
    pub fn repeated(self, name: &str, number: i32, ty: impl Into<FieldType>) -> Self {
        self.push(name, number, Label::Repeated, ty.into(), None)
    }

    /// Singular field that is a member of the oneof `oneof`.
    #[must_use]
    pub fn oneof_field(self, oneof: &str, name: &str, number: i32, ty: impl Into<FieldType>) -> Self {
        self.push(name, number, Label::Optional, ty.into(), Some(oneof.to_string()))
    }

    /// Nested enum declared inside this message.
    #[must_use]
    pub fn enumeration(mut self, name: &str, values: &[(&str, i32)]) -> Self {
        let values = values.iter().map(|(n, v)| ((*n).to_string(), *v)).collect();
        self.enums.push((name.to_string(), values));
        self
    }

    fn push(mut self, name: &str, number: i32, label: Label, ty: FieldType, oneof: Option<String>) -> Self {
        self.fields.push(FieldDecl { name: name.to_string(), number, label, ty, oneof });
        self
    }

    fn build(self, package: &str) -> DescriptorProto {
        let mut oneofs: Vec<String> = Vec::new();
        let mut fields = Vec::with_capacity(self.fields.len());

        for decl in self.fields {
            let oneof_index = decl.oneof.map(|name| {
                let idx = oneofs.iter().position(|o| *o == name).unwrap_or_else(|| {
                    oneofs.push(name);
                    oneofs.len() - 1
                });
                idx as i32
            });

            let (ty, type_name) = match decl.ty {
                FieldType::Scalar(t) => (t, None),
                FieldType::Message(name) => (Type::Message, Some(qualify(package, &name))),
                FieldType::Enum(name) => (Type::Enum, Some(qualify(package, &name))),
            };

            fields.push(FieldDescriptorProto {
                name: Some(decl.name),
                number: Some(decl.number),
                label: Some(decl.label as i32),
                r#type: Some(ty as i32),
                type_name,
                oneof_index,
                ..Default::default()
            });
        }

        let enum_type = self
            .enums
            .into_iter()
            .map(|(name, values)| EnumDescriptorProto {
                name: Some(name),
                value: values
                    .into_iter()
                    .map(|(name, number)| EnumValueDescriptorProto {
                        name: Some(name),
                        number: Some(number),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            })
            .collect();

        DescriptorProto {
            name: Some(self.name),
            field: fields,
            enum_type,
            oneof_decl: oneofs
                .into_iter()
                .map(|name| OneofDescriptorProto { name: Some(name), ..Default::default() })
                .collect(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileBuilder {
    name: String,
    package: String,
    syntax: Syntax,
    messages: Vec<MessageBuilder>,
}

impl FileBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self { name: name.into(), package: package.into(), syntax: Syntax::Proto3, messages: Vec::new() }
    }

    #[must_use]
    pub fn syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    #[must_use]
    pub fn message(mut self, message: MessageBuilder) -> Self {
        self.messages.push(message);
        self
    }

    #[must_use]
    pub fn build(self) -> FileDescriptorProto {
        let package = self.package;
        let message_type = self.messages.into_iter().map(|m| m.build(&package)).collect();
        FileDescriptorProto {
            name: Some(self.name),
            package: if package.is_empty() { None } else { Some(package) },
            message_type,
            syntax: Some(
                match self.syntax {
                    Syntax::Proto2 => "proto2",
                    Syntax::Proto3 => "proto3",
                }
                .to_string(),
            ),
            ..Default::default()
        }
    }

    /// Build the file and load it into a fresh descriptor pool.
    pub fn into_pool(self) -> SchemaResult<DescriptorPool> {
        let mut pool = DescriptorPool::new();
        pool.add_file_descriptor_proto(self.build())?;
        Ok(pool)
    }
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        format!(".{name}")
    } else {
        format!(".{package}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_reflect::{Cardinality, Kind};

    #[test]
    fn test_file_builder_qualifies_type_names() {
        let file = FileBuilder::new("t.proto", "pkg")
            .message(MessageBuilder::new("Inner").field("x", 1, Type::Int32))
            .message(MessageBuilder::new("Outer").field("inner", 1, FieldType::message("Inner")))
            .build();

        let outer = &file.message_type[1];
        assert_eq!(outer.field[0].type_name.as_deref(), Some(".pkg.Inner"));
        assert_eq!(file.syntax.as_deref(), Some("proto3"));
    }

    #[test]
    fn test_into_pool_resolves_nested_enum_and_oneof() {
        let pool = FileBuilder::new("t.proto", "pkg")
            .syntax(Syntax::Proto2)
            .message(
                MessageBuilder::new("Holder")
                    .enumeration("Mode", &[("OFF", 0), ("ON", 1)])
                    .field("mode", 1, FieldType::enumeration("Holder.Mode"))
                    .oneof_field("choice", "a", 2, Type::String)
                    .oneof_field("choice", "b", 3, Type::Int64)
                    .repeated("tags", 4, Type::String),
            )
            .into_pool()
            .unwrap();

        let holder = pool.get_message_by_name("pkg.Holder").unwrap();
        let mode = holder.get_field_by_name("mode").unwrap();
        assert!(matches!(mode.kind(), Kind::Enum(_)));
        assert_eq!(holder.oneofs().count(), 1);
        assert_eq!(holder.get_field_by_name("tags").unwrap().cardinality(), Cardinality::Repeated);
    }
}
