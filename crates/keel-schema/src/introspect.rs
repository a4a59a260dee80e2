//! Read-only view of a message descriptor: fields with their labels and
//! type tags, plus nested enums, in declaration order.

use prost_reflect::{Cardinality, FieldDescriptor, Kind, MessageDescriptor};
use serde::Serialize;
use std::fmt;

/// Repetition label of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Optional,
    Required,
    Repeated,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Optional => write!(f, "optional"),
            Label::Required => write!(f, "required"),
            Label::Repeated => write!(f, "repeated"),
        }
    }
}

/// Primitive-or-message type tag of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Bool,
    Bytes,
    Double,
    Enum,
    Fixed32,
    Fixed64,
    Float,
    Group,
    Int32,
    Int64,
    Message,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
    String,
    Uint32,
    Uint64,
}

impl TypeTag {
    #[must_use]
    pub fn of(field: &FieldDescriptor) -> Self {
        if field.is_group() {
            return Self::Group;
        }
        match field.kind() {
            Kind::Double => Self::Double,
            Kind::Float => Self::Float,
            Kind::Int32 => Self::Int32,
            Kind::Int64 => Self::Int64,
            Kind::Uint32 => Self::Uint32,
            Kind::Uint64 => Self::Uint64,
            Kind::Sint32 => Self::Sint32,
            Kind::Sint64 => Self::Sint64,
            Kind::Fixed32 => Self::Fixed32,
            Kind::Fixed64 => Self::Fixed64,
            Kind::Sfixed32 => Self::Sfixed32,
            Kind::Sfixed64 => Self::Sfixed64,
            Kind::Bool => Self::Bool,
            Kind::String => Self::String,
            Kind::Bytes => Self::Bytes,
            Kind::Message(_) => Self::Message,
            Kind::Enum(_) => Self::Enum,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Bytes => "bytes",
            Self::Double => "double",
            Self::Enum => "enum",
            Self::Fixed32 => "fixed32",
            Self::Fixed64 => "fixed64",
            Self::Float => "float",
            Self::Group => "group",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Message => "message",
            Self::Sfixed32 => "sfixed32",
            Self::Sfixed64 => "sfixed64",
            Self::Sint32 => "sint32",
            Self::Sint64 => "sint64",
            Self::String => "string",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSummary {
    pub name: String,
    pub label: Label,
    pub kind: TypeTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumSummary {
    pub name: String,
    pub values: Vec<(String, i32)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    pub name: String,
    pub full_name: String,
    pub fields: Vec<FieldSummary>,
    pub enums: Vec<EnumSummary>,
}

impl MessageSummary {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSummary> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Human-readable field listing, one line per field.
    #[must_use]
    pub fn render_doc(&self) -> String {
        if self.fields.is_empty() {
            return "Fields: none\n".to_string();
        }
        let mut doc = String::from("Fields:\n");
        for field in &self.fields {
            doc.push_str(&format!("    {} ({} {})\n", field.name, field.label, field.kind));
        }
        doc
    }
}

/// Summarize a message descriptor.
#[must_use]
pub fn describe(descriptor: &MessageDescriptor) -> MessageSummary {
    let fields = descriptor
        .fields()
        .map(|field| FieldSummary {
            name: field.name().to_string(),
            label: match field.cardinality() {
                Cardinality::Optional => Label::Optional,
                Cardinality::Required => Label::Required,
                Cardinality::Repeated => Label::Repeated,
            },
            kind: TypeTag::of(&field),
        })
        .collect();

    let enums = descriptor
        .child_enums()
        .map(|e| EnumSummary {
            name: e.name().to_string(),
            values: e.values().map(|v| (v.name().to_string(), v.number())).collect(),
        })
        .collect();

    MessageSummary {
        name: descriptor.name().to_string(),
        full_name: descriptor.full_name().to_string(),
        fields,
        enums,
    }
}
