use thiserror::Error;

pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema: {0}")]
    Descriptor(#[from] prost_reflect::DescriptorError),

    #[error("failed to decode descriptor set: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("type {type_name} and its base {base} both define the field {field}")]
    FieldCollision { type_name: String, base: String, field: String },

    #[error("field {field} of {container} is not a message and cannot produce a type")]
    NotAMessage { container: String, field: String },

    #[error("unknown argument {argument} for {type_name}")]
    UnknownArgument { type_name: String, argument: String },

    #[error("{type_name} has no field {field}")]
    UnknownField { type_name: String, field: String },

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("type name {name} is ambiguous ({first} and {second})")]
    AmbiguousType { name: String, first: String, second: String },

    #[error("container {container} has no field {field} to hold the exported message")]
    MissingBaseField { container: String, field: String },

    #[error("field {field} expects {expected}, got {found}")]
    TypeMismatch { field: String, expected: String, found: String },

    #[error("value {value} is out of range for field {field}")]
    OutOfRange { field: String, value: String },

    #[error("{value} is not a value of enum field {field}")]
    UnknownEnumValue { field: String, value: String },

    #[error("invalid experiment description: {0}")]
    InvalidDescription(String),

    #[error("failed to parse text format: {0}")]
    TextFormat(#[from] prost_reflect::text_format::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_message_names_all_parties() {
        let err = SchemaError::FieldCollision {
            type_name: "FullyConnected".to_string(),
            base: "Layer".to_string(),
            field: "name".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("FullyConnected"));
        assert!(msg.contains("Layer"));
        assert!(msg.contains("name"));
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SchemaError = io_err.into();
        assert!(matches!(err, SchemaError::Io(_)));
    }
}
