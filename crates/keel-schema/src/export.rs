//! Conversion of instances into schema messages.

use crate::error::{SchemaError, SchemaResult};
use crate::synth::Instance;
use crate::value::FieldValue;
use prost::bytes::Bytes;
use prost_reflect::prost::Message as _;
use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MessageDescriptor, ReflectMessage, Value};

/// Export an instance to a freshly built message.
///
/// When the base type exports, the result is the base's container message
/// with this instance filling the sub-field named after the type; otherwise
/// it is a message of the type's own descriptor. Unset fields are skipped.
pub fn export(instance: &Instance) -> SchemaResult<DynamicMessage> {
    let ty = instance.synthesized_type();

    let Some(mut container) = ty.base().export(instance.base_args())? else {
        let mut message = DynamicMessage::new(ty.descriptor().clone());
        populate(&mut message, instance)?;
        return Ok(message);
    };

    let container_desc = container.descriptor();
    let field = container_desc.get_field_by_name(ty.base_field_name()).ok_or_else(|| {
        SchemaError::MissingBaseField {
            container: container_desc.full_name().to_string(),
            field: ty.base_field_name().to_string(),
        }
    })?;
    expect_message_kind(&field, ty.descriptor())?;

    // Taking the slot mutably marks the sub-message present even when no
    // field of this instance is set.
    match container.get_field_mut(&field) {
        Value::Message(sub) => populate(sub, instance)?,
        other => {
            return Err(SchemaError::TypeMismatch {
                field: field.full_name().to_string(),
                expected: ty.descriptor().full_name().to_string(),
                found: format!("{other:?}"),
            })
        }
    }

    tracing::trace!(type_name = ty.name(), container = container_desc.name(), "exported instance");
    Ok(container)
}

fn populate(message: &mut DynamicMessage, instance: &Instance) -> SchemaResult<()> {
    for (name, value) in instance.set_fields() {
        assign_field(message, name, value)?;
    }
    Ok(())
}

/// Assign `value` to the field `name` of `message`.
///
/// Lists extend repeated fields, messages and instances merge into
/// sub-messages, scalars are coerced to the field's kind.
pub(crate) fn assign_field(message: &mut DynamicMessage, name: &str, value: &FieldValue) -> SchemaResult<()> {
    let descriptor = message.descriptor();
    let field = descriptor.get_field_by_name(name).ok_or_else(|| SchemaError::UnknownField {
        type_name: descriptor.full_name().to_string(),
        field: name.to_string(),
    })?;

    if field.is_map() {
        return Err(mismatch(&field, "a supported field", value));
    }

    if field.is_list() {
        let FieldValue::List(items) = value else {
            return Err(mismatch(&field, "list", value));
        };
        let items = items.iter().map(|item| element(&field, item)).collect::<SchemaResult<Vec<_>>>()?;
        match message.get_field_mut(&field) {
            Value::List(existing) => existing.extend(items),
            _ => return Err(mismatch(&field, "list", value)),
        }
        return Ok(());
    }

    match value {
        FieldValue::Message(source) => merge_into(message, &field, source),
        FieldValue::Instance(inst) if matches!(field.kind(), Kind::Message(_)) => {
            let exported = inst.export()?;
            merge_into(message, &field, &exported)
        }
        other => {
            let coerced = coerce(&field, other)?;
            message.try_set_field(&field, coerced).map_err(|e| SchemaError::TypeMismatch {
                field: field.full_name().to_string(),
                expected: field_kind_name(&field),
                found: e.to_string(),
            })
        }
    }
}

fn merge_into(message: &mut DynamicMessage, field: &FieldDescriptor, source: &DynamicMessage) -> SchemaResult<()> {
    let Kind::Message(expected) = field.kind() else {
        return Err(mismatch(field, &field_kind_name(field), &FieldValue::Message(source.clone())));
    };
    expect_descriptor(field, &expected, source)?;

    match message.get_field_mut(field) {
        Value::Message(target) => {
            target.merge(source.encode_to_vec().as_slice())?;
            Ok(())
        }
        _ => Err(mismatch(field, expected.full_name(), &FieldValue::Message(source.clone()))),
    }
}

/// Convert one element of a list destined for a repeated field.
fn element(field: &FieldDescriptor, value: &FieldValue) -> SchemaResult<Value> {
    match value {
        FieldValue::List(_) => Err(mismatch(field, &field_kind_name(field), value)),
        FieldValue::Instance(inst) if matches!(field.kind(), Kind::Message(_)) => {
            let exported = inst.export()?;
            coerce(field, &FieldValue::Message(exported))
        }
        other => coerce(field, other),
    }
}

/// Convert a single value to the kind of `field`.
fn coerce(field: &FieldDescriptor, value: &FieldValue) -> SchemaResult<Value> {
    match (field.kind(), value) {
        (_, FieldValue::Scalar(v)) => coerce_scalar(field, v).ok_or_else(|| mismatch(field, &field_kind_name(field), value))?,
        (Kind::Message(expected), FieldValue::Message(m)) => {
            expect_descriptor(field, &expected, m)?;
            Ok(Value::Message(m.clone()))
        }
        (Kind::String, FieldValue::Instance(inst)) => reference(field, inst).map(Value::String),
        (Kind::String, FieldValue::List(items)) => {
            let names = items
                .iter()
                .map(|item| match item {
                    FieldValue::Scalar(Value::String(s)) => Ok(s.clone()),
                    FieldValue::Instance(inst) => reference(field, inst),
                    other => Err(mismatch(field, "string or named instance", other)),
                })
                .collect::<SchemaResult<Vec<_>>>()?;
            Ok(Value::String(names.join(" ")))
        }
        _ => Err(mismatch(field, &field_kind_name(field), value)),
    }
}

/// Scalar conversion. The outer `None` means the value's kind cannot be
/// converted at all; range and enum failures are reported as errors.
fn coerce_scalar(field: &FieldDescriptor, value: &Value) -> Option<SchemaResult<Value>> {
    let converted = match field.kind() {
        Kind::Double => Ok(Value::F64(as_f64(value)?)),
        Kind::Float => Ok(Value::F32(as_f64(value)? as f32)),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => integer::<i32>(field, value)?.map(Value::I32),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => integer::<i64>(field, value)?.map(Value::I64),
        Kind::Uint32 | Kind::Fixed32 => integer::<u32>(field, value)?.map(Value::U32),
        Kind::Uint64 | Kind::Fixed64 => integer::<u64>(field, value)?.map(Value::U64),
        Kind::Bool => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            _ => return None,
        },
        Kind::String => match value {
            Value::String(s) => Ok(Value::String(s.clone())),
            _ => return None,
        },
        Kind::Bytes => match value {
            Value::Bytes(b) => Ok(Value::Bytes(b.clone())),
            Value::String(s) => Ok(Value::Bytes(Bytes::from(s.clone().into_bytes()))),
            _ => return None,
        },
        Kind::Enum(enum_desc) => match value {
            Value::EnumNumber(n) => Ok(Value::EnumNumber(*n)),
            Value::String(s) => enum_desc.get_value_by_name(s).map(|v| Value::EnumNumber(v.number())).ok_or_else(|| {
                SchemaError::UnknownEnumValue { field: field.full_name().to_string(), value: s.clone() }
            }),
            other => integer::<i32>(field, other)?.map(Value::EnumNumber),
        },
        Kind::Message(_) => return None,
    };
    Some(converted)
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::F64(v) => Some(*v),
        Value::F32(v) => Some(f64::from(*v)),
        Value::I32(v) => Some(f64::from(*v)),
        Value::U32(v) => Some(f64::from(*v)),
        Value::I64(v) => Some(*v as f64),
        Value::U64(v) => Some(*v as f64),
        _ => None,
    }
}

fn integer<T: TryFrom<i128>>(field: &FieldDescriptor, value: &Value) -> Option<SchemaResult<T>> {
    let wide = match value {
        Value::I32(v) => i128::from(*v),
        Value::I64(v) => i128::from(*v),
        Value::U32(v) => i128::from(*v),
        Value::U64(v) => i128::from(*v),
        _ => return None,
    };
    Some(T::try_from(wide).map_err(|_| SchemaError::OutOfRange {
        field: field.full_name().to_string(),
        value: wide.to_string(),
    }))
}

fn reference(field: &FieldDescriptor, inst: &Instance) -> SchemaResult<String> {
    inst.reference_name().map(str::to_string).ok_or_else(|| SchemaError::TypeMismatch {
        field: field.full_name().to_string(),
        expected: "named instance".to_string(),
        found: format!("unnamed instance of {}", inst.type_name()),
    })
}

fn expect_message_kind(field: &FieldDescriptor, expected: &MessageDescriptor) -> SchemaResult<()> {
    match field.kind() {
        Kind::Message(actual) if actual == *expected => Ok(()),
        _ => Err(SchemaError::TypeMismatch {
            field: field.full_name().to_string(),
            expected: expected.full_name().to_string(),
            found: field_kind_name(field),
        }),
    }
}

fn expect_descriptor(field: &FieldDescriptor, expected: &MessageDescriptor, message: &DynamicMessage) -> SchemaResult<()> {
    let actual = message.descriptor();
    if actual == *expected {
        Ok(())
    } else {
        Err(SchemaError::TypeMismatch {
            field: field.full_name().to_string(),
            expected: expected.full_name().to_string(),
            found: actual.full_name().to_string(),
        })
    }
}

fn field_kind_name(field: &FieldDescriptor) -> String {
    match field.kind() {
        Kind::Message(m) => m.full_name().to_string(),
        Kind::Enum(e) => format!("enum {}", e.full_name()),
        _ => crate::introspect::TypeTag::of(field).to_string(),
    }
}

fn mismatch(field: &FieldDescriptor, expected: &str, value: &FieldValue) -> SchemaError {
    SchemaError::TypeMismatch {
        field: field.full_name().to_string(),
        expected: expected.to_string(),
        found: value.kind_name(),
    }
}
