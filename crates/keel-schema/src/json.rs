//! Experiment descriptions in JSON.
//!
//! A typed object `{"type": "FullyConnected", "args": {"num_neurons": 10}}`
//! builds an instance of the named type. An object without `type` is
//! accepted where the target field is a message with a registered type of
//! the same name, so `{"trainer": {"mini_batch_size": 64}}` works without
//! spelling out `Trainer`. A top-level object without `type` describes an
//! `Experiment`.

use crate::error::{SchemaError, SchemaResult};
use crate::registry::TypeRegistry;
use crate::synth::{Instance, SynthesizedType};
use crate::value::FieldValue;
use prost_reflect::{Kind, Value};
use serde_json::{Map, Value as Json};
use std::sync::Arc;

/// Type used for top-level objects that do not name one.
pub const ROOT_TYPE: &str = "Experiment";

pub fn instance_from_json(registry: &TypeRegistry, value: &Json) -> SchemaResult<Instance> {
    let Json::Object(object) = value else {
        return Err(invalid(format!("expected an object, found {}", json_kind(value))));
    };
    if object.contains_key("type") {
        typed_instance(registry, object)
    } else {
        build(registry, registry.get(ROOT_TYPE)?, object)
    }
}

/// Parse `text` and build the instance it describes.
pub fn instance_from_str(registry: &TypeRegistry, text: &str) -> SchemaResult<Instance> {
    let value: Json = serde_json::from_str(text)?;
    instance_from_json(registry, &value)
}

fn typed_instance(registry: &TypeRegistry, object: &Map<String, Json>) -> SchemaResult<Instance> {
    if let Some(key) = object.keys().find(|k| *k != "type" && *k != "args") {
        return Err(invalid(format!("unexpected key {key:?} next to \"type\"")));
    }
    let type_name = object
        .get("type")
        .and_then(Json::as_str)
        .ok_or_else(|| invalid("\"type\" must be a string".to_string()))?;
    let ty = registry.get(type_name)?;

    match object.get("args") {
        None | Some(Json::Null) => build(registry, ty, &Map::new()),
        Some(Json::Object(args)) => build(registry, ty, args),
        Some(other) => Err(invalid(format!("\"args\" of {type_name} must be an object, found {}", json_kind(other)))),
    }
}

fn build(registry: &TypeRegistry, ty: &Arc<SynthesizedType>, args: &Map<String, Json>) -> SchemaResult<Instance> {
    let mut kwargs = Vec::with_capacity(args.len());
    for (name, value) in args {
        if value.is_null() {
            continue;
        }
        let converted = convert(registry, ty, name, value)?;
        kwargs.push((name.clone(), converted));
    }
    ty.instantiate(kwargs)
}

fn convert(registry: &TypeRegistry, ty: &Arc<SynthesizedType>, field: &str, value: &Json) -> SchemaResult<FieldValue> {
    match value {
        Json::Null => Err(invalid(format!("null inside a list for {}.{field}", ty.name()))),
        Json::Bool(b) => Ok(FieldValue::from(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(FieldValue::from(i))
            } else if let Some(u) = n.as_u64() {
                Ok(FieldValue::from(u))
            } else {
                n.as_f64()
                    .map(FieldValue::from)
                    .ok_or_else(|| invalid(format!("unrepresentable number {n} for {}.{field}", ty.name())))
            }
        }
        Json::String(s) => Ok(FieldValue::Scalar(Value::String(s.clone()))),
        Json::Array(items) => {
            items.iter().map(|item| convert(registry, ty, field, item)).collect::<SchemaResult<Vec<_>>>().map(FieldValue::List)
        }
        Json::Object(object) if object.contains_key("type") => typed_instance(registry, object).map(FieldValue::from),
        Json::Object(object) => {
            let target = message_type_of(registry, ty, field).ok_or_else(|| {
                invalid(format!("{}.{field} needs a \"type\" for its object value", ty.name()))
            })?;
            build(registry, target, object).map(FieldValue::from)
        }
    }
}

/// Registered type for the message kind of `field`, if unambiguous.
fn message_type_of<'r>(registry: &'r TypeRegistry, ty: &SynthesizedType, field: &str) -> Option<&'r Arc<SynthesizedType>> {
    let descriptor = ty.descriptor().get_field_by_name(field)?;
    let Kind::Message(message) = descriptor.kind() else {
        return None;
    };
    registry.lookup(message.name()).filter(|candidate| *candidate.descriptor() == message)
}

fn invalid(reason: String) -> SchemaError {
    SchemaError::InvalidDescription(reason)
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}
