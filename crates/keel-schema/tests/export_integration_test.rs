//! Integration tests for synthesizing types and exporting experiments.

use keel_schema::descriptor::{FileBuilder, MessageBuilder, ScalarType, Syntax};
use keel_schema::experiment::{load_prototext, save_prototext};
use keel_schema::{builtin, FieldValue, Kwargs, ObjectBase, SchemaError, SynthesizedType, TypeRegistry};
use prost_reflect::{ReflectMessage, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn standard_registry() -> TypeRegistry {
    TypeRegistry::standard(builtin::pool().unwrap(), [builtin::PACKAGE]).unwrap()
}

#[test]
fn test_two_field_message_example() {
    let pool = FileBuilder::new("t.proto", "example")
        .syntax(Syntax::Proto2)
        .message(MessageBuilder::new("T").field("a", 1, ScalarType::Int32).repeated("b", 2, ScalarType::String))
        .into_pool()
        .unwrap();
    let t = SynthesizedType::synthesize(pool.get_message_by_name("example.T").unwrap(), "t", Arc::new(ObjectBase)).unwrap();

    let message = t.build(Kwargs::new().arg("a", 5).arg("b", vec!["x", "y"])).unwrap().export().unwrap();
    assert_eq!(message.get_field_by_name("a").unwrap().as_i32(), Some(5));
    let b: Vec<String> = message
        .get_field_by_name("b")
        .unwrap()
        .as_list()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(b, vec!["x", "y"]);

    assert!(matches!(t.build(Kwargs::new().arg("c", 1)), Err(SchemaError::UnknownArgument { .. })));
}

#[test]
fn test_unset_fields_absent_and_export_idempotent() {
    let registry = standard_registry();
    let conv = registry
        .instantiate("Convolution", [("out_channels", FieldValue::from(16)), ("has_bias", FieldValue::from(false))])
        .unwrap();

    let first = conv.export().unwrap();
    let second = conv.export().unwrap();
    assert_eq!(first, second);

    let layer = first.get_field_by_name("convolution").unwrap();
    let sub = layer.as_message().unwrap();
    assert!(sub.has_field_by_name("out_channels"));
    assert!(!sub.has_field_by_name("groups"));
    assert!(!sub.has_field_by_name("kernel_size"));
}

#[test]
fn test_layers_auto_named_and_linked() {
    let registry = standard_registry();
    let input = registry.instantiate("Input", [("data_field", "samples")]).unwrap();
    let fc = registry
        .instantiate("FullyConnected", [("num_neurons", FieldValue::from(10)), ("parents", FieldValue::from(vec![input.clone()]))])
        .unwrap();

    let input_name = input.reference_name().unwrap().to_string();
    assert!(input_name.starts_with("layer"));

    let exported = fc.export().unwrap();
    assert_eq!(exported.get_field_by_name("parents").unwrap().as_str(), Some(input_name.as_str()));
    assert!(exported.get_field_by_name("name").unwrap().as_str().unwrap().starts_with("layer"));
}

#[test]
fn test_enum_namespace_value_exports() {
    let registry = standard_registry();
    let softmax = registry.get("Softmax").unwrap();
    let channel = softmax.enum_value("SoftmaxMode", "CHANNEL").unwrap();
    let message = softmax.build(Kwargs::new().arg("name", "prob").arg("softmax_mode", channel)).unwrap().export().unwrap();
    let sub = message.get_field_by_name("softmax").unwrap();
    assert_eq!(sub.as_message().unwrap().get_field_by_name("softmax_mode").unwrap().as_enum_number(), Some(1));
}

#[test]
fn test_full_experiment_round_trip_through_prototext() {
    let registry = standard_registry();

    let input = registry.instantiate("Input", [("name", "data")]).unwrap();
    let fc = registry
        .instantiate(
            "FullyConnected",
            [("name", FieldValue::from("fc")), ("parents", FieldValue::from(vec![input.clone()])), ("num_neurons", 4.into())],
        )
        .unwrap();
    let prob = registry
        .instantiate("Softmax", [("name", FieldValue::from("prob")), ("parents", FieldValue::from(vec![fc.clone()]))])
        .unwrap();
    let term = registry.instantiate("LayerTerm", [("layer", "prob")]).unwrap();
    let objective = registry.instantiate("ObjectiveFunction", [("layer_term", FieldValue::from(vec![term]))]).unwrap();
    let model = registry
        .instantiate(
            "Model",
            [
                ("num_epochs", FieldValue::from(3)),
                ("layer", FieldValue::from(vec![input, fc, prob])),
                ("objective_function", objective.into()),
                ("callback", FieldValue::from(vec![registry.instantiate("CallbackPrint", [("interval", 1)]).unwrap()])),
            ],
        )
        .unwrap();
    let trainer = registry.instantiate("Trainer", [("mini_batch_size", 32)]).unwrap();
    let sgd = keel_schema::presets::optimizer(&registry, keel_schema::OptimizerPreset::Momentum, 0.1).unwrap();
    let experiment = registry
        .instantiate("Experiment", [("model", FieldValue::from(model)), ("trainer", trainer.into()), ("optimizer", sgd.into())])
        .unwrap();

    let message = experiment.export().unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("experiment.prototext");
    save_prototext(&path, &message).unwrap();

    let loaded = load_prototext(&path, message.descriptor()).unwrap();
    assert_eq!(loaded, message);

    let model = loaded.get_field_by_name("model").unwrap();
    let model = model.as_message().unwrap();
    let layers = model.get_field_by_name("layer").unwrap();
    let layers = layers.as_list().unwrap();
    assert_eq!(layers.len(), 3);
    let parents: Vec<_> = layers
        .iter()
        .map(|l| l.as_message().unwrap().get_field_by_name("parents").unwrap().as_str().unwrap().to_string())
        .collect();
    assert_eq!(parents, vec!["", "data", "fc"]);

    let optimizer = loaded.get_field_by_name("optimizer").unwrap();
    let sgd = optimizer.as_message().unwrap().get_field_by_name("sgd").unwrap();
    assert_eq!(sgd.as_message().unwrap().get_field_by_name("momentum").unwrap().as_f64(), Some(0.9));
}

#[test]
fn test_message_values_merge() {
    let registry = standard_registry();
    let pool = registry.pool().clone();
    let mut init = prost_reflect::DynamicMessage::new(pool.get_message_by_name("keel.Initializer").unwrap());
    let mut constant = prost_reflect::DynamicMessage::new(pool.get_message_by_name("keel.ConstantInitializer").unwrap());
    constant.set_field_by_name("value", Value::F64(0.5));
    init.set_field_by_name("constant_initializer", Value::Message(constant));

    let weights = registry.instantiate("Weights", [("name", FieldValue::from("w")), ("initializer", init.clone().into())]).unwrap();
    let message = weights.export().unwrap();
    assert_eq!(message.get_field_by_name("initializer").unwrap().as_message(), Some(&init));
}
