use crate::synth::Instance;
use prost_reflect::{DynamicMessage, ReflectMessage, Value};

/// Value held by an instance attribute or a base-constructor argument.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Plain scalar (number, bool, string, bytes, enum number).
    Scalar(Value),
    /// Sequence; extends repeated fields in order.
    List(Vec<FieldValue>),
    /// Already-built schema message; merged into the target field.
    Message(DynamicMessage),
    /// Nested synthesized instance; exported then merged.
    Instance(Box<Instance>),
}

impl FieldValue {
    /// Short description of the value's shape, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> String {
        match self {
            FieldValue::Scalar(v) => match v {
                Value::Bool(_) => "bool".to_string(),
                Value::I32(_) => "int32".to_string(),
                Value::I64(_) => "int64".to_string(),
                Value::U32(_) => "uint32".to_string(),
                Value::U64(_) => "uint64".to_string(),
                Value::F32(_) => "float".to_string(),
                Value::F64(_) => "double".to_string(),
                Value::String(_) => "string".to_string(),
                Value::Bytes(_) => "bytes".to_string(),
                Value::EnumNumber(_) => "enum".to_string(),
                Value::Message(m) => format!("message {}", m.descriptor().full_name()),
                Value::List(_) => "list".to_string(),
                Value::Map(_) => "map".to_string(),
            },
            FieldValue::List(_) => "list".to_string(),
            FieldValue::Message(m) => format!("message {}", m.descriptor().full_name()),
            FieldValue::Instance(i) => format!("instance of {}", i.type_name()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            FieldValue::Instance(i) => Some(i),
            _ => None,
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::Scalar(Value::$variant(value))
                }
            }
        )*
    };
}

scalar_from! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Scalar(Value::String(value.to_string()))
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Scalar(value)
    }
}

impl From<DynamicMessage> for FieldValue {
    fn from(value: DynamicMessage) -> Self {
        FieldValue::Message(value)
    }
}

impl From<Instance> for FieldValue {
    fn from(value: Instance) -> Self {
        FieldValue::Instance(Box::new(value))
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        FieldValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Ordered keyword arguments for [`crate::SynthesizedType::instantiate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs {
    entries: Vec<(String, FieldValue)>,
}

impl Kwargs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument; a repeated key replaces the earlier value.
    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl IntoIterator for Kwargs {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Kwargs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut kwargs = Kwargs::new();
        for (k, v) in iter {
            kwargs.insert(k, v);
        }
        kwargs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_converts_to_list() {
        let value: FieldValue = vec!["x", "y"].into();
        assert_eq!(
            value,
            FieldValue::List(vec![
                FieldValue::Scalar(Value::String("x".to_string())),
                FieldValue::Scalar(Value::String("y".to_string())),
            ])
        );
    }

    #[test]
    fn test_kwargs_replace_keeps_position() {
        let kwargs = Kwargs::new().arg("a", 1).arg("b", true).arg("a", 2);
        let entries: Vec<_> = kwargs.into_iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ("a".to_string(), FieldValue::from(2)));
    }
}
