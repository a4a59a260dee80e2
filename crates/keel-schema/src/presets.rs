//! Ready-made optimizer and profiler instances.

use crate::error::{SchemaError, SchemaResult};
use crate::registry::TypeRegistry;
use crate::synth::Instance;
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_LEARNING_RATE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerPreset {
    /// SGD with momentum 0.9.
    #[default]
    Momentum,
    Sgd,
    Adam,
    Adagrad,
    Rmsprop,
}

impl OptimizerPreset {
    pub const ALL: [OptimizerPreset; 5] = [Self::Momentum, Self::Sgd, Self::Adam, Self::Adagrad, Self::Rmsprop];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Momentum => "momentum",
            Self::Sgd => "sgd",
            Self::Adam => "adam",
            Self::Adagrad => "adagrad",
            Self::Rmsprop => "rmsprop",
        }
    }
}

impl fmt::Display for OptimizerPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizerPreset {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.to_lowercase())
            .ok_or_else(|| SchemaError::InvalidDescription(format!("invalid optimizer type ({s})")))
    }
}

/// Build the optimizer instance for `preset`.
pub fn optimizer(registry: &TypeRegistry, preset: OptimizerPreset, learning_rate: f64) -> SchemaResult<Instance> {
    let lr = ("learn_rate", FieldValue::from(learning_rate));
    match preset {
        OptimizerPreset::Momentum => registry.instantiate("SGD", [lr, ("momentum", 0.9.into())]),
        OptimizerPreset::Sgd => registry.instantiate("SGD", [lr]),
        OptimizerPreset::Adam => {
            registry.instantiate("Adam", [lr, ("beta1", 0.9.into()), ("beta2", 0.99.into()), ("eps", 1e-8.into())])
        }
        OptimizerPreset::Adagrad => registry.instantiate("AdaGrad", [lr, ("eps", 1e-8.into())]),
        OptimizerPreset::Rmsprop => {
            registry.instantiate("RMSprop", [lr, ("decay_rate", 0.99.into()), ("eps", 1e-8.into())])
        }
    }
}

/// Profiler callback; `profile_init` keeps initialization in the profile.
pub fn profiler_callback(registry: &TypeRegistry, profile_init: bool) -> SchemaResult<Instance> {
    registry.instantiate("CallbackProfiler", [("skip_init", FieldValue::from(!profile_init))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;
    use prost_reflect::ReflectMessage;

    fn registry() -> TypeRegistry {
        TypeRegistry::standard(builtin::pool().unwrap(), [builtin::PACKAGE]).unwrap()
    }

    #[test]
    fn test_parse_presets() {
        assert_eq!("adam".parse::<OptimizerPreset>().unwrap(), OptimizerPreset::Adam);
        assert_eq!("RMSprop".parse::<OptimizerPreset>().unwrap(), OptimizerPreset::Rmsprop);
        assert!("lbfgs".parse::<OptimizerPreset>().is_err());
        assert_eq!(OptimizerPreset::default(), OptimizerPreset::Momentum);
    }

    #[test]
    fn test_momentum_is_sgd_with_momentum() {
        let registry = registry();
        let inst = optimizer(&registry, OptimizerPreset::Momentum, 0.1).unwrap();
        assert_eq!(inst.type_name(), "SGD");
        assert_eq!(inst.get("momentum"), Some(&FieldValue::from(0.9)));
        assert_eq!(inst.get("learn_rate"), Some(&FieldValue::from(0.1)));

        let plain = optimizer(&registry, OptimizerPreset::Sgd, 0.1).unwrap();
        assert!(plain.get("momentum").is_none());
    }

    #[test]
    fn test_every_preset_exports_an_optimizer() {
        let registry = registry();
        for preset in OptimizerPreset::ALL {
            let message = optimizer(&registry, preset, DEFAULT_LEARNING_RATE).unwrap().export().unwrap();
            assert_eq!(message.descriptor().name(), "Optimizer");
        }
    }

    #[test]
    fn test_profiler_skip_init_is_inverted() {
        let registry = registry();
        let inst = profiler_callback(&registry, false).unwrap();
        assert_eq!(inst.get("skip_init"), Some(&FieldValue::from(true)));
    }
}
