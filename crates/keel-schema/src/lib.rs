//! Schema-driven experiment types for the keel launcher.
//!
//! Types are synthesized at runtime from Protobuf message descriptors: each
//! member of a container message (`Layer`, `Callback`, `Optimizer`, ...)
//! becomes a [`SynthesizedType`] whose instances are built from keyword
//! arguments and exported back to [`prost_reflect::DynamicMessage`]s.
//!
//! ```no_run
//! use keel_schema::{builtin, Kwargs, TypeRegistry};
//!
//! let registry = TypeRegistry::standard(builtin::pool()?, [builtin::PACKAGE])?;
//! let fc = registry.get("FullyConnected")?.build(Kwargs::new().arg("num_neurons", 10))?;
//! let layer = fc.export()?;
//! # Ok::<(), keel_schema::SchemaError>(())
//! ```

pub mod base;
pub mod builtin;
pub mod descriptor;
pub mod error;
pub mod experiment;
pub mod export;
pub mod introspect;
pub mod json;
pub mod presets;
pub mod registry;
pub mod synth;
pub mod value;

pub use base::{BaseArgs, BaseType, ContainerBase, ObjectBase};
pub use error::{SchemaError, SchemaResult};
pub use export::export;
pub use introspect::{describe, EnumSummary, FieldSummary, Label, MessageSummary, TypeTag};
pub use presets::OptimizerPreset;
pub use registry::TypeRegistry;
pub use synth::{EnumNamespace, Instance, SynthesizedType};
pub use value::{FieldValue, Kwargs};

pub use prost_reflect;
