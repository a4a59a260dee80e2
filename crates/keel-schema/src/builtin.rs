//! Built-in experiment schema (proto3 package `keel`).
//!
//! The schema lives in `proto/keel/experiment.proto` and is compiled into a
//! descriptor set by the build script.

use crate::error::SchemaResult;
use prost_reflect::DescriptorPool;

pub const PACKAGE: &str = "keel";
pub const FILE_NAME: &str = "keel/experiment.proto";

const DESCRIPTOR_SET: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/keel_descriptor.bin"));

/// Descriptor pool holding the built-in schema.
pub fn pool() -> SchemaResult<DescriptorPool> {
    load_descriptor_set(DESCRIPTOR_SET)
}

/// Encoded `FileDescriptorSet` of the built-in schema, the same format
/// `protoc --descriptor_set_out` writes.
#[must_use]
pub fn descriptor_set_bytes() -> &'static [u8] {
    DESCRIPTOR_SET
}

/// Load an external schema from an encoded `FileDescriptorSet`.
pub fn load_descriptor_set(bytes: &[u8]) -> SchemaResult<DescriptorPool> {
    let pool = DescriptorPool::decode(bytes)?;
    tracing::debug!(files = pool.files().count(), "loaded descriptor set");
    Ok(pool)
}
