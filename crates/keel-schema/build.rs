//! Build script for keel-schema.
//!
//! Compiles the built-in experiment schema into an encoded
//! `FileDescriptorSet` that the crate embeds for runtime reflection.
//! `protox` parses the `.proto` sources in-process, so no `protoc` is needed.
#![allow(clippy::disallowed_methods)]
#![allow(clippy::disallowed_macros)]

use prost::Message as _;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);

    let file_descriptors = protox::compile(["keel/experiment.proto"], ["proto/"])?;
    std::fs::write(out_dir.join("keel_descriptor.bin"), file_descriptors.encode_to_vec())?;

    println!("cargo:rerun-if-changed=proto/");

    Ok(())
}
