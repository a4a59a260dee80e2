//! Reading and writing experiment files.

use crate::error::SchemaResult;
use prost_reflect::prost::Message as _;
use prost_reflect::text_format::FormatOptions;
use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage};
use std::fs;
use std::path::Path;

/// Default file name of the experiment inside a work directory.
pub const EXPERIMENT_FILE: &str = "experiment.prototext";

fn ensure_parent(path: &Path) -> SchemaResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Render a message in text format, one field per line.
#[must_use]
pub fn to_prototext(message: &DynamicMessage) -> String {
    message.to_text_format_with_options(&FormatOptions::new().pretty(true))
}

/// Write `message` as text format, creating parent directories.
pub fn save_prototext(path: impl AsRef<Path>, message: &DynamicMessage) -> SchemaResult<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    fs::write(path, to_prototext(message))?;
    tracing::info!(path = %path.display(), message = message.descriptor().name(), "wrote prototext");
    Ok(())
}

/// Write `message` in the binary wire format.
pub fn save_binary(path: impl AsRef<Path>, message: &DynamicMessage) -> SchemaResult<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    fs::write(path, message.encode_to_vec())?;
    tracing::info!(path = %path.display(), message = message.descriptor().name(), "wrote binary experiment");
    Ok(())
}

pub fn load_prototext(path: impl AsRef<Path>, descriptor: MessageDescriptor) -> SchemaResult<DynamicMessage> {
    let text = fs::read_to_string(path)?;
    Ok(DynamicMessage::parse_text_format(descriptor, &text)?)
}

pub fn load_binary(path: impl AsRef<Path>, descriptor: MessageDescriptor) -> SchemaResult<DynamicMessage> {
    let bytes = fs::read(path)?;
    Ok(DynamicMessage::decode(descriptor, bytes.as_slice())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;
    use prost_reflect::Value;

    fn trainer() -> DynamicMessage {
        let pool = builtin::pool().unwrap();
        let mut message = DynamicMessage::new(pool.get_message_by_name("keel.Trainer").unwrap());
        message.set_field_by_name("mini_batch_size", Value::I64(64));
        message.set_field_by_name("name", Value::String("t0".to_string()));
        message
    }

    #[test]
    fn test_prototext_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/run/experiment.prototext");
        let message = trainer();

        save_prototext(&path, &message).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("mini_batch_size: 64"));

        let loaded = load_prototext(&path, message.descriptor()).unwrap();
        assert_eq!(loaded, message);
    }

    #[test]
    fn test_binary_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiment.bin");
        let message = trainer();

        save_binary(&path, &message).unwrap();
        let loaded = load_binary(&path, message.descriptor()).unwrap();
        assert_eq!(loaded, message);
    }

    #[test]
    fn test_load_prototext_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.prototext");
        fs::write(&path, "mini_batch_size: \"lots\"").unwrap();
        let err = load_prototext(&path, trainer().descriptor()).unwrap_err();
        assert!(matches!(err, crate::SchemaError::TextFormat(_)));
    }
}
