//! Error types for building and launching batch scripts.

use keel_schema::SchemaError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for launcher operations.
pub type LaunchResult<T> = std::result::Result<T, LaunchError>;

/// Errors that can occur while preparing or launching a job.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Script file already exists and overwriting was not requested.
    #[error("batch script already exists: {0} (pass overwrite to replace it)")]
    ScriptExists(PathBuf),

    /// Options that cannot produce a runnable job.
    #[error("invalid launch options: {0}")]
    InvalidOptions(String),

    /// Unrecognized scheduler name.
    #[error("unknown scheduler: {0}")]
    UnknownScheduler(String),

    /// External program could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Configuration file could not be read or parsed.
    #[error("configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Experiment could not be written.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_exists_names_path() {
        let err = LaunchError::ScriptExists(PathBuf::from("/tmp/run/batch.sh"));
        assert!(err.to_string().contains("/tmp/run/batch.sh"));
    }

    #[test]
    fn test_spawn_keeps_source() {
        let err = LaunchError::Spawn {
            program: "sbatch".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().starts_with("failed to start sbatch"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
