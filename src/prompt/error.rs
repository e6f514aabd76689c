use std::path::PathBuf;

use thiserror::Error;

/// Failure to locate or parse a prompt definition.
#[derive(Debug, Error)]
pub enum PromptError {
    /// No definition file exists for the requested name and version.
    #[error("prompt definition not found: {path}")]
    NotFound { path: PathBuf },

    /// The definition file exists but could not be read.
    #[error("failed to read prompt definition {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The definition file is not valid YAML or lacks `system`/`user`.
    #[error("failed to parse prompt definition {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type PromptResult<T> = Result<T, PromptError>;
