use std::path::PathBuf;

/// Errors that abort a scene load. The previously active scene stays.
#[derive(Debug, thiserror::Error)]
pub enum SceneLoadError {
    /// Failed to read a scene file from disk.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scene description is not valid RON.
    #[error("failed to parse scene description: {0}")]
    Parse(#[source] ron::error::SpannedError),

    /// A referenced model file does not exist.
    #[error("model not found: {0}")]
    MissingModel(PathBuf),

    /// A model file exists but could not be decoded.
    #[error("model {path} is corrupt: {reason}")]
    CorruptModel { path: PathBuf, reason: String },

    /// The load was cancelled between stages.
    #[error("scene load cancelled")]
    Cancelled,
}
