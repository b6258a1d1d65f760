//! Error types for converge-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from declaration, settings, and snapshot decoding.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, annotated with the path being read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with the file path and serde_yaml line context.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML serialization error (settings write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// `dirs::home_dir()` returned `None`; `~/.converge/` cannot be located.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The declaration file did not exist at the given path.
    #[error("declaration not found at {path}")]
    DeclarationNotFound { path: PathBuf },

    /// A persisted snapshot carries a schema version this build does not know.
    #[error("unsupported snapshot version {version} (current is {current})")]
    UnsupportedVersion { version: u32, current: u32 },

    /// The `fields` of a persisted snapshot do not match its declared version.
    #[error("snapshot fields do not match schema version {version}: {source}")]
    SnapshotFields {
        version: u32,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience constructor for [`CoreError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
