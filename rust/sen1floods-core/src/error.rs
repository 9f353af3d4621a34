// rust/sen1floods-core/src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between a manifest row and a decoded example.
#[derive(Error, Debug)]
pub enum FloodsError {
    /// The manifest file could not be opened or read.
    #[error("Manifest '{path}' is not accessible: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not cached locally and remote fetch was not allowed.
    #[error("File not accessible: {path}")]
    NotAccessible {
        path: PathBuf,
    },

    /// The remote store could not produce the object.
    #[error("Remote fetch of '{path}' failed: {message}")]
    RemoteFetch {
        path: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A manifest row is not two plain file names. `line` is 1-based.
    #[error("Malformed manifest '{path}' at line {line}: {message}")]
    Format {
        path: PathBuf,
        line: u64,
        message: String,
    },

    /// Reading or writing the local cache failed, or a file name cannot
    /// be placed in it.
    #[error("Storage error at '{path}': {message}")]
    Storage {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Bytes are not a raster the codec understands, or a raster cannot
    /// be encoded.
    #[error("Raster codec error: {message}")]
    Codec {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A decoded example has the wrong shape for the declared features.
    #[error("Example {index} does not match schema: {message}")]
    Schema {
        index: usize,
        message: String,
    },

    #[error("Unknown split '{name}'")]
    UnknownSplit {
        name: String,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

pub type Result<T> = std::result::Result<T, FloodsError>;

impl FloodsError {
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }

    pub fn not_accessible(path: impl Into<PathBuf>) -> Self {
        Self::NotAccessible { path: path.into() }
    }

    pub fn remote_fetch(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteFetch {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn remote_fetch_with_source(
        path: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::RemoteFetch {
            path: path.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn format(path: impl Into<PathBuf>, line: u64, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
            source: None,
        }
    }

    pub fn codec_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Codec {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn schema(index: usize, message: impl Into<String>) -> Self {
        Self::Schema {
            index,
            message: message.into(),
        }
    }

    pub fn unknown_split(name: impl Into<String>) -> Self {
        Self::UnknownSplit { name: name.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
