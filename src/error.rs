use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading the platform media session or its artwork.
///
/// None of these reach the `track` caller: the handler logs them and
/// answers as if nothing were playing.
#[derive(Error, Debug)]
pub enum MediaError {
    /// The OS media API could not be reached at all
    #[error("media backend '{0}' is not available")]
    Unavailable(&'static str),

    /// The OS media API answered with an error
    #[error("media backend '{backend}' failed: {details}")]
    Backend {
        backend: &'static str,
        details: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("artwork could not be decoded: {0}")]
    Image(#[from] image::ImageError),

    #[error("artwork fetch from '{url}' failed: {details}")]
    Http { url: String, details: String },
}

impl MediaError {
    pub fn backend(backend: &'static str, details: impl ToString) -> Self {
        Self::Backend {
            backend,
            details: details.to_string(),
        }
    }
}

/// Errors raised while locating, reading or writing the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse settings at '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("no configuration directory could be determined for this user")]
    NoConfigDir,
}
