//! Error types for build information capture and decoding.

use std::path::PathBuf;

use crate::command::CommandError;

/// Core error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A mandatory external command failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// A field had no `key:value` separator.
    #[error("malformed field `{0}`: missing `:` separator")]
    MissingSeparator(String),

    /// A field key outside the known set.
    #[error("unknown field key `{0}`")]
    UnknownKey(String),

    /// An envelope appeared inside an envelope.
    #[error("nested envelope is not allowed")]
    NestedEnvelope,

    /// Base64 payload could not be decoded.
    #[error("invalid base64 payload for `{key}`: {source}")]
    Encoding {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    /// Decoded payload is not UTF-8 text.
    #[error("payload for `{key}` is not valid UTF-8")]
    Utf8 {
        key: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// The generated artifact could not be persisted.
    #[error("failed to generate file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `OUT_DIR` is not set (not running inside a build script).
    #[error("OUT_DIR is not set; generate_to_out_dir must run from a build script")]
    MissingOutDir,

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for xbi operations.
pub type Result<T> = std::result::Result<T, Error>;
