//! Error types for codec operations.

use thiserror::Error;

/// Errors that can occur while decoding a single source.
#[derive(Error, Debug)]
pub enum CodecError {
    /// I/O error while reading the stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the `image` crate decoders
    #[error("{0}")]
    Image(#[from] image::ImageError),

    /// Header or payload does not follow the format
    #[error("Malformed file: {0}")]
    Malformed(String),

    /// Valid file using a feature this build cannot decode
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Decoding succeeded but nothing survived the channel selector
    #[error("No parts or channels matched the channel selector '{0}'")]
    NothingSelected(String),
}

impl CodecError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }
}
