//! Error types for the loading pipeline.
//!
//! Every failure below is caught at the task boundary and logged; none of
//! them reach the thread that drains results.

use std::path::PathBuf;

use imgload_codecs::CodecError;
use thiserror::Error;

/// Errors that can occur while loading a single source.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Path is missing or is not a regular file
    #[error("File '{}' does not exist or is not a regular file", .0.display())]
    SourceNotFound(PathBuf),

    /// Source has no bytes or could not be read
    #[error("Source '{0}' is empty or unreadable")]
    EmptyOrUnreadableSource(String),

    /// No format detector accepted the content
    #[error("Could not determine the image format of '{0}'")]
    UnsupportedFormat(String),

    /// The matched codec failed to decode
    #[error("{codec} decoder failed on '{name}': {source}")]
    DecodeError {
        codec: &'static str,
        name: String,
        #[source]
        source: CodecError,
    },

    /// Corrupt archive, or one entry could not be extracted
    #[error("Archive '{archive}': {reason}")]
    ArchiveError { archive: String, reason: String },

    /// Archive held nothing that could be scheduled
    #[error("No loadable images found in '{0}'")]
    NoLoadableEntries(String),

    /// One decoded image failed finalization
    #[error("Could not finalize '{name}': {reason}")]
    PostProcessError { name: String, reason: String },

    /// Filesystem error while resolving a source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Worker pool could not be created
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl LoadError {
    pub(crate) fn archive(archive: impl Into<String>, reason: impl ToString) -> Self {
        Self::ArchiveError {
            archive: archive.into(),
            reason: reason.to_string(),
        }
    }
}
