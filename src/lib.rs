//! imgload - asynchronous image ingestion
//!
//! Turns files, directories, zip archives and in-memory buffers into decoded
//! float images on a background worker pool. The owning thread polls for
//! finished loads with [`BackgroundLoader::get_loaded_images`], keeps a
//! recent-files list and watches directories for new and modified files.
//!
//! Format detection and decoding live in the `imgload_codecs` crate; this
//! crate adds scheduling, archive expansion and post-processing.

pub mod archive;
pub mod collection;
pub mod config;
mod error;
pub mod natural_sort;
pub mod normalize;
pub mod pipeline;
pub mod recent;
pub mod request;
mod scheduler;
pub mod sniff;
pub mod task;
pub mod watch;

#[cfg(test)]
mod tests;

pub use collection::{ImageCollection, ImageId};
pub use config::{ConfigError, LoaderConfig, LogLevel, Preferences};
pub use error::LoadError;
pub use pipeline::{load_image, try_load_image};
pub use request::{LoadRequest, Source};
pub use scheduler::BackgroundLoader;
pub use sniff::FormatRegistry;

pub use imgload_codecs::{
    Channel, ChannelFilter, CodecError, DecodedImage, ImageCodec, ImageStream, LoadOptions,
    TransferFunction,
};
