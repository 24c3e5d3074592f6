//! imgload_codecs - format detection and decoding for imgload
//!
//! Each supported file format is an [`ImageCodec`]: a cheap detector that
//! inspects the head of an [`ImageStream`] and a decoder producing one or more
//! [`DecodedImage`]s with float channels.

mod codec;
mod decoded;
mod error;
pub mod formats;
mod options;
pub mod stream;
pub mod transfer;

pub use codec::ImageCodec;
pub use decoded::{Channel, DecodedImage};
pub use error::CodecError;
pub use options::{ChannelFilter, LoadOptions, TransferFunction};
pub use stream::ImageStream;
