//! The detector/decoder pair every format exposes.

use crate::decoded::DecodedImage;
use crate::error::CodecError;
use crate::options::LoadOptions;
use crate::stream::ImageStream;

/// Trait for image format adapters.
///
/// Each format (EXR, JPEG, PNG, PFM, ...) implements this trait to provide
/// content-based detection and decoding into [`DecodedImage`]s.
pub trait ImageCodec: Send + Sync {
    /// Unique identifier for this codec (e.g., "exr", "png").
    fn id(&self) -> &'static str;

    /// Human-readable name for logs and listings.
    fn display_name(&self) -> &'static str;

    /// File extensions this codec handles (lowercase, without dots).
    fn extensions(&self) -> &'static [&'static str];

    /// Check whether the stream holds this format.
    ///
    /// Must not fail and must leave the stream at the position it had on entry.
    /// Implementations inspect magic bytes or headers via [`crate::stream::peek`].
    fn detect(&self, stream: &mut dyn ImageStream) -> bool;

    /// Decode every image (part, frame, face) contained in the stream.
    ///
    /// The caller's channel selector is honoured here; transfer-function
    /// resolution and naming happen later in the pipeline.
    fn decode(
        &self,
        stream: &mut dyn ImageStream,
        filename: &str,
        options: &LoadOptions,
    ) -> Result<Vec<DecodedImage>, CodecError>;
}
