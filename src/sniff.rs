//! Content-based format detection.
//!
//! The registry holds every codec in a fixed priority order. Detection walks
//! that order and the first codec whose detector accepts the stream wins, so
//! the order alone settles collisions between overlapping detectors:
//!
//! | # | codec  | must precede | because                                          |
//! |---|--------|--------------|--------------------------------------------------|
//! | 2 | uhdr   | jpeg         | every Ultra HDR file is also a valid JPEG         |
//! | 6 | dds    | heif         | the HEIF detector accepts many DDS files          |
//! | 8 | png    | raster       | the generic detector recognises PNG and JPEG     |

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use imgload_codecs::formats::{
    DdsCodec, ExrCodec, HeifCodec, JpegCodec, JxlCodec, PfmCodec, PngCodec, QoiCodec, RasterCodec,
    UhdrCodec,
};
use imgload_codecs::{ImageCodec, ImageStream};

/// Ordered set of codecs consulted during detection.
pub struct FormatRegistry {
    codecs: Vec<Box<dyn ImageCodec>>,
    extensions: BTreeSet<&'static str>,
}

impl FormatRegistry {
    /// Registry with every built-in codec in priority order.
    pub fn builtin() -> Self {
        Self::with_codecs(vec![
            Box::new(ExrCodec),
            Box::new(UhdrCodec),
            Box::new(JpegCodec),
            Box::new(QoiCodec),
            Box::new(JxlCodec),
            Box::new(DdsCodec),
            Box::new(HeifCodec),
            Box::new(PngCodec),
            Box::new(RasterCodec),
            Box::new(PfmCodec),
        ])
    }

    /// Shared instance of [`FormatRegistry::builtin`].
    pub fn shared() -> &'static FormatRegistry {
        static REGISTRY: OnceLock<FormatRegistry> = OnceLock::new();
        REGISTRY.get_or_init(FormatRegistry::builtin)
    }

    /// Registry consulting `codecs` in the given order.
    pub fn with_codecs(codecs: Vec<Box<dyn ImageCodec>>) -> Self {
        let extensions = codecs
            .iter()
            .flat_map(|c| c.extensions().iter().copied())
            .collect();
        Self { codecs, extensions }
    }

    /// Codecs in priority order.
    pub fn codecs(&self) -> impl Iterator<Item = &dyn ImageCodec> {
        self.codecs.iter().map(|c| c.as_ref())
    }

    /// Find the first codec that accepts the stream.
    ///
    /// Every detector restores the stream position, so the stream is left where
    /// it was whatever the outcome.
    pub fn detect(&self, stream: &mut dyn ImageStream) -> Option<&dyn ImageCodec> {
        let found = self.codecs().find(|codec| codec.detect(stream));
        match found {
            Some(codec) => log::trace!("Detected format: {}", codec.display_name()),
            None => log::trace!("No detector matched"),
        }
        found
    }

    /// Lowercase extensions (without dot) accepted by any codec.
    pub fn extensions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.extensions.iter().copied()
    }

    /// Whether a file name has an extension some codec claims.
    pub fn is_loadable(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    pub fn is_loadable_path(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| self.is_loadable(n))
            .unwrap_or(false)
    }
}
