//! HEIF/AVIF detection. This build carries no HEVC or AV1 decoder.

use crate::codec::ImageCodec;
use crate::decoded::DecodedImage;
use crate::error::CodecError;
use crate::options::LoadOptions;
use crate::stream::{ImageStream, peek};

const BRANDS: [&[u8; 4]; 10] = [
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"mif1", b"msf1", b"avif", b"avis",
];

/// Check the `ftyp` box for a HEIF family brand, major or compatible.
fn has_heif_brand(head: &[u8]) -> bool {
    if head.len() < 16 || &head[4..8] != b"ftyp" {
        return false;
    }
    let box_len = u32::from_be_bytes([head[0], head[1], head[2], head[3]]) as usize;
    let end = box_len.clamp(16, head.len());
    // Major brand at 8, minor version at 12, compatible brands from 16.
    std::iter::once(&head[8..12])
        .chain(head[16..end].chunks_exact(4))
        .any(|brand| BRANDS.iter().any(|b| brand == &b[..]))
}

pub struct HeifCodec;

impl ImageCodec for HeifCodec {
    fn id(&self) -> &'static str {
        "heif"
    }

    fn display_name(&self) -> &'static str {
        "HEIF/AVIF"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["heic", "heif", "avif", "avifs"]
    }

    fn detect(&self, stream: &mut dyn ImageStream) -> bool {
        has_heif_brand(&peek(stream, 64))
    }

    fn decode(
        &self,
        _stream: &mut dyn ImageStream,
        filename: &str,
        _options: &LoadOptions,
    ) -> Result<Vec<DecodedImage>, CodecError> {
        Err(CodecError::unsupported(format!(
            "{} is HEIF/AVIF, which this build cannot decode",
            filename
        )))
    }
}
