//! Baseline and progressive JPEG.

use image::ImageFormat;

use crate::codec::ImageCodec;
use crate::decoded::DecodedImage;
use crate::error::CodecError;
use crate::formats::{apply_selector, read_payload, single_image};
use crate::options::{LoadOptions, TransferFunction};
use crate::stream::{ImageStream, peek};

/// Start-of-image marker followed by the first segment marker prefix.
pub(crate) const SOI: [u8; 3] = [0xff, 0xd8, 0xff];

pub(crate) fn is_jpeg(head: &[u8]) -> bool {
    head.starts_with(&SOI)
}

pub(crate) fn decode_jpeg(bytes: &[u8]) -> Result<DecodedImage, CodecError> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;
    Ok(single_image(&img, TransferFunction::Srgb))
}

pub struct JpegCodec;

impl ImageCodec for JpegCodec {
    fn id(&self) -> &'static str {
        "jpeg"
    }

    fn display_name(&self) -> &'static str {
        "JPEG"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["jpg", "jpeg"]
    }

    fn detect(&self, stream: &mut dyn ImageStream) -> bool {
        is_jpeg(&peek(stream, SOI.len()))
    }

    fn decode(
        &self,
        stream: &mut dyn ImageStream,
        filename: &str,
        options: &LoadOptions,
    ) -> Result<Vec<DecodedImage>, CodecError> {
        let bytes = read_payload(stream)?;
        let image = decode_jpeg(&bytes)?;
        log::debug!("JPEG {}: {}x{}", filename, image.width, image.height);
        apply_selector(vec![image], options)
    }
}
