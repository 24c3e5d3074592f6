//! OpenEXR through the `image` crate's decoder.

use image::ImageFormat;

use crate::codec::ImageCodec;
use crate::decoded::DecodedImage;
use crate::error::CodecError;
use crate::formats::{apply_selector, read_payload, single_image};
use crate::options::{LoadOptions, TransferFunction};
use crate::stream::{ImageStream, peek};

const MAGIC: [u8; 4] = [0x76, 0x2f, 0x31, 0x01];

pub struct ExrCodec;

impl ImageCodec for ExrCodec {
    fn id(&self) -> &'static str {
        "exr"
    }

    fn display_name(&self) -> &'static str {
        "OpenEXR"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["exr"]
    }

    fn detect(&self, stream: &mut dyn ImageStream) -> bool {
        peek(stream, 4) == MAGIC
    }

    fn decode(
        &self,
        stream: &mut dyn ImageStream,
        filename: &str,
        options: &LoadOptions,
    ) -> Result<Vec<DecodedImage>, CodecError> {
        let bytes = read_payload(stream)?;
        let img = image::load_from_memory_with_format(&bytes, ImageFormat::OpenExr)?;
        log::debug!("EXR {}: {}x{} {:?}", filename, img.width(), img.height(), img.color());
        apply_selector(vec![single_image(&img, TransferFunction::Linear)], options)
    }
}
