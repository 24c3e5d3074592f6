//! Portable Network Graphics.

use image::ImageFormat;

use crate::codec::ImageCodec;
use crate::decoded::DecodedImage;
use crate::error::CodecError;
use crate::formats::{apply_selector, read_payload, single_image};
use crate::options::{LoadOptions, TransferFunction};
use crate::stream::{ImageStream, peek};

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn id(&self) -> &'static str {
        "png"
    }

    fn display_name(&self) -> &'static str {
        "PNG"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["png"]
    }

    fn detect(&self, stream: &mut dyn ImageStream) -> bool {
        peek(stream, SIGNATURE.len()) == SIGNATURE
    }

    fn decode(
        &self,
        stream: &mut dyn ImageStream,
        filename: &str,
        options: &LoadOptions,
    ) -> Result<Vec<DecodedImage>, CodecError> {
        let bytes = read_payload(stream)?;
        let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?;
        log::debug!("PNG {}: {}x{} {:?}", filename, img.width(), img.height(), img.color());
        apply_selector(vec![single_image(&img, TransferFunction::Srgb)], options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_decode_gray16() {
        let img = image::ImageBuffer::<image::Luma<u16>, _>::from_pixel(4, 1, image::Luma([65535u16]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageLuma16(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.set_position(0);

        assert!(PngCodec.detect(&mut out));
        let images = PngCodec.decode(&mut out, "g.png", &LoadOptions::default()).unwrap();
        assert_eq!(images[0].channel_names(), ["Y"]);
        assert_eq!(images[0].channel("Y").unwrap().data[[0, 3]], 1.0);
    }

    #[test]
    fn test_corrupt_payload_is_decode_error() {
        let mut bytes = SIGNATURE.to_vec();
        bytes.extend_from_slice(b"garbage");
        let result = PngCodec.decode(&mut Cursor::new(bytes), "bad.png", &LoadOptions::default());
        assert!(matches!(result, Err(CodecError::Image(_))));
    }
}
