//! Quite OK Image format.

use image::ImageFormat;

use crate::codec::ImageCodec;
use crate::decoded::DecodedImage;
use crate::error::CodecError;
use crate::formats::{apply_selector, read_payload, single_image};
use crate::options::{LoadOptions, TransferFunction};
use crate::stream::{ImageStream, peek};

const MAGIC: &[u8; 4] = b"qoif";
/// Offset of the colorspace byte: 0 = sRGB with linear alpha, 1 = all linear.
const COLORSPACE_OFFSET: usize = 13;

pub struct QoiCodec;

impl ImageCodec for QoiCodec {
    fn id(&self) -> &'static str {
        "qoi"
    }

    fn display_name(&self) -> &'static str {
        "QOI"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["qoi"]
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
        let tf = match bytes.get(COLORSPACE_OFFSET) {
            Some(1) => TransferFunction::Linear,
            _ => TransferFunction::Srgb,
        };
        let img = image::load_from_memory_with_format(&bytes, ImageFormat::Qoi)?;
        log::debug!("QOI {}: {}x{}, {:?}", filename, img.width(), img.height(), tf);
        apply_selector(vec![single_image(&img, tf)], options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_qoi() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Qoi)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_colorspace_byte_selects_transfer() {
        let bytes = encode_qoi();
        let images = QoiCodec
            .decode(&mut Cursor::new(bytes.clone()), "a.qoi", &LoadOptions::default())
            .unwrap();
        assert_eq!(images[0].transfer_function, TransferFunction::Srgb);

        let mut linear = bytes;
        linear[COLORSPACE_OFFSET] = 1;
        let images = QoiCodec
            .decode(&mut Cursor::new(linear), "a.qoi", &LoadOptions::default())
            .unwrap();
        assert_eq!(images[0].transfer_function, TransferFunction::Linear);
        assert_eq!(images[0].channel_names(), ["R", "G", "B", "A"]);
    }

    #[test]
    fn test_detect() {
        assert!(QoiCodec.detect(&mut Cursor::new(encode_qoi())));
        assert!(!QoiCodec.detect(&mut Cursor::new(b"qoi".to_vec())));
    }
}
