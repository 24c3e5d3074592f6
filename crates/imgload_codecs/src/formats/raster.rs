//! Catch-all for the remaining formats the `image` crate can read.
//!
//! Overlaps the PNG and JPEG adapters, so it must be consulted after them.

use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat};

use crate::codec::ImageCodec;
use crate::decoded::DecodedImage;
use crate::error::CodecError;
use crate::formats::{apply_selector, read_payload, single_image};
use crate::options::{LoadOptions, TransferFunction};
use crate::stream::{ImageStream, peek};

const TGA_HEADER_LEN: usize = 18;

/// TGA has no magic number; accept only plausible headers.
fn looks_like_tga(head: &[u8]) -> bool {
    if head.len() < TGA_HEADER_LEN {
        return false;
    }
    let color_map_type = head[1];
    let image_type = head[2];
    let width = u16::from_le_bytes([head[12], head[13]]);
    let height = u16::from_le_bytes([head[14], head[15]]);
    let depth = head[16];

    matches!(color_map_type, 0 | 1)
        && matches!(image_type, 1 | 2 | 3 | 9 | 10 | 11)
        && matches!(depth, 8 | 15 | 16 | 24 | 32)
        && width > 0
        && height > 0
}

fn sniff_format(head: &[u8]) -> Option<ImageFormat> {
    match image::guess_format(head) {
        Ok(
            format @ (ImageFormat::Bmp
            | ImageFormat::Gif
            | ImageFormat::Hdr
            | ImageFormat::Pnm
            | ImageFormat::Png
            | ImageFormat::Jpeg),
        ) => Some(format),
        _ if looks_like_tga(head) => Some(ImageFormat::Tga),
        _ => None,
    }
}

fn decode_gif(bytes: Vec<u8>) -> Result<Vec<DecodedImage>, CodecError> {
    let frames = GifDecoder::new(Cursor::new(bytes))?
        .into_frames()
        .collect_frames()?;
    let multi = frames.len() > 1;

    Ok(frames
        .into_iter()
        .enumerate()
        .map(|(index, frame)| {
            let img = DynamicImage::ImageRgba8(frame.into_buffer());
            let image = single_image(&img, TransferFunction::Srgb);
            if multi {
                image.with_partname(format!("frame {}", index))
            } else {
                image
            }
        })
        .collect())
}

pub struct RasterCodec;

impl ImageCodec for RasterCodec {
    fn id(&self) -> &'static str {
        "raster"
    }

    fn display_name(&self) -> &'static str {
        "Generic raster (BMP, GIF, HDR, PNM, TGA)"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["bmp", "gif", "hdr", "pic", "pnm", "pbm", "pgm", "ppm", "tga"]
    }

    fn detect(&self, stream: &mut dyn ImageStream) -> bool {
        sniff_format(&peek(stream, 64)).is_some()
    }

    fn decode(
        &self,
        stream: &mut dyn ImageStream,
        filename: &str,
        options: &LoadOptions,
    ) -> Result<Vec<DecodedImage>, CodecError> {
        let bytes = read_payload(stream)?;
        let format = sniff_format(&bytes)
            .ok_or_else(|| CodecError::malformed("unrecognised raster header"))?;
        log::debug!("{}: decoding as {:?}", filename, format);

        let images = match format {
            ImageFormat::Gif => decode_gif(bytes)?,
            ImageFormat::Hdr => {
                let img = image::load_from_memory_with_format(&bytes, format)?;
                vec![single_image(&img, TransferFunction::Linear)]
            }
            _ => {
                let img = image::load_from_memory_with_format(&bytes, format)?;
                vec![single_image(&img, TransferFunction::Srgb)]
            }
        };
        apply_selector(images, options)
    }
}
