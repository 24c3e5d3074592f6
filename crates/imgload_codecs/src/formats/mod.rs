//! Built-in format adapters.
//!
//! Every adapter implements [`ImageCodec`](crate::ImageCodec). The order in
//! which adapters are consulted is not decided here but by the caller's
//! registry, since several detectors overlap.

mod dds;
mod exr;
mod heif;
mod jpeg;
mod jxl;
mod pfm;
mod png;
mod qoi;
mod raster;
mod uhdr;

pub use dds::DdsCodec;
pub use exr::ExrCodec;
pub use heif::HeifCodec;
pub use jpeg::JpegCodec;
pub use jxl::JxlCodec;
pub use pfm::PfmCodec;
pub use png::PngCodec;
pub use qoi::QoiCodec;
pub use raster::RasterCodec;
pub use uhdr::UhdrCodec;

use image::DynamicImage;

use crate::decoded::{Channel, DecodedImage};
use crate::error::CodecError;
use crate::options::{LoadOptions, TransferFunction};
use crate::stream::{ImageStream, read_remaining};

/// Read the full payload of a stream, failing on an empty source.
pub(crate) fn read_payload(stream: &mut dyn ImageStream) -> Result<Vec<u8>, CodecError> {
    let data = read_remaining(stream)?;
    if data.is_empty() {
        return Err(CodecError::malformed("stream is empty"));
    }
    Ok(data)
}

/// Split a decoded `image` buffer into named float planes.
///
/// Integer formats are normalized to 0.0-1.0, float formats keep their values.
pub(crate) fn channels_from_dynamic(img: &DynamicImage) -> (usize, usize, Vec<Channel>) {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let color = img.color();
    let names: &[&str] = match (color.has_color(), color.has_alpha()) {
        (false, false) => &["Y"],
        (false, true) => &["Y", "A"],
        (true, false) => &["R", "G", "B"],
        (true, true) => &["R", "G", "B", "A"],
    };
    // Source component for each output plane within an RGBA pixel.
    let sources: &[usize] = match names.len() {
        1 => &[0],
        2 => &[0, 3],
        3 => &[0, 1, 2],
        _ => &[0, 1, 2, 3],
    };

    let rgba = img.to_rgba32f();
    let pixel_count = width * height;
    let mut planes: Vec<Vec<f32>> = vec![Vec::with_capacity(pixel_count); names.len()];
    for pixel in rgba.pixels() {
        for (plane, &src) in planes.iter_mut().zip(sources) {
            plane.push(pixel.0[src]);
        }
    }

    let channels = names
        .iter()
        .zip(planes)
        .filter_map(|(name, samples)| Channel::from_samples(*name, width, height, samples))
        .collect();

    (width, height, channels)
}

/// Wrap an `image` decode result as a single-part image.
pub(crate) fn single_image(img: &DynamicImage, tf: TransferFunction) -> DecodedImage {
    let (width, height, channels) = channels_from_dynamic(img);
    DecodedImage::new(width, height, channels, tf)
}

/// Apply the caller's channel selector to decoded images.
///
/// Channels are tested by their full name (`part.channel` for multi-part
/// sources). Images left without channels are dropped; if nothing survives
/// at all the load fails.
pub(crate) fn apply_selector(
    images: Vec<DecodedImage>,
    options: &LoadOptions,
) -> Result<Vec<DecodedImage>, CodecError> {
    let filter = options.filter();
    if filter.is_empty() {
        return Ok(images);
    }

    let selected: Vec<DecodedImage> = images
        .into_iter()
        .filter_map(|mut image| {
            let part = image.partname.clone();
            image.channels.retain(|c| {
                let full_name = match &part {
                    Some(p) => format!("{}.{}", p, c.name),
                    None => c.name.clone(),
                };
                filter.passes(&full_name)
            });
            (!image.channels.is_empty()).then_some(image)
        })
        .collect();

    if selected.is_empty() {
        return Err(CodecError::NothingSelected(options.channel_selector.clone()));
    }
    Ok(selected)
}
