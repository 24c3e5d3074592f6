//! Post-decode finalization applied uniformly to every decoded image.

use std::time::SystemTime;

use imgload_codecs::transfer::linearize;
use imgload_codecs::{DecodedImage, LoadOptions, TransferFunction};

use crate::error::LoadError;

/// Selector that reproduces a single part when its source is reloaded.
///
/// Without a part name the caller's pattern is used as is. Otherwise the part
/// name is prepended unless the pattern already lists it as a token.
pub fn resolve_channel_selector(partname: Option<&str>, pattern: &str) -> String {
    let Some(part) = partname.filter(|p| !p.is_empty()) else {
        return pattern.to_string();
    };
    if pattern.is_empty() {
        return part.to_string();
    }
    if pattern.split(',').map(str::trim).any(|token| token == part) {
        return pattern.to_string();
    }
    format!("{},{}", part, pattern)
}

/// Facts about the source shared by every image it produced.
#[derive(Debug, Clone)]
pub struct SourceInfo<'a> {
    pub filename: &'a str,
    pub last_modified: SystemTime,
    pub options: &'a LoadOptions,
}

fn validate(image: &DecodedImage, gamma: f32) -> Result<(), String> {
    if image.width == 0 || image.height == 0 {
        return Err(format!("image has zero size {}x{}", image.width, image.height));
    }
    if let Some(bad) = image
        .channels
        .iter()
        .find(|c| c.width() != image.width || c.height() != image.height)
    {
        return Err(format!(
            "channel '{}' is {}x{}, expected {}x{}",
            bad.name,
            bad.width(),
            bad.height(),
            image.width,
            image.height
        ));
    }
    if gamma.is_nan() || gamma <= 0.0 {
        return Err(format!("gamma must be positive, got {}", gamma));
    }
    Ok(())
}

/// Finalize one decoded image: transfer function, selector, name and timestamp.
pub fn normalize(mut image: DecodedImage, source: &SourceInfo<'_>) -> Result<DecodedImage, LoadError> {
    let options = source.options;
    let (tf, gamma) = match options.transfer_function {
        TransferFunction::Unspecified => (image.transfer_function, image.gamma),
        forced => (forced, options.gamma),
    };

    image.filename = source.filename.to_string();
    validate(&image, gamma).map_err(|reason| LoadError::PostProcessError {
        name: image.file_and_partname(),
        reason,
    })?;

    linearize(&mut image.channels, tf, gamma);
    image.transfer_function = tf;
    image.gamma = gamma;
    image
        .metadata
        .insert("transfer function".to_string(), tf.name(gamma).into());

    image.channel_selector =
        resolve_channel_selector(image.partname.as_deref(), &options.channel_selector);
    image.last_modified = source.last_modified;

    log::trace!(
        "Finalized '{}' ({}, selector '{}')",
        image.file_and_partname(),
        tf.name(gamma),
        image.channel_selector
    );
    Ok(image)
}

/// Finalize a decoded set, dropping only the images that fail.
pub fn normalize_all(images: Vec<DecodedImage>, source: &SourceInfo<'_>) -> Vec<DecodedImage> {
    images
        .into_iter()
        .filter_map(|image| match normalize(image, source) {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        })
        .collect()
}
