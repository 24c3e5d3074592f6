//! Synchronous load pipeline: detect, decode, finalize.
//!
//! This is both the public entry point for callers that want to block and the
//! body of every background task.

use std::fs::File;
use std::io::{BufReader, Cursor, Seek, SeekFrom};
use std::path::Path;
use std::time::SystemTime;

use imgload_codecs::{DecodedImage, ImageStream, LoadOptions};
use web_time::Instant;

use crate::error::LoadError;
use crate::normalize::{SourceInfo, normalize_all};
use crate::sniff::FormatRegistry;

fn stream_len(stream: &mut dyn ImageStream) -> std::io::Result<u64> {
    let start = stream.stream_position()?;
    let end = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(start))?;
    Ok(end.saturating_sub(start))
}

/// Detect, decode and finalize every image in `stream`.
pub fn load_with_registry(
    registry: &FormatRegistry,
    stream: &mut dyn ImageStream,
    filename: &str,
    options: &LoadOptions,
    last_modified: SystemTime,
) -> Result<Vec<DecodedImage>, LoadError> {
    let start = Instant::now();

    match stream_len(stream) {
        Ok(0) | Err(_) => return Err(LoadError::EmptyOrUnreadableSource(filename.to_string())),
        Ok(_) => {}
    }

    let codec = registry
        .detect(stream)
        .ok_or_else(|| LoadError::UnsupportedFormat(filename.to_string()))?;
    log::info!("Detected {} image: '{}'", codec.display_name(), filename);

    let decoded = codec
        .decode(stream, filename, options)
        .map_err(|source| LoadError::DecodeError {
            codec: codec.id(),
            name: filename.to_string(),
            source,
        })?;

    let source = SourceInfo {
        filename,
        last_modified,
        options,
    };
    let images = normalize_all(decoded, &source);

    log::info!(
        "Loaded {} image(s) from '{}' in {:.1}ms",
        images.len(),
        filename,
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(images)
}

/// Load every image in `stream` with the built-in codecs.
pub fn try_load_image(
    stream: &mut dyn ImageStream,
    filename: &str,
    options: &LoadOptions,
) -> Result<Vec<DecodedImage>, LoadError> {
    load_with_registry(
        FormatRegistry::shared(),
        stream,
        filename,
        options,
        SystemTime::now(),
    )
}

/// Like [`try_load_image`] but logs failures and returns no images instead.
pub fn load_image(stream: &mut dyn ImageStream, filename: &str, options: &LoadOptions) -> Vec<DecodedImage> {
    try_load_image(stream, filename, options).unwrap_or_else(|e| {
        log::error!("Could not load image '{}': {}", filename, e);
        Vec::new()
    })
}

/// Load a regular file, stamping images with its modification time.
pub fn load_path(
    registry: &FormatRegistry,
    path: &Path,
    options: &LoadOptions,
) -> Result<Vec<DecodedImage>, LoadError> {
    if !path.is_file() {
        return Err(LoadError::SourceNotFound(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| {
        log::debug!("Failed to open {:?}: {}", path, e);
        LoadError::SourceNotFound(path.to_path_buf())
    })?;
    let last_modified = file
        .metadata()
        .and_then(|m| m.modified())
        .unwrap_or_else(|_| SystemTime::now());

    let mut reader = BufReader::new(file);
    load_with_registry(
        registry,
        &mut reader,
        &path.to_string_lossy(),
        options,
        last_modified,
    )
}

/// Load an in-memory buffer, stamping images with `last_modified`.
///
/// Anonymous buffers pass the current time; entries extracted from an archive
/// on disk pass the archive's modification time so watch ticks compare alike.
pub fn load_buffer(
    registry: &FormatRegistry,
    name: &str,
    data: &[u8],
    options: &LoadOptions,
    last_modified: SystemTime,
) -> Result<Vec<DecodedImage>, LoadError> {
    load_with_registry(registry, &mut Cursor::new(data), name, options, last_modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgload_codecs::TransferFunction;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([255, 128, 0, 255]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_load_png_buffer() {
        let images = load_image(&mut Cursor::new(png_bytes()), "a.png", &LoadOptions::default());
        assert_eq!(images.len(), 1);
        let img = &images[0];
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.filename, "a.png");
        assert_eq!(img.transfer_function, TransferFunction::Srgb);
        assert_eq!(img.channel("R").unwrap().data[[0, 0]], 1.0);
        assert_eq!(img.channel("B").unwrap().data[[1, 2]], 0.0);
    }

    #[test]
    fn test_extension_is_ignored() {
        let images = load_image(&mut Cursor::new(png_bytes()), "misnamed.exr", &LoadOptions::default());
        assert_eq!(images.len(), 1);
    }

    #[test]
    fn test_empty_source() {
        let result = try_load_image(&mut Cursor::new(Vec::new()), "empty.png", &LoadOptions::default());
        assert!(matches!(result, Err(LoadError::EmptyOrUnreadableSource(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let result = try_load_image(
            &mut Cursor::new(b"hello world, this is text".to_vec()),
            "notes.png",
            &LoadOptions::default(),
        );
        assert!(matches!(result, Err(LoadError::UnsupportedFormat(_))));
        assert!(load_image(&mut Cursor::new(b"text".to_vec()), "x", &LoadOptions::default()).is_empty());
    }

    #[test]
    fn test_decode_error_names_codec() {
        let mut bytes = png_bytes();
        bytes.truncate(20);
        match try_load_image(&mut Cursor::new(bytes), "cut.png", &LoadOptions::default()) {
            Err(LoadError::DecodeError { codec, .. }) => assert_eq!(codec, "png"),
            other => panic!("unexpected result: {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_missing_path() {
        let result = load_path(
            FormatRegistry::shared(),
            Path::new("/definitely/not/here.png"),
            &LoadOptions::default(),
        );
        assert!(matches!(result, Err(LoadError::SourceNotFound(_))));
    }

    #[test]
    fn test_load_path_uses_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, png_bytes()).unwrap();
        let mtime = std::fs::metadata(&path).unwrap().modified().unwrap();

        let images = load_path(FormatRegistry::shared(), &path, &LoadOptions::default()).unwrap();
        assert_eq!(images[0].last_modified, mtime);
        assert_eq!(images[0].filename, path.to_string_lossy());
    }
}
