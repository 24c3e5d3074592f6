//! Tests for the background loader.
//!
//! These exercise scheduling, draining, archives, recent files and folder
//! watching end to end against real files in temporary directories.

mod archive_load_tests;
mod scheduler_tests;

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use web_time::Instant;

use crate::collection::ImageCollection;
use crate::scheduler::BackgroundLoader;

/// Encode a solid `width` x `height` RGBA PNG.
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 200, 30, 255]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub(crate) fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, png_bytes(width, height)).unwrap();
    path
}

pub(crate) fn loader() -> BackgroundLoader {
    BackgroundLoader::new(2, crate::recent::DEFAULT_RECENT_CAPACITY).unwrap()
}

/// Drain `loader` into `collection` until no task is pending.
pub(crate) fn drain(loader: &mut BackgroundLoader, collection: &mut ImageCollection) -> usize {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut delivered = 0;
    while !loader.is_idle() {
        assert!(Instant::now() < deadline, "loads did not finish in time");
        delivered += loader.drain_into(collection);
        std::thread::sleep(Duration::from_millis(5));
    }
    delivered
}

pub(crate) fn filenames(collection: &ImageCollection) -> Vec<String> {
    collection
        .iter()
        .map(|(_, img)| img.filename.clone())
        .collect()
}
