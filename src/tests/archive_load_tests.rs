use std::fs;

use imgload_codecs::LoadOptions;

use super::{drain, filenames, loader, png_bytes};
use crate::archive::tests::zip_bytes;
use crate::collection::ImageCollection;
use crate::request::LoadRequest;

fn sample_zip() -> Vec<u8> {
    let png = png_bytes(2, 2);
    zip_bytes(&[
        ("a.png", &png),
        ("b.txt", b"not an image"),
        (".hidden.png", &png),
        ("__MACOSX/._a.png", &png),
    ])
}

#[test]
fn test_zip_buffer_schedules_loadable_entries_only() {
    let mut loader = loader();
    let mut collection = ImageCollection::new();

    let request = LoadRequest::buffer("pack.zip", sample_zip(), LoadOptions::default());
    assert_eq!(loader.background_load(request), 1);
    assert_eq!(drain(&mut loader, &mut collection), 1);
    assert_eq!(filenames(&collection), ["pack.zip/a.png"]);
    assert_eq!(loader.recent_files(), ["pack.zip"]);
}

#[test]
fn test_zip_on_disk_selects_first_entry() {
    let dir = tempfile::tempdir().unwrap();
    let png = png_bytes(1, 1);
    let path = dir.path().join("shots.zip");
    fs::write(&path, zip_bytes(&[("one.png", &png), ("sub/", b""), ("sub/two.png", &png)])).unwrap();
    let mut loader = loader();
    let mut collection = ImageCollection::new();

    let request = LoadRequest::path(&path, LoadOptions::default()).selecting(true);
    assert_eq!(loader.background_load(request), 2);
    assert_eq!(drain(&mut loader, &mut collection), 2);

    let archive = path.to_string_lossy();
    assert_eq!(
        collection.current_image().unwrap().filename,
        format!("{}/one.png", archive)
    );
    assert_eq!(loader.recent_files(), [archive.into_owned()]);
}

#[test]
fn test_archive_entry_source_loads_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    let png = png_bytes(1, 1);
    let path = dir.path().join("shots.zip");
    fs::write(&path, zip_bytes(&[("one.png", &png), ("two.png", &png)])).unwrap();
    let mut loader = loader();
    let mut collection = ImageCollection::new();

    let name = format!("{}:two.png", path.to_string_lossy());
    assert_eq!(loader.background_load(LoadRequest::open(&name, LoadOptions::default())), 1);
    drain(&mut loader, &mut collection);
    assert_eq!(filenames(&collection), [format!("{}/two.png", path.to_string_lossy())]);
    assert_eq!(loader.recent_files(), [name]);
}

#[test]
fn test_zip_without_images_is_not_recent() {
    let mut loader = loader();
    let data = zip_bytes(&[("readme.txt", b"hi")]);
    assert_eq!(loader.background_load(LoadRequest::buffer("docs.zip", data, LoadOptions::default())), 0);
    assert!(loader.is_idle());
    assert!(loader.recent_files().is_empty());
}

#[test]
fn test_corrupt_zip_schedules_nothing() {
    let mut loader = loader();
    let request = LoadRequest::buffer("bad.zip", b"PK\x03\x04 truncated".to_vec(), LoadOptions::default());
    assert_eq!(loader.background_load(request), 0);
    assert!(loader.is_idle());
}

#[test]
fn test_broken_entry_does_not_affect_siblings() {
    let mut loader = loader();
    let mut collection = ImageCollection::new();
    let png = png_bytes(1, 1);
    let data = zip_bytes(&[("good.png", &png), ("bad.png", b"garbage")]);

    assert_eq!(loader.background_load(LoadRequest::buffer("mix.zip", data, LoadOptions::default())), 2);
    assert_eq!(drain(&mut loader, &mut collection), 1);
    assert_eq!(filenames(&collection), ["mix.zip/good.png"]);
}
