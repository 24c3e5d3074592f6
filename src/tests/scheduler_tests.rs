use std::fs;
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use imgload_codecs::{
    Channel, CodecError, DecodedImage, ImageCodec, ImageStream, LoadOptions, TransferFunction,
};
use web_time::Instant;

use super::{drain, filenames, loader, png_bytes, write_png};
use crate::collection::ImageCollection;
use crate::request::LoadRequest;
use crate::scheduler::BackgroundLoader;
use crate::sniff::FormatRegistry;

/// Accepts any stream and yields two images once the gate is opened.
struct GatedCodec {
    gate: Mutex<mpsc::Receiver<()>>,
}

impl ImageCodec for GatedCodec {
    fn id(&self) -> &'static str {
        "gated"
    }

    fn display_name(&self) -> &'static str {
        "Gated"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["gated"]
    }

    fn detect(&self, _stream: &mut dyn ImageStream) -> bool {
        true
    }

    fn decode(
        &self,
        _stream: &mut dyn ImageStream,
        _filename: &str,
        _options: &LoadOptions,
    ) -> Result<Vec<DecodedImage>, CodecError> {
        self.gate
            .lock()
            .map_err(|_| CodecError::malformed("gate poisoned"))?
            .recv()
            .map_err(|_| CodecError::malformed("gate closed"))?;
        Ok(["left", "right"]
            .into_iter()
            .map(|part| {
                let y = Channel::from_samples("Y", 1, 1, vec![0.5]).unwrap();
                DecodedImage::new(1, 1, vec![y], TransferFunction::Linear).with_partname(part)
            })
            .collect())
    }
}

fn gated_loader() -> (BackgroundLoader, mpsc::Sender<()>) {
    let (open, gate) = mpsc::channel();
    let codec = GatedCodec { gate: Mutex::new(gate) };
    let registry = FormatRegistry::with_codecs(vec![Box::new(codec)]);
    let loader = BackgroundLoader::with_registry(1, 15, Arc::new(registry)).unwrap();
    (loader, open)
}

#[test]
fn test_file_load_is_delivered_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "a.png", 4, 3);
    let mut loader = loader();
    let mut collection = ImageCollection::new();

    assert_eq!(loader.background_load(LoadRequest::path(&path, LoadOptions::default())), 1);
    assert_eq!(loader.num_pending_images(), 1);
    assert_eq!(drain(&mut loader, &mut collection), 1);

    let image = collection.current_image().unwrap();
    assert_eq!((image.width, image.height), (4, 3));
    assert_eq!(image.filename, path.to_string_lossy());
    assert_eq!(image.channel_names(), ["R", "G", "B", "A"]);

    // Nothing left to deliver.
    assert_eq!(loader.drain_into(&mut collection), 0);
    assert_eq!(collection.len(), 1);
}

#[test]
fn test_buffer_load_not_added_to_recent() {
    let mut loader = loader();
    let mut collection = ImageCollection::new();
    let request = LoadRequest::buffer("clipboard.png", png_bytes(2, 2), LoadOptions::default());

    assert_eq!(loader.background_load(request), 1);
    assert_eq!(drain(&mut loader, &mut collection), 1);
    assert_eq!(filenames(&collection), ["clipboard.png"]);
    assert!(loader.recent_files().is_empty());
}

#[test]
fn test_failed_load_is_dropped_silently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    fs::write(&path, b"definitely not an image").unwrap();
    let mut loader = loader();
    let mut collection = ImageCollection::new();

    assert_eq!(loader.background_load(LoadRequest::path(&path, LoadOptions::default())), 1);
    assert_eq!(drain(&mut loader, &mut collection), 0);
    assert!(collection.is_empty());
    assert!(loader.is_idle());
    assert!(loader.recent_files().is_empty());
}

#[test]
fn test_missing_file_is_removed_from_recent() {
    let mut loader = loader();
    loader.set_recent_files(vec!["/no/such/image.png".to_string()]);
    let n = loader.background_load(LoadRequest::open("/no/such/image.png", LoadOptions::default()));
    assert_eq!(n, 0);
    assert!(loader.recent_files().is_empty());
}

#[test]
fn test_recent_order_follows_successful_loads() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_png(dir.path(), "a.png", 1, 1);
    let b = write_png(dir.path(), "b.png", 1, 1);
    let mut loader = loader();
    let mut collection = ImageCollection::new();

    for path in [&a, &b, &a] {
        loader.background_load(LoadRequest::path(path, LoadOptions::default()));
        drain(&mut loader, &mut collection);
    }

    let expected = [b.to_string_lossy().into_owned(), a.to_string_lossy().into_owned()];
    assert_eq!(loader.recent_files(), expected);
    assert_eq!(loader.recent_files_short(100, 100)[0], expected[1]);
}

#[test]
fn test_load_recent_file_reloads_newest() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_png(dir.path(), "a.png", 1, 1);
    let b = write_png(dir.path(), "b.png", 2, 2);
    let mut loader = loader();
    loader.set_recent_files(vec![
        a.to_string_lossy().into_owned(),
        b.to_string_lossy().into_owned(),
    ]);
    let mut collection = ImageCollection::new();

    assert_eq!(loader.load_recent_file(0, &LoadOptions::default()), 1);
    drain(&mut loader, &mut collection);
    assert_eq!(collection.current_image().unwrap().width, 2);
}

#[test]
fn test_directory_load_sorted_and_selects_first() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "img10.png", 1, 1);
    write_png(dir.path(), "img2.png", 1, 1);
    fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
    let mut loader = loader();
    let mut collection = ImageCollection::new();

    let request = LoadRequest::path(dir.path(), LoadOptions::default()).selecting(true);
    assert_eq!(loader.background_load(request), 2);
    assert_eq!(drain(&mut loader, &mut collection), 2);

    let current = collection.current_image().unwrap();
    assert!(current.filename.ends_with("img2.png"));
    assert_eq!(loader.watched_directories().len(), 1);
    assert_eq!(loader.recent_files(), [dir.path().to_string_lossy().into_owned()]);

    // Directory contents were loaded already and do not count as new.
    assert_eq!(loader.load_new_and_modified_files(&mut collection, &LoadOptions::default()), 0);
}

#[test]
fn test_transfer_function_override() {
    let mut loader = loader();
    let mut collection = ImageCollection::new();
    let options = LoadOptions::default().transfer_function(TransferFunction::Gamma, 2.0);
    loader.background_load(LoadRequest::buffer("g.png", png_bytes(1, 1), options));
    drain(&mut loader, &mut collection);

    let image = collection.current_image().unwrap();
    assert_eq!(image.transfer_function, TransferFunction::Gamma);
    assert_eq!(image.gamma, 2.0);
    assert_eq!(image.metadata["transfer function"], "Gamma 2.000");
}

#[test]
fn test_channel_selector_applies_to_background_load() {
    let mut loader = loader();
    let mut collection = ImageCollection::new();
    let options = LoadOptions::with_channel_selector("R,G");
    loader.background_load(LoadRequest::buffer("rg.png", png_bytes(1, 1), options));
    drain(&mut loader, &mut collection);

    let image = collection.current_image().unwrap();
    assert_eq!(image.channel_names(), ["R", "G"]);
    assert_eq!(image.channel_selector, "R,G");
}

#[test]
fn test_unfinished_task_stays_pending_across_drains() {
    let (mut loader, open) = gated_loader();
    let request = LoadRequest::buffer("pair.gated", b"pair".to_vec(), LoadOptions::default());
    assert_eq!(loader.background_load(request), 1);

    let mut calls = 0;
    for _ in 0..2 {
        assert_eq!(loader.get_loaded_images(|_, _, _| calls += 1), 0);
        assert_eq!(loader.num_pending_images(), 1);
    }
    assert_eq!(calls, 0);
    assert!(!loader.is_idle());

    open.send(()).unwrap();
    let mut parts = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(10);
    while parts.is_empty() {
        assert!(Instant::now() < deadline, "gated load did not finish in time");
        loader.get_loaded_images(|image, _, _| parts.push(image.file_and_partname()));
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(parts.len(), 2);
    assert_eq!(loader.num_pending_images(), 0);
    assert!(loader.is_idle());

    // Delivered images are not handed out again.
    assert_eq!(loader.get_loaded_images(|_, _, _| calls += 1), 0);
    assert_eq!(calls, 0);
}

#[test]
fn test_same_path_twice_gives_independent_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "twice.png", 2, 2);
    let mut loader = loader();
    let mut collection = ImageCollection::new();

    assert_eq!(loader.background_load(LoadRequest::path(&path, LoadOptions::default())), 1);
    assert_eq!(loader.background_load(LoadRequest::path(&path, LoadOptions::default())), 1);
    assert_eq!(loader.num_pending_images(), 2);
    assert_eq!(drain(&mut loader, &mut collection), 2);

    let name = path.to_string_lossy().into_owned();
    assert_eq!(filenames(&collection), [name.clone(), name]);
}

#[test]
fn test_vanished_source_dropped_from_recent_without_recent_flag() {
    let dir = tempfile::tempdir().unwrap();
    let kept = write_png(dir.path(), "kept.png", 1, 1);
    let missing = dir.path().join("missing.png");
    let mut loader = loader();
    let mut collection = ImageCollection::new();
    let recents = vec![
        kept.to_string_lossy().into_owned(),
        missing.to_string_lossy().into_owned(),
    ];
    loader.set_recent_files(recents.clone());

    // Reloads of an existing file never touch the list.
    let reload = LoadRequest::path(&kept, LoadOptions::default()).with_recent(false);
    assert_eq!(loader.background_load(reload), 1);
    drain(&mut loader, &mut collection);
    assert_eq!(loader.recent_files(), recents);

    // A vanished source is dropped even from a request that skips recents.
    let request = LoadRequest::path(&missing, LoadOptions::default()).with_recent(false);
    assert_eq!(loader.background_load(request), 0);
    assert_eq!(loader.recent_files(), [recents[0].clone()]);
}
