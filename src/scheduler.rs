//! Background loader: schedules loads on a worker pool and hands back results.
//!
//! All bookkeeping (pending tasks, recent files, watched directories) lives on
//! the thread that owns the [`BackgroundLoader`]. Workers only see the data of
//! their own task and report through a one-shot [`TaskHandle`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use imgload_codecs::{DecodedImage, LoadOptions};
use web_time::Instant;

use crate::archive::extract_entries;
use crate::collection::{ImageCollection, ImageId};
use crate::config::Preferences;
use crate::error::LoadError;
use crate::pipeline::{load_buffer, load_path};
use crate::recent::RecentList;
use crate::request::{LoadRequest, Source, backing_path, is_zip_name, split_zip_entry};
use crate::sniff::FormatRegistry;
use crate::task::TaskHandle;
use crate::watch::{WatchRegistry, loadable_files};

/// A scheduled load that has not been drained yet.
struct PendingTask {
    name: String,
    handle: TaskHandle<Vec<DecodedImage>>,
    add_to_recent: bool,
    should_select: bool,
    replace_target: Option<ImageId>,
}

/// Where a task reads its bytes from.
enum TaskInput {
    File(PathBuf),
    /// Bytes plus the modification time their images are stamped with.
    Memory(Vec<u8>, SystemTime),
}

/// Owner of in-flight loads, the recent-files list and watched directories.
pub struct BackgroundLoader {
    pool: rayon::ThreadPool,
    registry: Arc<FormatRegistry>,
    pending: Vec<PendingTask>,
    recent: RecentList,
    watch: WatchRegistry,
}

impl BackgroundLoader {
    /// Create a loader with `threads` workers (0 = one per CPU).
    pub fn new(threads: usize, recent_capacity: usize) -> Result<Self, LoadError> {
        Self::with_registry(threads, recent_capacity, Arc::new(FormatRegistry::builtin()))
    }

    pub fn with_registry(
        threads: usize,
        recent_capacity: usize,
        registry: Arc<FormatRegistry>,
    ) -> Result<Self, LoadError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("image-decoder-{}", i))
            .panic_handler(|_| log::error!("Image decoder thread panicked"))
            .build()?;
        log::info!(
            "Background loader started with {} decoder thread(s)",
            pool.current_num_threads()
        );

        Ok(Self {
            pool,
            registry,
            pending: Vec::new(),
            recent: RecentList::new(recent_capacity),
            watch: WatchRegistry::new(),
        })
    }

    pub fn from_preferences(preferences: &Preferences) -> Result<Self, LoadError> {
        Self::new(preferences.worker_threads, preferences.recent_capacity)
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    // ---- Scheduling ----------------------------------------------------

    fn spawn_task(
        &mut self,
        name: String,
        input: TaskInput,
        options: LoadOptions,
        add_to_recent: bool,
        should_select: bool,
        replace_target: Option<ImageId>,
    ) {
        let registry = Arc::clone(&self.registry);
        let task_name = name.clone();
        let handle = TaskHandle::spawn(&self.pool, move || {
            let result = match &input {
                TaskInput::File(path) => load_path(&registry, path, &options),
                TaskInput::Memory(data, modified) => {
                    load_buffer(&registry, &task_name, data, &options, *modified)
                }
            };
            result.unwrap_or_else(|e| {
                log::error!("Could not load image '{}': {}", task_name, e);
                Vec::new()
            })
        });

        log::trace!("Scheduled '{}'", name);
        self.pending.push(PendingTask {
            name,
            handle,
            add_to_recent,
            should_select,
            replace_target,
        });
    }

    /// Schedule each loadable entry of an in-memory archive.
    ///
    /// Entry images carry `last_modified`, the archive file's mtime when it
    /// came from disk.
    fn schedule_archive(
        &mut self,
        data: &[u8],
        archive_name: &str,
        entry_pattern: Option<&str>,
        request: &LoadRequest,
        last_modified: SystemTime,
    ) -> usize {
        let registry = Arc::clone(&self.registry);
        let mut entries = Vec::new();
        let result = extract_entries(
            std::io::Cursor::new(data),
            archive_name,
            entry_pattern,
            &registry,
            |name, bytes, first| entries.push((name, bytes.to_vec(), first)),
        );

        if let Err(e) = result {
            log::error!("{}", e);
            return 0;
        }

        let count = entries.len();
        for (name, bytes, first) in entries {
            self.spawn_task(
                name,
                TaskInput::Memory(bytes, last_modified),
                request.options.clone(),
                false,
                request.should_select && first,
                request.replace_target,
            );
        }
        count
    }

    /// Start loading a source without blocking; returns the number of tasks created.
    ///
    /// Directories load every loadable file they contain and become watched.
    /// Zip archives (on disk or in memory) load every loadable entry;
    /// `archive.zip:entry` sources load that single entry.
    pub fn background_load(&mut self, request: LoadRequest) -> usize {
        let name = request.source.name();
        if request.should_select {
            log::debug!("Will select image '{}'", name);
        }

        match &request.source {
            Source::Buffer { name, data } => {
                log::info!("Loading image '{}' from {} byte buffer", name, data.len());
                if is_zip_name(name) {
                    self.recent.remove(name);
                    let count = self.schedule_archive(data, name, None, &request, SystemTime::now());
                    if count > 0 {
                        self.recent.add(name);
                    }
                    count
                } else {
                    self.spawn_task(
                        name.clone(),
                        TaskInput::Memory(data.clone(), SystemTime::now()),
                        request.options.clone(),
                        false,
                        request.should_select,
                        request.replace_target,
                    );
                    1
                }
            }
            Source::Path(path) if path.is_dir() => self.load_directory(path, &name, &request),
            Source::Path(path) if !path.exists() => match split_zip_entry(&name) {
                Some((archive, entry)) => self.load_archive_entry(&archive, &entry, &request),
                None => {
                    // A vanished source is dropped from recents whatever the request says.
                    self.recent.remove(&name);
                    log::error!("{}", LoadError::SourceNotFound(path.clone()));
                    0
                }
            },
            Source::Path(path) => {
                // Only re-added once the load succeeds.
                if request.add_to_recent {
                    self.recent.remove(&name);
                }
                if !path.is_file() {
                    log::error!("{}", LoadError::SourceNotFound(path.clone()));
                    return 0;
                }
                if is_zip_name(&name) {
                    self.load_archive_file(path, &name, &request)
                } else {
                    log::info!("Loading file '{}'...", name);
                    self.spawn_task(
                        name.clone(),
                        TaskInput::File(path.clone()),
                        request.options.clone(),
                        request.add_to_recent,
                        request.should_select,
                        request.replace_target,
                    );
                    1
                }
            }
            Source::ArchiveEntry { archive, entry } => {
                self.load_archive_entry(archive, entry, &request)
            }
        }
    }

    fn load_directory(&mut self, dir: &Path, name: &str, request: &LoadRequest) -> usize {
        log::info!("Loading images from folder '{}'", name);
        let canonical = match self.watch.add_directory(dir, true, &self.registry) {
            Ok(canonical) => canonical,
            Err(e) => {
                log::error!("Could not access directory '{}': {}", name, e);
                return 0;
            }
        };

        let files = match loadable_files(&canonical, &self.registry) {
            Ok(files) => files,
            Err(e) => {
                log::error!("Could not list directory '{}': {}", name, e);
                return 0;
            }
        };

        for (i, file) in files.iter().enumerate() {
            log::info!("Loading file '{}'...", file.display());
            self.spawn_task(
                file.to_string_lossy().into_owned(),
                TaskInput::File(file.clone()),
                request.options.clone(),
                false,
                i == 0 && request.should_select,
                request.replace_target,
            );
        }

        if request.add_to_recent {
            self.recent.add(name);
        }
        files.len()
    }

    /// Read a whole archive and its modification time.
    fn read_archive(&self, archive: &Path) -> Option<(Vec<u8>, SystemTime)> {
        if !archive.is_file() {
            log::error!("{}", LoadError::SourceNotFound(archive.to_path_buf()));
            return None;
        }
        let start = Instant::now();
        let modified = fs::metadata(archive)
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| SystemTime::now());
        match fs::read(archive) {
            Ok(data) if data.is_empty() => {
                log::warn!("Zip file '{}' is empty", archive.display());
                None
            }
            Ok(data) => {
                log::info!(
                    "Read zip file '{}' in {:.1}ms",
                    archive.display(),
                    start.elapsed().as_secs_f64() * 1000.0
                );
                Some((data, modified))
            }
            Err(e) => {
                log::error!("Failed to open zip file '{}': {}", archive.display(), e);
                None
            }
        }
    }

    fn load_archive_file(&mut self, archive: &Path, name: &str, request: &LoadRequest) -> usize {
        let Some((data, modified)) = self.read_archive(archive) else {
            return 0;
        };
        let count = self.schedule_archive(&data, name, None, request, modified);
        if count > 0 && request.add_to_recent {
            self.recent.add(name);
        }
        count
    }

    fn load_archive_entry(&mut self, archive: &Path, entry: &str, request: &LoadRequest) -> usize {
        let name = request.source.name();
        if request.add_to_recent || !archive.exists() {
            self.recent.remove(&name);
        }
        let Some((data, modified)) = self.read_archive(archive) else {
            return 0;
        };
        let archive_name = archive.to_string_lossy();
        let count = self.schedule_archive(&data, &archive_name, Some(entry), request, modified);
        if count > 0 && request.add_to_recent {
            self.recent.add(&name);
        }
        count
    }

    // ---- Draining ------------------------------------------------------

    /// Number of tasks not yet drained.
    pub fn num_pending_images(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Deliver the results of every finished task without blocking.
    ///
    /// `callback` receives each image with the task's replace target and
    /// selection flag. Unfinished tasks stay queued for the next call; finished
    /// tasks are removed exactly once, failed ones silently. Returns the number
    /// of images delivered.
    pub fn get_loaded_images(
        &mut self,
        mut callback: impl FnMut(DecodedImage, Option<ImageId>, bool),
    ) -> usize {
        let mut delivered = 0;
        for mut task in std::mem::take(&mut self.pending) {
            if !task.handle.is_ready() {
                self.pending.push(task);
                continue;
            }

            let images = task.handle.take().unwrap_or_default();
            if images.is_empty() {
                log::debug!("Dropping failed load of '{}'", task.name);
                continue;
            }

            for image in images {
                callback(image, task.replace_target, task.should_select);
                delivered += 1;
            }

            if task.add_to_recent {
                self.recent.add(&task.name);
            }
        }
        delivered
    }

    /// Drain finished tasks straight into `collection`.
    pub fn drain_into(&mut self, collection: &mut ImageCollection) -> usize {
        self.get_loaded_images(|image, target, select| {
            collection.accept(image, target, select);
        })
    }

    // ---- Recent files --------------------------------------------------

    pub fn recent_files(&self) -> &[String] {
        self.recent.entries()
    }

    /// Recent files newest first, long names elided as `head...tail`.
    pub fn recent_files_short(&self, head: usize, tail: usize) -> Vec<String> {
        self.recent.shortened(head, tail)
    }

    pub fn set_recent_files(&mut self, files: Vec<String>) {
        self.recent.set(files);
    }

    pub fn clear_recent_files(&mut self) {
        self.recent.clear();
    }

    pub fn remove_recent_file(&mut self, name: &str) {
        self.recent.remove(name);
    }

    /// Reload the `index`-th most recent source (0 = newest).
    pub fn load_recent_file(&mut self, index: usize, options: &LoadOptions) -> usize {
        let Some(name) = self.recent.newest(index).map(str::to_string) else {
            log::warn!("No recent file at index {}", index);
            return 0;
        };
        self.background_load(LoadRequest::open(&name, options.clone()).selecting(true))
    }

    // ---- Watching ------------------------------------------------------

    /// Start watching `dir`; see [`WatchRegistry::add_directory`].
    pub fn add_watched_directory(&mut self, dir: &Path, ignore_existing: bool) -> bool {
        if dir.as_os_str().is_empty() {
            return false;
        }
        match self.watch.add_directory(dir, ignore_existing, &self.registry) {
            Ok(_) => true,
            Err(e) => {
                log::error!("Could not access directory '{}': {}", dir.display(), e);
                false
            }
        }
    }

    pub fn remove_watched_directories(&mut self, criterion: impl FnMut(&Path) -> bool) {
        self.watch.remove_directories(criterion);
    }

    pub fn watched_directories(&self) -> Vec<PathBuf> {
        self.watch.directories().map(Path::to_path_buf).collect()
    }

    pub fn watch(&self) -> &WatchRegistry {
        &self.watch
    }

    /// One watch tick: reload modified images, then load new files.
    ///
    /// Modified images are reloaded with their own channel selector and replace
    /// themselves in `collection`. Returns the number of tasks scheduled.
    pub fn load_new_and_modified_files(
        &mut self,
        collection: &mut ImageCollection,
        defaults: &LoadOptions,
    ) -> usize {
        let current = collection.current();
        let mut reloads = Vec::new();

        for (id, image) in collection.iter_mut() {
            let path = backing_path(&image.filename);
            if !path.exists() {
                log::warn!("File {} '{}' no longer exists, skipping reload", id, image.filename);
                if self.watch.is_known(&path) {
                    self.watch.forget(&path);
                }
                continue;
            }
            let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) else {
                continue;
            };
            if modified != image.last_modified {
                // Stamp first so a slow or failing reload is not scheduled twice.
                image.last_modified = modified;
                let options = LoadOptions {
                    channel_selector: image.channel_selector.clone(),
                    ..defaults.clone()
                };
                reloads.push(
                    LoadRequest::open(&image.filename, options)
                        .with_recent(false)
                        .selecting(current == Some(id))
                        .replacing(Some(id)),
                );
            }
        }

        if reloads.is_empty() {
            log::debug!(
                "No modified files found to reload ({} known file(s) in watched folders)",
                self.watch.known_files()
            );
        }
        let mut scheduled: usize = reloads.into_iter().map(|r| self.background_load(r)).sum();

        for file in self.watch.take_new_files(&self.registry) {
            log::info!("New file in watched folder: '{}'", file.display());
            scheduled += self.background_load(LoadRequest::path(file, defaults.clone()));
        }
        scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recent::DEFAULT_RECENT_CAPACITY;

    #[test]
    fn test_thread_count_and_names() {
        let loader = BackgroundLoader::new(2, DEFAULT_RECENT_CAPACITY).unwrap();
        assert_eq!(loader.pool.current_num_threads(), 2);
        let name = loader
            .pool
            .install(|| std::thread::current().name().map(str::to_string));
        assert!(name.unwrap().starts_with("image-decoder-"));
    }

    #[test]
    fn test_missing_file_schedules_nothing() {
        let mut loader = BackgroundLoader::new(1, DEFAULT_RECENT_CAPACITY).unwrap();
        let n = loader.background_load(LoadRequest::path("/no/such/file.png", LoadOptions::default()));
        assert_eq!(n, 0);
        assert!(loader.is_idle());
    }

    #[test]
    fn test_empty_watch_path_rejected() {
        let mut loader = BackgroundLoader::new(1, DEFAULT_RECENT_CAPACITY).unwrap();
        assert!(!loader.add_watched_directory(Path::new(""), true));
        assert!(!loader.add_watched_directory(Path::new("/no/such/dir"), true));
        assert!(loader.watched_directories().is_empty());
    }

    #[test]
    fn test_load_recent_out_of_range() {
        let mut loader = BackgroundLoader::new(1, DEFAULT_RECENT_CAPACITY).unwrap();
        assert_eq!(loader.load_recent_file(3, &LoadOptions::default()), 0);
    }
}
