//! Watched directories and the set of files already known in them.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::natural_sort::natural_cmp;
use crate::sniff::FormatRegistry;

/// Canonical form of a file path whose file may no longer exist.
///
/// The parent directory is canonicalized and the file name re-attached, so
/// symlinked files keep their own name.
pub fn canonical_file_path(path: &Path) -> PathBuf {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return path.to_path_buf();
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    fs::canonicalize(parent)
        .map(|p| p.join(name))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Loadable regular files directly inside `dir`, in natural name order.
pub fn loadable_files(dir: &Path, registry: &FormatRegistry) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| !t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && registry.is_loadable_path(path))
        .collect();
    files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(files)
}

/// Watched directories plus the files in them that should not trigger loads.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    directories: BTreeSet<PathBuf>,
    existing: HashSet<PathBuf>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watched directories, canonical and sorted.
    pub fn directories(&self) -> impl Iterator<Item = &Path> {
        self.directories.iter().map(PathBuf::as_path)
    }

    pub fn is_watched(&self, dir: &Path) -> bool {
        self.directories.contains(dir)
    }

    /// Start watching `dir`; returns its canonical path.
    ///
    /// With `ignore_existing`, every loadable file currently in the directory is
    /// marked as known so that the next scan does not load it.
    pub fn add_directory(
        &mut self,
        dir: &Path,
        ignore_existing: bool,
        registry: &FormatRegistry,
    ) -> io::Result<PathBuf> {
        let canonical = fs::canonicalize(dir)?;
        if !canonical.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", canonical.display()),
            ));
        }
        if self.is_watched(&canonical) {
            log::debug!("Folder {:?} is already watched", canonical);
        } else {
            log::trace!("Adding watched folder {:?}", canonical);
            self.directories.insert(canonical.clone());
        }

        if ignore_existing {
            let files = loadable_files(&canonical, registry)?;
            log::debug!("Ignoring {} existing file(s) in {:?}", files.len(), canonical);
            self.existing.extend(files);
        }
        Ok(canonical)
    }

    /// Stop watching every directory matching `criterion` and forget their files.
    pub fn remove_directories(&mut self, mut criterion: impl FnMut(&Path) -> bool) {
        self.directories.retain(|dir| !criterion(dir.as_path()));
        let directories = &self.directories;
        self.existing.retain(|file| {
            file.parent()
                .map(|parent| directories.contains(parent))
                .unwrap_or(false)
        });
    }

    /// Whether `file` is already known.
    pub fn is_known(&self, file: &Path) -> bool {
        self.existing.contains(&canonical_file_path(file))
    }

    /// Mark `file` as known; returns `false` if it already was.
    pub fn mark_known(&mut self, file: &Path) -> bool {
        self.existing.insert(canonical_file_path(file))
    }

    /// Forget a file, e.g. after it vanished from disk.
    pub fn forget(&mut self, file: &Path) {
        self.existing.remove(&canonical_file_path(file));
    }

    pub fn known_files(&self) -> usize {
        self.existing.len()
    }

    /// Loadable files in watched directories not yet known, marking them known.
    ///
    /// Files are grouped per directory and naturally sorted within each.
    pub fn take_new_files(&mut self, registry: &FormatRegistry) -> Vec<PathBuf> {
        let mut new_files = Vec::new();
        let directories: Vec<PathBuf> = self.directories.iter().cloned().collect();
        for dir in directories {
            match loadable_files(&dir, registry) {
                Ok(files) => {
                    new_files.extend(files.into_iter().filter(|file| self.mark_known(file)))
                }
                Err(e) => log::warn!("Could not scan watched folder {:?}: {}", dir, e),
            }
        }
        new_files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_loadable_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "img10.png");
        touch(dir.path(), "img2.png");
        touch(dir.path(), "notes.txt");
        fs::create_dir(dir.path().join("sub.png")).unwrap();

        let files = loadable_files(dir.path(), FormatRegistry::shared()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["img2.png", "img10.png"]);
    }

    #[test]
    fn test_ignore_existing_suppresses_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.png");
        let registry = FormatRegistry::shared();

        let mut watch = WatchRegistry::new();
        watch.add_directory(dir.path(), true, registry).unwrap();
        assert_eq!(watch.known_files(), 1);
        assert!(watch.take_new_files(registry).is_empty());

        let added = touch(dir.path(), "b.png");
        let new_files = watch.take_new_files(registry);
        assert_eq!(new_files, [canonical_file_path(&added)]);
        assert!(watch.take_new_files(registry).is_empty());
    }

    #[test]
    fn test_without_ignore_existing_all_files_are_new() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.png");
        touch(dir.path(), "b.jpg");
        let registry = FormatRegistry::shared();

        let mut watch = WatchRegistry::new();
        watch.add_directory(dir.path(), false, registry).unwrap();
        assert_eq!(watch.take_new_files(registry).len(), 2);
    }

    #[test]
    fn test_directories_are_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        let dotted = sub.join("..").join("sub");

        let mut watch = WatchRegistry::new();
        let canonical = watch
            .add_directory(&dotted, false, FormatRegistry::shared())
            .unwrap();
        assert_eq!(canonical, fs::canonicalize(&sub).unwrap());
        assert!(watch.is_watched(&canonical));
        assert_eq!(watch.directories().count(), 1);
    }

    #[test]
    fn test_remove_prunes_known_files() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(first.path(), "a.png");
        touch(second.path(), "b.png");
        let registry = FormatRegistry::shared();

        let mut watch = WatchRegistry::new();
        let first_dir = watch.add_directory(first.path(), true, registry).unwrap();
        watch.add_directory(second.path(), true, registry).unwrap();
        assert_eq!(watch.known_files(), 2);

        watch.remove_directories(|dir| dir == first_dir);
        assert_eq!(watch.directories().count(), 1);
        assert_eq!(watch.known_files(), 1);
        assert!(watch.is_known(&second.path().join("b.png")));
        assert!(!watch.is_known(&first.path().join("a.png")));
    }

    #[test]
    fn test_missing_directory_is_error() {
        let mut watch = WatchRegistry::new();
        assert!(watch
            .add_directory(Path::new("/no/such/dir"), true, FormatRegistry::shared())
            .is_err());
        assert_eq!(watch.directories().count(), 0);
    }

    #[test]
    fn test_forget() {
        let dir = tempfile::tempdir().unwrap();
        let file = touch(dir.path(), "a.png");
        let mut watch = WatchRegistry::new();
        assert!(watch.mark_known(&file));
        assert!(!watch.mark_known(&file));
        fs::remove_file(&file).unwrap();
        watch.forget(&file);
        assert_eq!(watch.known_files(), 0);
    }
}
