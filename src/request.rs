//! Load requests and source identities.

use std::fmt;
use std::path::{Path, PathBuf};

use imgload_codecs::LoadOptions;

use crate::collection::ImageId;

/// Where the bytes of a load come from.
#[derive(Clone)]
pub enum Source {
    /// A file, directory or archive on disk.
    Path(PathBuf),
    /// Bytes already in memory (downloads, drag-and-drop, archive entries).
    Buffer { name: String, data: Vec<u8> },
    /// A single entry inside an on-disk zip archive.
    ArchiveEntry { archive: PathBuf, entry: String },
}

impl Source {
    /// Interpret a user-supplied string, splitting `archive.zip:entry` forms.
    ///
    /// A string naming an existing file is always taken as a plain path.
    pub fn parse(s: &str) -> Self {
        let path = Path::new(s);
        if !path.exists() {
            if let Some((archive, entry)) = split_zip_entry(s) {
                return Source::ArchiveEntry { archive, entry };
            }
        }
        Source::Path(path.to_path_buf())
    }

    /// Identity used for logging and the recent-files list.
    pub fn name(&self) -> String {
        match self {
            Source::Path(path) => path.to_string_lossy().into_owned(),
            Source::Buffer { name, .. } => name.clone(),
            Source::ArchiveEntry { archive, entry } => {
                format!("{}:{}", archive.to_string_lossy(), entry)
            }
        }
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Source::Buffer { name, data } => f
                .debug_struct("Buffer")
                .field("name", name)
                .field("len", &data.len())
                .finish(),
            Source::ArchiveEntry { archive, entry } => f
                .debug_struct("ArchiveEntry")
                .field("archive", archive)
                .field("entry", entry)
                .finish(),
        }
    }
}

/// Split `archive.zip:entry` (or `archive.zip/entry`, the name given to
/// images loaded from archives) into archive path and entry path.
pub fn split_zip_entry(s: &str) -> Option<(PathBuf, String)> {
    let lower = s.to_ascii_lowercase();
    let mut search_from = 0;
    while let Some(found) = lower[search_from..].find(".zip") {
        let end = search_from + found + ".zip".len();
        let rest = &s[end..];
        if let Some(entry) = rest
            .strip_prefix(':')
            .or_else(|| rest.strip_prefix('/'))
            .or_else(|| rest.strip_prefix('\\'))
        {
            if !entry.is_empty() {
                return Some((PathBuf::from(&s[..end]), entry.to_string()));
            }
        }
        search_from = end;
    }
    None
}

/// Whether a name carries the `.zip` extension.
pub fn is_zip_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// The file on disk whose modification time governs an image's reloads.
pub(crate) fn backing_path(filename: &str) -> PathBuf {
    let path = Path::new(filename);
    if path.exists() {
        return path.to_path_buf();
    }
    split_zip_entry(filename)
        .map(|(archive, _)| archive)
        .unwrap_or_else(|| path.to_path_buf())
}

/// One call's worth of work for the background loader.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub source: Source,
    pub options: LoadOptions,
    /// Add the source to the recent list once it loads successfully.
    pub add_to_recent: bool,
    /// Ask the host to select the (first) resulting image.
    pub should_select: bool,
    /// Existing image the result should replace.
    pub replace_target: Option<ImageId>,
}

impl LoadRequest {
    pub fn new(source: Source, options: LoadOptions) -> Self {
        Self {
            source,
            options,
            add_to_recent: true,
            should_select: false,
            replace_target: None,
        }
    }

    /// Request for a user-supplied string (path, directory, archive or `archive.zip:entry`).
    pub fn open(name: &str, options: LoadOptions) -> Self {
        Self::new(Source::parse(name), options)
    }

    pub fn path(path: impl Into<PathBuf>, options: LoadOptions) -> Self {
        Self::new(Source::Path(path.into()), options)
    }

    pub fn buffer(name: impl Into<String>, data: Vec<u8>, options: LoadOptions) -> Self {
        Self::new(
            Source::Buffer {
                name: name.into(),
                data,
            },
            options,
        )
    }

    pub fn with_recent(mut self, add_to_recent: bool) -> Self {
        self.add_to_recent = add_to_recent;
        self
    }

    pub fn selecting(mut self, should_select: bool) -> Self {
        self.should_select = should_select;
        self
    }

    pub fn replacing(mut self, target: Option<ImageId>) -> Self {
        self.replace_target = target;
        self
    }
}
