//! Zip archive expansion.
//!
//! Enumerates the loadable entries of an archive and hands each one, with a
//! compound `archive/entry` name, to a caller-supplied scheduler.

use std::io::{Read, Seek};
use std::path::Path;

use web_time::Instant;
use zip::ZipArchive;

use crate::error::LoadError;
use crate::sniff::FormatRegistry;

/// Whether an entry is a candidate for loading.
fn is_candidate_entry(name: &str, registry: &FormatRegistry) -> bool {
    // Skip hidden files and macOS metadata
    if name.split(['/', '\\']).any(|c| c.eq_ignore_ascii_case("__MACOSX")) {
        return false;
    }
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name);
    if base.starts_with('.') {
        return false;
    }
    registry.is_loadable(name)
}

/// Largest up-front reservation for one entry; bigger entries grow while reading.
const MAX_ENTRY_RESERVE: u64 = 64 << 20;

/// Bytes to reserve for an entry whose directory record declares `declared` bytes.
fn entry_reserve(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_ENTRY_RESERVE)).unwrap_or(0)
}

/// Compound identity of an archive entry.
pub fn entry_name(archive_name: &str, entry: &str) -> String {
    format!("{}/{}", archive_name, entry)
}

/// Expand the loadable entries of a zip archive.
///
/// `schedule` receives the compound name, the entry bytes (in a scratch buffer
/// reused across entries) and whether it is the first scheduled entry. With an
/// `entry_pattern`, only the entry whose path equals it is scheduled.
///
/// Returns the number of scheduled entries. Entries that fail to extract are
/// logged and skipped without affecting their siblings.
pub fn extract_entries<R: Read + Seek>(
    reader: R,
    archive_name: &str,
    entry_pattern: Option<&str>,
    registry: &FormatRegistry,
    mut schedule: impl FnMut(String, &[u8], bool),
) -> Result<usize, LoadError> {
    let start = Instant::now();
    let mut archive = ZipArchive::new(reader).map_err(|e| LoadError::archive(archive_name, e))?;
    log::debug!("Zip '{}' contains {} entries", archive_name, archive.len());

    let mut scratch = Vec::new();
    let mut scheduled = 0;

    for i in 0..archive.len() {
        let mut file = match archive.by_index(i) {
            Ok(file) => file,
            Err(e) => {
                log::warn!("{}", LoadError::archive(archive_name, format!("entry {}: {}", i, e)));
                continue;
            }
        };

        let name = file.name().to_string();
        if file.is_dir() {
            log::trace!("Skipping directory: {}", name);
            continue;
        }
        if !is_candidate_entry(&name, registry) {
            log::trace!("Skipping non-image: {}", name);
            continue;
        }
        if entry_pattern.is_some_and(|pattern| pattern != name) {
            continue;
        }

        scratch.clear();
        scratch.reserve(entry_reserve(file.size()));
        if let Err(e) = file.read_to_end(&mut scratch) {
            log::warn!(
                "{}",
                LoadError::archive(archive_name, format!("failed to extract '{}': {}", name, e))
            );
            continue;
        }

        log::debug!("Extracted '{}' ({} bytes)", name, scratch.len());
        schedule(entry_name(archive_name, &name), &scratch, scheduled == 0);
        scheduled += 1;

        if entry_pattern.is_some() {
            break;
        }
    }

    if scheduled == 0 {
        log::warn!("{}", LoadError::NoLoadableEntries(archive_name.to_string()));
    }
    log::info!(
        "Scheduled {} image(s) from zip '{}' in {:.1}ms",
        scheduled,
        archive_name,
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(scheduled)
}
