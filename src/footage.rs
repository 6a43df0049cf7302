use std::path::Path;

use crate::{
    error::{UvfxError, UvfxResult},
    port::{MediaHandle, MediaLoader},
};

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "exr"];
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mkv", "mp4", "webm", "avi"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    SingleImage,
    ImageSequence,
    Movie,
}

/// Transient description of a directory's media, produced fresh on every
/// rebuild and never persisted.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedFootage {
    pub media: MediaHandle,
    pub frame_count: u64,
    pub kind: SourceKind,
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Scans `dir` (non-recursive) for the first recognized media entry and
/// classifies it.
///
/// The first image entry wins; the directory is a sequence when other
/// entries share its extension, with frame count equal to that entry count
/// (contiguous numbering is not validated). The first video entry wins as a
/// movie, with frame count taken from the decoded clip. Iteration order is
/// filesystem-defined, so which entry is "first" in a mixed directory is
/// not deterministic; directories are expected to hold one media set.
///
/// Returns `Ok(None)` when the directory holds no recognized media or
/// cannot be scanned at all (unset paths are a normal pre-configuration
/// state); callers skip the slot instead of failing the rebuild. Loader
/// failures on recognized media still propagate as [`UvfxError::Media`].
#[tracing::instrument(skip(media))]
pub fn resolve(dir: &Path, media: &mut dyn MediaLoader) -> UvfxResult<Option<ResolvedFootage>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "footage dir not scannable");
            return Ok(None);
        }
    };

    for entry in entries.flatten() {
        if entry.path().is_dir() {
            continue;
        }
        let Some(ext) = extension_of(&entry.path()) else {
            continue;
        };

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            let frame_count = count_entries_with_extension(dir, &ext)?;
            let kind = if frame_count == 1 {
                SourceKind::SingleImage
            } else {
                SourceKind::ImageSequence
            };
            let handle = media.load(&entry.path())?;
            tracing::debug!(dir = %dir.display(), ?kind, frame_count, "resolved image footage");
            return Ok(Some(ResolvedFootage {
                media: handle,
                frame_count,
                kind,
            }));
        }

        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            let handle = media.load(&entry.path())?;
            let frame_count = media.movie_frame_count(handle)?;
            tracing::debug!(dir = %dir.display(), frame_count, "resolved movie footage");
            return Ok(Some(ResolvedFootage {
                media: handle,
                frame_count,
                kind: SourceKind::Movie,
            }));
        }
    }

    Ok(None)
}

fn count_entries_with_extension(dir: &Path, ext: &str) -> UvfxResult<u64> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        UvfxError::media(format!("cannot scan footage dir '{}': {e}", dir.display()))
    })?;

    let mut count = 0;
    for entry in entries.flatten() {
        if entry.path().is_dir() {
            continue;
        }
        if extension_of(&entry.path()).as_deref() == Some(ext) {
            count += 1;
        }
    }
    Ok(count)
}
