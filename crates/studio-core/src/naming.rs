//! Output filename derivation.
//!
//! Every job writes into a single base directory. Names are derived from the input file so
//! the same inputs always land on the same path; a user-supplied name replaces the derived
//! one but never leaves the base directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::media::dotted_extension;

/// Default prefix for split segments when the user leaves the prefix blank.
pub const DEFAULT_SEGMENT_PREFIX: &str = "split";

/// Tolerance applied to segment modification times (FAT and some network shares round to 2s).
const SEGMENT_MTIME_SLACK: Duration = Duration::from_secs(2);

/// Compute the output path for a job.
///
/// `target_ext` includes the leading dot; `None` keeps the input's extension.
pub fn resolve_output_path(
    base_dir: &Path,
    input: &Path,
    custom_name: Option<&str>,
    default_prefix: &str,
    target_ext: Option<&str>,
) -> PathBuf {
    let ext = match target_ext {
        Some(ext) => ext.to_string(),
        None => dotted_extension(input),
    };
    let base = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let final_name = match custom_name.and_then(usable_name) {
        Some(name) if name.ends_with(&ext) => name,
        Some(name) => format!("{name}{ext}"),
        None => format!("{default_prefix}_{base}{ext}"),
    };

    base_dir.join(final_name)
}

/// Trim a user-supplied name and reduce it to its final path component.
///
/// Returns `None` for blank names and names without a usable component (`..`, `/`).
pub fn usable_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let component = Path::new(trimmed).file_name()?.to_string_lossy();
    let component = component.trim();
    if component.is_empty() {
        None
    } else {
        Some(component.to_string())
    }
}

/// Prefix used for split segments: the trimmed custom prefix or [`DEFAULT_SEGMENT_PREFIX`].
pub fn segment_prefix(custom: Option<&str>) -> String {
    custom
        .and_then(usable_name)
        .unwrap_or_else(|| DEFAULT_SEGMENT_PREFIX.to_string())
}

/// The ffmpeg segment muxer output pattern, e.g. `<base>/split_%03d.wav`.
pub fn segment_pattern(base_dir: &Path, prefix: &str) -> PathBuf {
    base_dir.join(format!("{prefix}_%03d.wav"))
}

/// List the `{prefix}_NNN.wav` segments in `base_dir` written at or after `since`.
///
/// Older files with the same prefix (left over from earlier runs) are skipped. The result
/// is sorted by file name, which is segment order.
pub fn collect_segments(
    base_dir: &Path,
    prefix: &str,
    since: SystemTime,
) -> io::Result<Vec<PathBuf>> {
    let cutoff = since
        .checked_sub(SEGMENT_MTIME_SLACK)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let mut segments = Vec::new();

    for entry in fs::read_dir(base_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !is_segment_name(&name, prefix) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if modified >= cutoff {
            segments.push(entry.path());
        }
    }

    segments.sort();
    Ok(segments)
}

fn is_segment_name(name: &str, prefix: &str) -> bool {
    let Some(rest) = name
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };
    let Some(index) = rest.strip_suffix(".wav") else {
        return false;
    };
    index.len() >= 3 && index.chars().all(|ch| ch.is_ascii_digit())
}
