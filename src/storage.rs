// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for captured files
//!
//! Output names are a `YYMMDDHHMMSS` timestamp plus extension. Timelapse
//! frames add a shot number (`_0001` for bursts written by the tool itself,
//! `_1` for shots the panel spawns one at a time).

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Timestamp format used in every output name
pub const TIMESTAMP_FORMAT: &str = "%y%m%d%H%M%S";

pub fn timestamp_now() -> String {
    format_timestamp(&Local::now())
}

pub fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// `<dir>/<timestamp>.<extension>`
pub fn capture_path(dir: &Path, timestamp: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", timestamp, extension))
}

/// `<dir>/<timestamp>_%04d.<extension>`, numbered by the capture tool
pub fn sequence_pattern(dir: &Path, timestamp: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}_%04d.{}", timestamp, extension))
}

/// `<dir>/<timestamp>_<shot>.<extension>`, one file per spawned shot
pub fn shot_path(dir: &Path, timestamp: &str, shot: u32, extension: &str) -> PathBuf {
    dir.join(format!("{}_{}.{}", timestamp, shot, extension))
}

/// Count files in `dir` whose name starts with `prefix`
pub fn count_with_prefix(dir: &Path, prefix: &str) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .count()
}

/// Create an output directory if needed
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "Creating output directory");
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Remove stale preview frames left in the scratch directory
pub fn clear_preview_frames(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("test") && name.ends_with(".jpg") {
            if let Err(e) = fs::remove_file(entry.path()) {
                warn!(path = %entry.path().display(), error = %e, "Failed to remove preview frame");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format() {
        let time = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(format_timestamp(&time), "240307090502");
    }

    #[test]
    fn test_names() {
        let dir = Path::new("/home/pi/Pictures");
        assert_eq!(
            capture_path(dir, "240307090502", "jpg"),
            PathBuf::from("/home/pi/Pictures/240307090502.jpg")
        );
        assert_eq!(
            sequence_pattern(dir, "240307090502", "dng"),
            PathBuf::from("/home/pi/Pictures/240307090502_%04d.dng")
        );
        assert_eq!(
            shot_path(dir, "240307090502", 3, "png"),
            PathBuf::from("/home/pi/Pictures/240307090502_3.png")
        );
    }

    #[test]
    fn test_count_with_prefix() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["240307_0001.jpg", "240307_0002.jpg", "other.jpg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        assert_eq!(count_with_prefix(dir.path(), "240307"), 2);
        assert_eq!(count_with_prefix(Path::new("/does/not/exist"), "x"), 0);
    }
}
