//! The metadata record shared by every prober, plus formatting helpers.

use std::path::{Path, PathBuf};

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// File extensions recognised as video inputs (lowercase, without the dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "webm", "m4v", "wmv", "flv", "mts", "m2ts", "ts",
];

/// Metadata extracted from a single media file.
///
/// Numeric fields use zero for "unknown"; codec names are empty when absent.
/// The `HH:MM:SS` display form is always derived from
/// [`duration_seconds`](Self::duration_seconds) via [`format_duration`] and is
/// never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaMetadata {
    /// Path the record was produced from.
    pub path: PathBuf,
    /// Final path component, used for display.
    pub display_name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Duration in seconds.
    pub duration_seconds: f64,
    /// Frames per second.
    pub framerate_hz: f64,
    /// Normalized lowercase video codec name (e.g. "h264").
    pub video_codec: String,
    /// Normalized lowercase audio codec name (e.g. "aac").
    pub audio_codec: String,
    /// Size on disk in bytes.
    pub file_size_bytes: u64,
    /// Set by the batch duration checker, never by a parser.
    pub has_duration_mismatch: bool,
}

impl MediaMetadata {
    /// Create an empty record for `path` with the given on-disk size.
    pub fn new(path: &Path, file_size_bytes: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            display_name: display_name(path),
            width: 0,
            height: 0,
            duration_seconds: 0.0,
            framerate_hz: 0.0,
            video_codec: String::new(),
            audio_codec: String::new(),
            file_size_bytes,
            has_duration_mismatch: false,
        }
    }

    /// `HH:MM:SS` rendering of the duration.
    pub fn duration_display(&self) -> String {
        format_duration(self.duration_seconds)
    }

    /// A record counts as parsed only once a video codec is known.
    pub fn has_video(&self) -> bool {
        !self.video_codec.is_empty()
    }
}

impl Serialize for MediaMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("MediaMetadata", 11)?;
        s.serialize_field("path", &self.path.to_string_lossy())?;
        s.serialize_field("name", &self.display_name)?;
        s.serialize_field("width", &self.width)?;
        s.serialize_field("height", &self.height)?;
        s.serialize_field("duration", &self.duration_display())?;
        s.serialize_field("durationSeconds", &self.duration_seconds)?;
        s.serialize_field("framerate", &self.framerate_hz)?;
        s.serialize_field("codec", &self.video_codec)?;
        s.serialize_field("audioCodec", &self.audio_codec)?;
        s.serialize_field("fileSize", &self.file_size_bytes)?;
        s.serialize_field("hasDurationMismatch", &self.has_duration_mismatch)?;
        s.end()
    }
}

/// Final path component, or the whole path if it has none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Format seconds as `HH:MM:SS`, flooring to whole seconds.
///
/// Negative and non-finite inputs render as `00:00:00`.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Format a byte count with binary units (`"1.5 MB"`).
pub fn format_file_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut div = UNIT;
    let mut exp = 0usize;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let suffix = b"KMGTPE"[exp] as char;
    format!("{:.1} {}B", bytes as f64 / div as f64, suffix)
}

/// Whether the file extension is one reelprobe accepts as a video input.
pub fn is_supported_format(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_zero() {
        assert_eq!(format_duration(0.0), "00:00:00");
    }

    #[test]
    fn format_duration_floors() {
        assert_eq!(format_duration(59.999), "00:00:59");
        assert_eq!(format_duration(3661.5), "01:01:01");
        assert_eq!(format_duration(7200.0), "02:00:00");
    }

    #[test]
    fn format_duration_degenerate_inputs() {
        assert_eq!(format_duration(-5.0), "00:00:00");
        assert_eq!(format_duration(f64::NAN), "00:00:00");
        assert_eq!(format_duration(f64::INFINITY), "00:00:00");
    }

    #[test]
    fn format_duration_matches_floor_over_range() {
        for tenths in (0..40_000u64).step_by(37) {
            let secs = tenths as f64 / 10.0;
            let whole = secs.floor() as u64;
            let expected = format!(
                "{:02}:{:02}:{:02}",
                whole / 3600,
                (whole % 3600) / 60,
                whole % 60
            );
            assert_eq!(format_duration(secs), expected);
        }
    }

    #[test]
    fn file_size_units() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn supported_format_is_case_insensitive() {
        assert!(is_supported_format(Path::new("clip.MP4")));
        assert!(is_supported_format(Path::new("/a/b/show.m2ts")));
        assert!(!is_supported_format(Path::new("notes.txt")));
        assert!(!is_supported_format(Path::new("noext")));
    }

    #[test]
    fn new_record_is_empty() {
        let meta = MediaMetadata::new(Path::new("/videos/clip.mkv"), 1234);
        assert_eq!(meta.display_name, "clip.mkv");
        assert_eq!(meta.file_size_bytes, 1234);
        assert!(!meta.has_video());
        assert_eq!(meta.duration_display(), "00:00:00");
    }

    #[test]
    fn serializes_with_external_field_names() {
        let mut meta = MediaMetadata::new(Path::new("/videos/clip.mp4"), 42);
        meta.width = 1920;
        meta.height = 1080;
        meta.duration_seconds = 65.4;
        meta.framerate_hz = 29.97;
        meta.video_codec = "h264".to_string();
        meta.audio_codec = "aac".to_string();

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["name"], "clip.mp4");
        assert_eq!(json["duration"], "00:01:05");
        assert_eq!(json["durationSeconds"], 65.4);
        assert_eq!(json["codec"], "h264");
        assert_eq!(json["audioCodec"], "aac");
        assert_eq!(json["fileSize"], 42);
        assert_eq!(json["hasDurationMismatch"], false);
    }
}
