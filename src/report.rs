//! Human-readable and JSON rendering of probe results.

use std::fmt::Write;

use rp_core::{format_file_size, MediaMetadata};
use rp_probe::DurationCheckResult;
use serde::Serialize;

/// Result of the `scan` command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub files: Vec<MediaMetadata>,
    pub errors: Vec<String>,
    pub duration_check: DurationCheckResult,
}

/// Multi-line description of a single record.
pub fn format_metadata(meta: &MediaMetadata) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "File: {}", meta.path.display());
    let _ = writeln!(
        out,
        "Size: {} ({} bytes)",
        format_file_size(meta.file_size_bytes),
        meta.file_size_bytes
    );
    let _ = writeln!(out, "Duration: {}", meta.duration_display());
    let _ = writeln!(out, "Video: {} {}x{}", meta.video_codec, meta.width, meta.height);
    if meta.framerate_hz > 0.0 {
        let _ = writeln!(out, "Frame rate: {:.2} fps", meta.framerate_hz);
    }
    if !meta.audio_codec.is_empty() {
        let _ = writeln!(out, "Audio: {}", meta.audio_codec);
    }
    out
}

/// Table of scanned files followed by errors and the duration verdict.
pub fn format_scan(report: &ScanReport) -> String {
    let mut out = String::new();

    for meta in &report.files {
        let marker = if meta.has_duration_mismatch { "!" } else { " " };
        let _ = writeln!(
            out,
            "{marker} {}  {}  {}x{}  {}  {}",
            meta.display_name,
            meta.duration_display(),
            meta.width,
            meta.height,
            meta.video_codec,
            format_file_size(meta.file_size_bytes),
        );
    }

    if !report.errors.is_empty() {
        let _ = writeln!(out, "\nErrors: {}", report.errors.len());
        for err in &report.errors {
            let _ = writeln!(out, "  {err}");
        }
    }

    let check = &report.duration_check;
    if check.has_mismatch {
        let _ = writeln!(
            out,
            "\nDuration mismatch (base {}, tolerance {:.1}s):",
            check.base_duration, check.tolerance
        );
        for m in &check.mismatch_files {
            let _ = writeln!(out, "  {} {} ({})", m.name, m.duration, m.diff);
        }
    } else if !report.files.is_empty() {
        let _ = writeln!(out, "\nAll durations match {}", check.base_duration);
    }

    out
}
