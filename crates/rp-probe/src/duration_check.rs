//! Batch duration-consistency check.

use serde::Serialize;

use rp_core::MediaMetadata;

/// Tolerance used when a non-positive one is supplied.
pub const DEFAULT_TOLERANCE_SECS: f64 = 1.0;

/// One file whose duration strays from the batch's first file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationMismatch {
    pub path: String,
    pub name: String,
    /// `HH:MM:SS` display of the file's duration.
    pub duration: String,
    /// Signed difference from the base, e.g. `"+5.0s"`.
    pub diff: String,
}

/// Outcome of [`check_duration_mismatch`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationCheckResult {
    pub has_mismatch: bool,
    /// `HH:MM:SS` display of the first file's duration; empty for an empty batch.
    pub base_duration: String,
    /// Tolerance actually applied, in seconds.
    pub tolerance: f64,
    pub mismatch_files: Vec<DurationMismatch>,
}

/// Compare every file's duration against the first file's.
///
/// Files differing by more than `tolerance` seconds get their mismatch flag
/// set and a descriptor in the result; every other file has its flag
/// cleared. Order follows the input.
pub fn check_duration_mismatch(files: &mut [MediaMetadata], tolerance: f64) -> DurationCheckResult {
    let tolerance = if tolerance > 0.0 {
        tolerance
    } else {
        DEFAULT_TOLERANCE_SECS
    };

    let mut result = DurationCheckResult {
        has_mismatch: false,
        base_duration: String::new(),
        tolerance,
        mismatch_files: Vec::new(),
    };

    let Some(first) = files.first() else {
        return result;
    };
    let base = first.duration_seconds;
    result.base_duration = first.duration_display();

    for file in files.iter_mut() {
        let diff = file.duration_seconds - base;
        file.has_duration_mismatch = diff.abs() > tolerance;
        if file.has_duration_mismatch {
            result.has_mismatch = true;
            result.mismatch_files.push(DurationMismatch {
                path: file.path.to_string_lossy().to_string(),
                name: file.display_name.clone(),
                duration: file.duration_display(),
                diff: format_diff(diff),
            });
        }
    }

    result
}

/// `"+X.Xs"` for non-negative differences, `"-X.Xs"` otherwise.
pub fn format_diff(seconds: f64) -> String {
    if seconds >= 0.0 {
        format!("+{seconds:.1}s")
    } else {
        format!("{seconds:.1}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn file(name: &str, duration: f64) -> MediaMetadata {
        let mut meta = MediaMetadata::new(Path::new(name), 0);
        meta.duration_seconds = duration;
        meta.video_codec = "h264".to_string();
        meta
    }

    #[test]
    fn flags_only_the_outlier() {
        let mut files = vec![file("a.mp4", 10.0), file("b.mp4", 10.3), file("c.mp4", 15.0)];
        let result = check_duration_mismatch(&mut files, 1.0);

        assert!(result.has_mismatch);
        assert_eq!(result.base_duration, "00:00:10");
        assert_eq!(result.mismatch_files.len(), 1);
        assert_eq!(result.mismatch_files[0].name, "c.mp4");
        assert_eq!(result.mismatch_files[0].diff, "+5.0s");
        assert_eq!(result.mismatch_files[0].duration, "00:00:15");
        assert!(!files[0].has_duration_mismatch);
        assert!(!files[1].has_duration_mismatch);
        assert!(files[2].has_duration_mismatch);
    }

    #[test]
    fn negative_difference_is_signed() {
        let mut files = vec![file("a.mkv", 60.0), file("b.mkv", 57.5)];
        let result = check_duration_mismatch(&mut files, 1.0);
        assert_eq!(result.mismatch_files[0].diff, "-2.5s");
    }

    #[test]
    fn empty_batch_has_no_mismatch() {
        let result = check_duration_mismatch(&mut [], 1.0);
        assert!(!result.has_mismatch);
        assert!(result.mismatch_files.is_empty());
        assert_eq!(result.base_duration, "");
    }

    #[test]
    fn single_file_never_mismatches() {
        let mut files = vec![file("a.avi", 42.0)];
        assert!(!check_duration_mismatch(&mut files, 0.1).has_mismatch);
    }

    #[test]
    fn non_positive_tolerance_uses_default() {
        let mut files = vec![file("a.mp4", 10.0), file("b.mp4", 10.9)];
        let result = check_duration_mismatch(&mut files, 0.0);
        assert_eq!(result.tolerance, DEFAULT_TOLERANCE_SECS);
        assert!(!result.has_mismatch);
        assert_eq!(check_duration_mismatch(&mut files, f64::NAN).tolerance, 1.0);
    }

    #[test]
    fn recomputes_flags_from_scratch() {
        let mut files = vec![file("a.mp4", 10.0), file("b.mp4", 20.0)];
        assert!(check_duration_mismatch(&mut files, 1.0).has_mismatch);
        assert!(files[1].has_duration_mismatch);

        let result = check_duration_mismatch(&mut files, 30.0);
        assert!(!result.has_mismatch);
        assert!(!files[1].has_duration_mismatch);
    }

    #[test]
    fn serializes_with_external_field_names() {
        let mut files = vec![file("a.mp4", 10.0), file("b.mp4", 15.0)];
        let json = serde_json::to_value(check_duration_mismatch(&mut files, 1.0)).unwrap();
        assert_eq!(json["hasMismatch"], true);
        assert_eq!(json["baseDuration"], "00:00:10");
        assert_eq!(json["tolerance"], 1.0);
        assert_eq!(json["mismatchFiles"][0]["diff"], "+5.0s");
    }
}
