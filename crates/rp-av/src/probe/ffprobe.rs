//! FFprobe-based media probing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rp_core::{Error, MediaMetadata, Result};
use rp_probe::builder::round2;
use rp_probe::Prober;
use serde::Deserialize;

use crate::command::ToolCommand;
use crate::tools::locate_tool;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Invocation settings for [`FfprobeProber`].
#[derive(Debug, Clone, PartialEq)]
pub struct FfprobeOptions {
    /// Explicit ffprobe binary; discovered when `None` or missing.
    pub binary: Option<PathBuf>,
    /// Passed as `-analyzeduration` (microseconds).
    pub analyze_duration_us: u64,
    /// Passed as `-probesize` (bytes).
    pub probe_size_bytes: u64,
    /// Longest a single ffprobe run may take before it is killed.
    pub timeout: Duration,
}

impl Default for FfprobeOptions {
    fn default() -> Self {
        Self {
            binary: None,
            analyze_duration_us: 2_000_000,
            probe_size_bytes: 2_000_000,
            timeout: Duration::from_secs(60),
        }
    }
}

/// A [`Prober`] that shells out to `ffprobe`.
///
/// Accepts any file; used as the fallback after the native parsers.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    binary: Option<PathBuf>,
    options: FfprobeOptions,
}

impl FfprobeProber {
    /// Create a prober, locating the ffprobe binary once.
    pub fn new(options: FfprobeOptions) -> Self {
        let binary = locate_tool("ffprobe", options.binary.as_deref());
        if binary.is_none() {
            tracing::warn!("ffprobe not found; fallback probing is unavailable");
        }
        Self { binary, options }
    }

    /// Create a prober that runs exactly `binary`, skipping discovery.
    pub fn with_binary(binary: impl Into<PathBuf>, options: FfprobeOptions) -> Self {
        Self {
            binary: Some(binary.into()),
            options,
        }
    }

    /// Resolved binary, if one was found.
    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }

    fn command(&self, binary: &Path, path: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(binary.to_path_buf());
        cmd.args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg("-analyzeduration")
        .arg(self.options.analyze_duration_us.to_string())
        .arg("-probesize")
        .arg(self.options.probe_size_bytes.to_string())
        .arg(path.to_string_lossy())
        .timeout(self.options.timeout);
        cmd
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new(FfprobeOptions::default())
    }
}

impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    fn supports(&self, _path: &Path) -> bool {
        true
    }

    fn probe(&self, path: &Path) -> Result<MediaMetadata> {
        let binary = self
            .binary
            .as_deref()
            .ok_or_else(|| Error::tool("ffprobe", "not found"))?;

        let file_size = std::fs::metadata(path)
            .map_err(|_| Error::file_not_found(path))?
            .len();

        tracing::debug!(binary = %binary.display(), path = %path.display(), "running ffprobe");
        let output = self.command(binary, path).execute_blocking()?;

        parse_ffprobe_output(path, file_size, &output.stdout)
    }
}

/// Map ffprobe's JSON onto a [`MediaMetadata`].
///
/// The first video stream supplies codec, dimensions and frame rate, the
/// first audio stream the audio codec. `file_size` comes from the caller's
/// stat, not from ffprobe.
pub fn parse_ffprobe_output(path: &Path, file_size: u64, json: &[u8]) -> Result<MediaMetadata> {
    let output: FfprobeOutput = serde_json::from_slice(json)
        .map_err(|e| Error::Probe(format!("invalid ffprobe output: {e}")))?;

    let mut meta = MediaMetadata::new(path, file_size);

    for stream in output.streams {
        match stream.codec_type.as_deref() {
            Some("video") if meta.video_codec.is_empty() => {
                meta.video_codec = stream.codec_name.unwrap_or_default();
                meta.width = stream.width.unwrap_or(0);
                meta.height = stream.height.unwrap_or(0);
                meta.framerate_hz = stream
                    .r_frame_rate
                    .as_deref()
                    .map(parse_frame_rate)
                    .filter(|r| *r > 0.0)
                    .or_else(|| stream.avg_frame_rate.as_deref().map(parse_frame_rate))
                    .unwrap_or(0.0);
            }
            Some("audio") if meta.audio_codec.is_empty() => {
                meta.audio_codec = stream.codec_name.unwrap_or_default();
            }
            _ => {}
        }
    }

    if let Some(duration) = output
        .format
        .duration
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
    {
        meta.duration_seconds = duration;
    }

    if !meta.has_video() {
        return Err(Error::Probe(format!(
            "no video stream found in {}",
            path.display()
        )));
    }

    Ok(meta)
}

/// Parse a frame rate such as `"30000/1001"` or `"25"`, rounded to two
/// decimals. `"0/0"` and anything unparsable yield 0.
pub fn parse_frame_rate(rate: &str) -> f64 {
    let rate = rate.trim();
    let value = match rate.split_once('/') {
        Some((num, den)) => match (num.parse::<f64>(), den.parse::<f64>()) {
            (Ok(num), Ok(den)) if den != 0.0 => num / den,
            _ => 0.0,
        },
        None => rate.parse::<f64>().unwrap_or(0.0),
    };
    if value.is_finite() && value > 0.0 {
        round2(value)
    } else {
        0.0
    }
}
