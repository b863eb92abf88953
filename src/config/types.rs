use rp_av::FfprobeOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProbeConfig {
    /// Try the built-in MP4/MKV/AVI parsers first
    #[serde(default = "default_true")]
    pub native: bool,

    /// Fall back to ffprobe when native parsing fails or the format is unsupported
    #[serde(default = "default_true")]
    pub fallback: bool,

    /// Explicit ffprobe binary (discovered next to the executable or on PATH otherwise)
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// ffprobe `-analyzeduration`, in microseconds
    #[serde(default = "default_analyze_duration")]
    pub analyze_duration_us: u64,

    /// ffprobe `-probesize`, in bytes
    #[serde(default = "default_probe_size")]
    pub probe_size_bytes: u64,

    /// Seconds a single ffprobe run may take before it is killed
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            native: true,
            fallback: true,
            ffprobe_path: None,
            analyze_duration_us: default_analyze_duration(),
            probe_size_bytes: default_probe_size(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ProbeConfig {
    pub fn ffprobe_options(&self) -> FfprobeOptions {
        FfprobeOptions {
            binary: self.ffprobe_path.clone(),
            analyze_duration_us: self.analyze_duration_us,
            probe_size_bytes: self.probe_size_bytes,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Maximum number of files parsed at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Allowed duration drift from the first file, in seconds
    #[serde(default = "default_tolerance")]
    pub tolerance_secs: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            tolerance_secs: default_tolerance(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_analyze_duration() -> u64 {
    2_000_000
}

fn default_probe_size() -> u64 {
    2_000_000
}

fn default_timeout() -> u64 {
    60
}

fn default_concurrency() -> usize {
    4
}

fn default_tolerance() -> f64 {
    rp_probe::DEFAULT_TOLERANCE_SECS
}
