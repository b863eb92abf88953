//! Prober assembly from configuration.

use rp_av::FfprobeProber;
use rp_probe::{CompositeProber, NativeProber, Prober};

use crate::config::ProbeConfig;

/// Build the prober chain: native parsers first, then ffprobe.
///
/// `native_only` forces the native parsers on and leaves ffprobe out.
pub fn build_prober(config: &ProbeConfig, native_only: bool) -> CompositeProber {
    let mut probers: Vec<Box<dyn Prober>> = Vec::new();

    if config.native || native_only {
        probers.push(Box::new(NativeProber::new()));
    }
    if config.fallback && !native_only {
        probers.push(Box::new(FfprobeProber::new(config.ffprobe_options())));
    }

    tracing::debug!(probers = ?probers.iter().map(|p| p.name()).collect::<Vec<_>>(), "prober chain");
    CompositeProber::new(probers)
}
