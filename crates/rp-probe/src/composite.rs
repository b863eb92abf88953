//! A composite prober that delegates to multiple [`Prober`] implementations.

use std::path::Path;

use rp_core::MediaMetadata;

use crate::prober::Prober;

/// Tries each registered [`Prober`] in order and returns the first successful result.
///
/// This is how the native parsers are layered over the external probe: any
/// native failure falls through to the next prober, and results are never
/// merged between probers.
pub struct CompositeProber {
    probers: Vec<Box<dyn Prober>>,
}

impl CompositeProber {
    /// Create a new `CompositeProber` from an ordered list of probers.
    ///
    /// Probers are tried in the order provided. The first prober whose
    /// [`Prober::supports`] returns `true` and whose [`Prober::probe`] succeeds
    /// will have its result returned.
    pub fn new(probers: Vec<Box<dyn Prober>>) -> Self {
        Self { probers }
    }

    /// Names of the registered probers, in order.
    pub fn prober_names(&self) -> Vec<&'static str> {
        self.probers.iter().map(|p| p.name()).collect()
    }
}

impl Prober for CompositeProber {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn supports(&self, path: &Path) -> bool {
        self.probers.iter().any(|p| p.supports(path))
    }

    fn probe(&self, path: &Path) -> rp_core::Result<MediaMetadata> {
        if !path.exists() {
            return Err(rp_core::Error::file_not_found(path));
        }

        let mut last_err = None;

        for prober in &self.probers {
            if !prober.supports(path) {
                continue;
            }

            match prober.probe(path) {
                Ok(info) => return Ok(info),
                Err(e) => {
                    tracing::debug!(
                        prober = prober.name(),
                        error = %e,
                        "prober failed, trying next"
                    );
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            rp_core::Error::Probe(format!(
                "no prober supports file: {}",
                path.display()
            ))
        }))
    }
}
