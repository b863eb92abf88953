//! Prober backed by the in-crate container parsers.

use std::path::Path;

use rp_core::MediaMetadata;

use crate::container::Container;
use crate::prober::Prober;

/// A [`Prober`] that reads MP4/MOV/M4V, MKV/WebM and AVI headers directly.
///
/// The parser is chosen once from the file extension. No external tools are
/// involved.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeProber;

impl NativeProber {
    /// Create a new `NativeProber`.
    pub fn new() -> Self {
        Self
    }
}

impl Prober for NativeProber {
    fn name(&self) -> &'static str {
        "native"
    }

    fn supports(&self, path: &Path) -> bool {
        Container::from_path(path) != Container::Unsupported
    }

    fn probe(&self, path: &Path) -> rp_core::Result<MediaMetadata> {
        let container = Container::from_path(path);
        tracing::trace!(path = %path.display(), %container, "native probe");
        container.parse_file(path).map_err(rp_core::Error::from)
    }
}
