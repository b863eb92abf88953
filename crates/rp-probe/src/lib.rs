//! # rp-probe
//!
//! Native, read-only metadata extraction for MP4/MOV/M4V, MKV/WebM and AVI.
//!
//! The three container walkers read only the boxes, elements and chunks that
//! describe the streams, recovering codec names, resolution, frame rate and
//! duration without invoking an external tool. They never read outside a
//! declared or capped boundary and every failure is a recoverable
//! [`ParseError`](rp_core::ParseError), so a [`CompositeProber`] can fall
//! back to an external probe.
//!
//! ## Quick start
//!
//! ```no_run
//! use rp_probe::{NativeProber, Prober};
//! use std::path::Path;
//!
//! let prober = NativeProber::new();
//! let meta = prober.probe(Path::new("movie.mkv")).unwrap();
//! println!("{} {}x{} {}", meta.video_codec, meta.width, meta.height, meta.duration_display());
//! ```

pub mod builder;
pub mod codec;
pub mod composite;
pub mod container;
pub mod duration_check;
pub mod native;
pub mod prober;
pub mod reader;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

// Re-export key types at crate root for convenience.
pub use composite::CompositeProber;
pub use container::Container;
pub use duration_check::{
    check_duration_mismatch, DurationCheckResult, DurationMismatch, DEFAULT_TOLERANCE_SECS,
};
pub use native::NativeProber;
pub use prober::Prober;
