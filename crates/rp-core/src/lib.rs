//! rp-core: shared record types, formatting helpers, and errors.
//!
//! This crate is the foundational dependency for the other rp-* crates,
//! providing the [`MediaMetadata`] record every prober produces, the
//! deterministic duration/size formatters, and the unified error types.

pub mod error;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, ParseError, Result};
pub use media::*;
