//! reelprobe - media metadata extraction
//!
//! This library crate exposes the CLI building blocks for integration testing.

pub mod batch;
pub mod config;
pub mod probe;
pub mod report;
