//! rp-av: external tool integration for reelprobe.
//!
//! Locates `ffprobe` and wraps it as a [`Prober`](rp_probe::Prober) used as
//! the fallback behind the native container parsers. Every tool run goes
//! through [`ToolCommand`], which enforces a timeout.

pub mod command;
pub mod probe;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use probe::{parse_frame_rate, FfprobeOptions, FfprobeProber};
pub use tools::{check_tool_at, check_tools, locate_tool, ToolInfo};
