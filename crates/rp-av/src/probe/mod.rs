//! Media probing through external command-line tools.

mod ffprobe;

pub use ffprobe::{parse_frame_rate, parse_ffprobe_output, FfprobeOptions, FfprobeProber};
