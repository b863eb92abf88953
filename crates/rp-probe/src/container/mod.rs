//! Container family selection and the native parsers.

pub mod avi;
pub mod mkv;
pub mod mp4;

use std::path::Path;

use rp_core::{MediaMetadata, ParseError};

/// Container families with a native parser, plus everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// ISO base media file format (.mp4, .mov, .m4v)
    IsoBmff,
    /// Matroska / WebM (.mkv, .webm)
    Matroska,
    /// RIFF AVI (.avi)
    Riff,
    /// No native parser; only the external probe can handle it.
    Unsupported,
}

impl Container {
    /// Select the container family from the file extension alone.
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Container::Unsupported;
        };
        match ext.to_lowercase().as_str() {
            "mp4" | "mov" | "m4v" => Container::IsoBmff,
            "mkv" | "webm" => Container::Matroska,
            "avi" => Container::Riff,
            _ => Container::Unsupported,
        }
    }

    /// Run the native parser for this family.
    pub fn parse_file(self, path: &Path) -> Result<MediaMetadata, ParseError> {
        match self {
            Container::IsoBmff => mp4::parse_file(path),
            Container::Matroska => mkv::parse_file(path),
            Container::Riff => avi::parse_file(path),
            Container::Unsupported => Err(ParseError::not_this_format(
                "supported container",
                format!("no native parser for {}", path.display()),
            )),
        }
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Container::IsoBmff => write!(f, "ISO-BMFF"),
            Container::Matroska => write!(f, "Matroska"),
            Container::Riff => write!(f, "RIFF/AVI"),
            Container::Unsupported => write!(f, "unsupported"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_by_extension() {
        assert_eq!(Container::from_path(Path::new("a.MP4")), Container::IsoBmff);
        assert_eq!(Container::from_path(Path::new("a.mov")), Container::IsoBmff);
        assert_eq!(Container::from_path(Path::new("a.m4v")), Container::IsoBmff);
        assert_eq!(Container::from_path(Path::new("a.webm")), Container::Matroska);
        assert_eq!(Container::from_path(Path::new("a.mkv")), Container::Matroska);
        assert_eq!(Container::from_path(Path::new("a.AVI")), Container::Riff);
        assert_eq!(Container::from_path(Path::new("a.ts")), Container::Unsupported);
        assert_eq!(Container::from_path(Path::new("noext")), Container::Unsupported);
    }

    #[test]
    fn unsupported_parse_is_not_this_format() {
        let err = Container::Unsupported
            .parse_file(Path::new("clip.flv"))
            .unwrap_err();
        assert!(matches!(err, ParseError::NotThisFormat { .. }));
    }
}
