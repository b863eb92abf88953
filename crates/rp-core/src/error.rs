//! Error types for reelprobe.
//!
//! [`ParseError`] is the taxonomy the native container parsers report. Every
//! variant is recoverable: the dispatcher treats all of them as "fall back to
//! the external probe". [`Error`] is the unified error surfaced by probers and
//! tools.

use std::path::PathBuf;

/// Failure reported by a native container parser.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The header signature does not match the expected container.
    #[error("not a {format} file: {reason}")]
    NotThisFormat {
        /// Container family that was expected (e.g. "RIFF/AVI").
        format: &'static str,
        /// What was wrong with the signature.
        reason: String,
    },

    /// A size field violates container bounds or a read was cut short.
    #[error("malformed structure at offset {offset}: {reason}")]
    Malformed {
        /// Absolute file offset where the problem was detected.
        offset: u64,
        /// Human-readable description.
        reason: String,
    },

    /// An EBML variable-length integer had no marker bit or was truncated.
    #[error("malformed variable-length integer at offset {offset}")]
    MalformedVint {
        /// Absolute file offset of the first VINT byte.
        offset: u64,
    },

    /// The structure was walked completely but held no usable video track.
    #[error("no video track found")]
    NoVideoTrack,

    /// The RIFF structure was walked completely but held no `vids` stream.
    #[error("no video stream found")]
    NoVideoStream,

    /// The file could not be opened or read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Convenience constructor for [`ParseError::NotThisFormat`].
    pub fn not_this_format(format: &'static str, reason: impl Into<String>) -> Self {
        ParseError::NotThisFormat {
            format,
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`ParseError::Malformed`].
    pub fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        ParseError::Malformed {
            offset,
            reason: reason.into(),
        }
    }
}

/// Unified error type covering all failure modes in reelprobe.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input path does not exist.
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A native container parser rejected the file.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// An external tool (ffprobe) failed or is missing.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Probing failed for a reason not covered above.
    #[error("Probe error: {0}")]
    Probe(String),

    /// Input data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Convenience constructor for [`Error::FileNotFound`].
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Error::FileNotFound { path: path.into() }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
