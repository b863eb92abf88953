//! Bounded positional reads and the primitive integer codecs shared by the
//! container walkers.
//!
//! Every read names the offset it starts at and the exclusive end offset it
//! must not cross. The bound is checked before any byte is read, so a walker
//! can never pick up bytes belonging to a neighbouring box, element or chunk.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use rp_core::ParseError;

/// Byte order of a fixed-width integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Most significant byte first (ISO-BMFF, EBML).
    Big,
    /// Least significant byte first (RIFF).
    Little,
}

/// Interpret up to 8 raw bytes as an unsigned integer.
pub fn decode_uint(bytes: &[u8], endian: Endian) -> u64 {
    match endian {
        Endian::Big => bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
        Endian::Little => bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
    }
}

/// Integer part of a 16.16 fixed-point value.
pub fn fixed_16_16_integer(raw: u32) -> u32 {
    raw >> 16
}

/// Total length of an EBML variable-length integer, from its first byte.
///
/// Returns `None` for a zero first byte, which carries no length marker.
pub fn vint_length(first: u8) -> Option<usize> {
    if first == 0 {
        None
    } else {
        Some(first.leading_zeros() as usize + 1)
    }
}

/// Decode an EBML VINT held in `bytes`.
///
/// With `keep_marker` the length marker bit stays in the value, which is how
/// element IDs are compared. Data sizes strip it.
pub fn decode_vint(bytes: &[u8], keep_marker: bool) -> Option<u64> {
    let first = *bytes.first()?;
    let len = vint_length(first)?;
    if bytes.len() < len {
        return None;
    }
    let head = if keep_marker {
        first
    } else {
        // len == 8 leaves no data bits in the first byte.
        first & 0xFFu8.checked_shr(len as u32).unwrap_or(0)
    };
    Some(
        bytes[1..len]
            .iter()
            .fold(u64::from(head), |acc, &b| (acc << 8) | u64::from(b)),
    )
}

/// Render a FourCC as text, dropping trailing NUL padding.
pub fn fourcc_to_string(code: &[u8; 4]) -> String {
    String::from_utf8_lossy(code)
        .trim_end_matches('\0')
        .to_string()
}

/// A decoded VINT together with the number of bytes it occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vint {
    pub value: u64,
    pub len: u64,
}

/// Random-access reader over a seekable source with a known length.
///
/// Sequential reads avoid redundant seeks, so wrapping a [`BufReader`] keeps
/// forward walks cheap. The first structural fault seen (a read crossing a
/// boundary, a bad VINT, or one reported by a walker) is remembered so a
/// parser that ends up without a video track can report it.
pub struct SourceReader<R> {
    inner: R,
    len: u64,
    pos: u64,
    fault: Option<ParseError>,
}

impl SourceReader<BufReader<File>> {
    /// Open a file for bounded reading.
    pub fn open(path: &Path) -> Result<Self, ParseError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file))?)
    }
}

impl<R: Read + Seek> SourceReader<R> {
    /// Wrap a seekable source, measuring its length.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            len,
            pos: 0,
            fault: None,
        })
    }

    /// Total length of the source in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the source holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Record a structural fault and return it as an error.
    pub fn fault(&mut self, offset: u64, reason: impl Into<String>) -> ParseError {
        let reason = reason.into();
        if self.fault.is_none() {
            self.fault = Some(ParseError::malformed(offset, reason.clone()));
        }
        ParseError::malformed(offset, reason)
    }

    /// The first fault recorded since the reader was created.
    pub fn take_fault(&mut self) -> Option<ParseError> {
        self.fault.take()
    }

    /// Fill `buf` from `offset`, refusing to cross `end` or the source length.
    pub fn read_exact_at(&mut self, offset: u64, buf: &mut [u8], end: u64) -> Result<(), ParseError> {
        let want = buf.len() as u64;
        let Some(stop) = offset.checked_add(want) else {
            return Err(self.fault(offset, "read offset overflows"));
        };
        let limit = end.min(self.len);
        if stop > limit {
            return Err(self.fault(
                offset,
                format!("read of {want} bytes crosses boundary at {limit}"),
            ));
        }
        if self.pos != offset {
            self.pos = u64::MAX;
            self.inner.seek(SeekFrom::Start(offset))?;
        }
        if let Err(e) = self.inner.read_exact(buf) {
            // Position is unknown after a failed read.
            self.pos = u64::MAX;
            return Err(if e.kind() == io::ErrorKind::UnexpectedEof {
                self.fault(offset, "truncated read")
            } else {
                ParseError::Io(e)
            });
        }
        self.pos = stop;
        Ok(())
    }

    /// Read a fixed-size array.
    pub fn bytes<const N: usize>(&mut self, offset: u64, end: u64) -> Result<[u8; N], ParseError> {
        let mut buf = [0u8; N];
        self.read_exact_at(offset, &mut buf, end)?;
        Ok(buf)
    }

    /// Read `n` bytes into a new Vec.
    pub fn vec(&mut self, offset: u64, n: usize, end: u64) -> Result<Vec<u8>, ParseError> {
        let mut buf = vec![0u8; n];
        self.read_exact_at(offset, &mut buf, end)?;
        Ok(buf)
    }

    /// Read an unsigned integer of `width` bytes (1..=8).
    pub fn uint(&mut self, offset: u64, width: usize, endian: Endian, end: u64) -> Result<u64, ParseError> {
        if width == 0 || width > 8 {
            return Err(ParseError::malformed(
                offset,
                format!("unsupported integer width {width}"),
            ));
        }
        let mut buf = [0u8; 8];
        self.read_exact_at(offset, &mut buf[..width], end)?;
        Ok(decode_uint(&buf[..width], endian))
    }

    pub fn u16_at(&mut self, offset: u64, endian: Endian, end: u64) -> Result<u16, ParseError> {
        Ok(self.uint(offset, 2, endian, end)? as u16)
    }

    pub fn u32_at(&mut self, offset: u64, endian: Endian, end: u64) -> Result<u32, ParseError> {
        Ok(self.uint(offset, 4, endian, end)? as u32)
    }

    pub fn u64_at(&mut self, offset: u64, endian: Endian, end: u64) -> Result<u64, ParseError> {
        self.uint(offset, 8, endian, end)
    }

    pub fn fourcc(&mut self, offset: u64, end: u64) -> Result<[u8; 4], ParseError> {
        self.bytes::<4>(offset, end)
    }

    /// Integer part of a big-endian 16.16 fixed-point field.
    pub fn fixed_16_16(&mut self, offset: u64, end: u64) -> Result<u32, ParseError> {
        Ok(fixed_16_16_integer(self.u32_at(offset, Endian::Big, end)?))
    }

    /// Read an EBML data VINT (marker bit stripped).
    pub fn vint(&mut self, offset: u64, end: u64) -> Result<Vint, ParseError> {
        self.read_vint(offset, end, false)
    }

    /// Read an EBML element ID (marker bit retained).
    pub fn element_id(&mut self, offset: u64, end: u64) -> Result<Vint, ParseError> {
        self.read_vint(offset, end, true)
    }

    fn read_vint(&mut self, offset: u64, end: u64, keep_marker: bool) -> Result<Vint, ParseError> {
        let [first] = self.bytes::<1>(offset, end).map_err(|e| vint_error(e, offset))?;
        let Some(len) = vint_length(first) else {
            if self.fault.is_none() {
                self.fault = Some(ParseError::MalformedVint { offset });
            }
            return Err(ParseError::MalformedVint { offset });
        };
        let mut buf = [0u8; 8];
        buf[0] = first;
        if len > 1 {
            self.read_exact_at(offset + 1, &mut buf[1..len], end)
                .map_err(|e| vint_error(e, offset))?;
        }
        let value = decode_vint(&buf[..len], keep_marker).ok_or(ParseError::MalformedVint { offset })?;
        Ok(Vint {
            value,
            len: len as u64,
        })
    }
}

fn vint_error(err: ParseError, offset: u64) -> ParseError {
    match err {
        ParseError::Io(e) => ParseError::Io(e),
        _ => ParseError::MalformedVint { offset },
    }
}
