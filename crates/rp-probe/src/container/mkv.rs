//! Matroska / WebM walker.
//!
//! Parsing is bounded to the Segment's declared size and never looks further
//! than [`SEGMENT_SCAN_LIMIT`] bytes past the segment start. Every child
//! element's end is clamped to its parent's, so a lying size field cannot
//! widen the region being read.

use std::io::{Read, Seek};
use std::path::Path;

use rp_core::{MediaMetadata, ParseError};

use crate::builder::{round2, MetadataBuilder, VideoTrack};
use crate::codec;
use crate::reader::{decode_uint, Endian, SourceReader};

const FORMAT: &str = "EBML/Matroska";

/// How far into the Segment the walker reads.
pub const SEGMENT_SCAN_LIMIT: u64 = 10 * 1024 * 1024;

/// Longest `CodecID` string read.
const MAX_STRING_LEN: u64 = 1024;

const DEFAULT_TIMESTAMP_SCALE: u64 = 1_000_000;

// Element IDs, marker bit included.
const ID_EBML: u64 = 0x1A45_DFA3;
const ID_SEGMENT: u64 = 0x1853_8067;
const ID_INFO: u64 = 0x1549_A966;
const ID_TIMESTAMP_SCALE: u64 = 0x2A_D7B1;
const ID_DURATION: u64 = 0x4489;
const ID_TRACKS: u64 = 0x1654_AE6B;
const ID_TRACK_ENTRY: u64 = 0xAE;
const ID_TRACK_TYPE: u64 = 0x83;
const ID_CODEC_ID: u64 = 0x86;
const ID_DEFAULT_DURATION: u64 = 0x23_E383;
const ID_VIDEO: u64 = 0xE0;
const ID_PIXEL_WIDTH: u64 = 0xB0;
const ID_PIXEL_HEIGHT: u64 = 0xBA;

const TRACK_TYPE_VIDEO: u64 = 1;
const TRACK_TYPE_AUDIO: u64 = 2;

/// Header of one EBML element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub id: u64,
    pub data_start: u64,
    /// Declared payload size, before clamping.
    pub declared_size: u64,
    /// Payload end, clamped to the enclosing element.
    pub data_end: u64,
}

/// Iterates sibling elements within `[pos, end)`.
///
/// Stops at the first unreadable header; the cursor always advances past at
/// least the two header bytes.
#[derive(Debug, Clone)]
pub struct ElementWalker {
    pos: u64,
    end: u64,
}

impl ElementWalker {
    pub fn new(start: u64, end: u64) -> Self {
        Self { pos: start, end }
    }

    pub fn children(parent: &Element) -> Self {
        Self::new(parent.data_start, parent.data_end)
    }

    pub fn next<R: Read + Seek>(&mut self, reader: &mut SourceReader<R>) -> Option<Element> {
        if self.pos >= self.end {
            return None;
        }
        match read_element(reader, self.pos, self.end) {
            Ok(element) => {
                self.pos = element.data_end;
                Some(element)
            }
            Err(e) => {
                tracing::debug!(offset = self.pos, error = %e, "unreadable element header, stopping walk");
                self.pos = self.end;
                None
            }
        }
    }
}

fn read_element<R: Read + Seek>(
    reader: &mut SourceReader<R>,
    offset: u64,
    end: u64,
) -> Result<Element, ParseError> {
    let id = reader.element_id(offset, end)?;
    let size = reader.vint(offset + id.len, end)?;
    let data_start = offset + id.len + size.len;
    Ok(Element {
        id: id.value,
        data_start,
        declared_size: size.value,
        data_end: data_start.saturating_add(size.value).min(end),
    })
}

/// Parse an MKV/WebM file.
pub fn parse_file(path: &Path) -> Result<MediaMetadata, ParseError> {
    let mut reader = SourceReader::open(path)?;
    parse(&mut reader, path)
}

/// Parse Matroska from an open source.
pub fn parse<R: Read + Seek>(
    reader: &mut SourceReader<R>,
    path: &Path,
) -> Result<MediaMetadata, ParseError> {
    let file_len = reader.len();

    let header = read_element(reader, 0, file_len)
        .map_err(|_| ParseError::not_this_format(FORMAT, "unreadable EBML header"))?;
    if header.id != ID_EBML {
        return Err(ParseError::not_this_format(FORMAT, "missing EBML header"));
    }
    let header_end = header.data_start.saturating_add(header.declared_size);

    let segment = read_element(reader, header_end, file_len)
        .ok()
        .filter(|segment| segment.id == ID_SEGMENT)
        .ok_or_else(|| ParseError::not_this_format(FORMAT, "no Segment element found"))?;

    let limit = segment
        .data_start
        .saturating_add(segment.declared_size)
        .min(segment.data_start.saturating_add(SEGMENT_SCAN_LIMIT));

    let mut builder = MetadataBuilder::new();
    let mut timestamp_scale = DEFAULT_TIMESTAMP_SCALE;
    let mut duration_ticks = 0.0;

    let mut top = ElementWalker::new(segment.data_start, limit);
    while let Some(element) = top.next(reader) {
        match element.id {
            ID_INFO => {
                let info = parse_info(reader, &element);
                if let Some(scale) = info.timestamp_scale.filter(|s| *s > 0) {
                    timestamp_scale = scale;
                }
                if let Some(ticks) = info.duration {
                    duration_ticks = ticks;
                }
            }
            ID_TRACKS => builder.merge(parse_tracks(reader, &element)),
            _ => {}
        }
    }

    if duration_ticks > 0.0 {
        builder.offer_duration(duration_ticks * timestamp_scale as f64 / 1e9);
    }

    builder.finish(path, file_len, || {
        reader.take_fault().unwrap_or(ParseError::NoVideoTrack)
    })
}

// ---------------------------------------------------------------------------
// Info
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct InfoSummary {
    timestamp_scale: Option<u64>,
    duration: Option<f64>,
}

fn parse_info<R: Read + Seek>(reader: &mut SourceReader<R>, info: &Element) -> InfoSummary {
    let mut summary = InfoSummary::default();
    let mut children = ElementWalker::children(info);
    while let Some(child) = children.next(reader) {
        match child.id {
            ID_TIMESTAMP_SCALE => summary.timestamp_scale = read_uint(reader, &child).ok(),
            ID_DURATION => summary.duration = read_float(reader, &child).ok(),
            _ => {}
        }
    }
    summary
}

// ---------------------------------------------------------------------------
// Tracks
// ---------------------------------------------------------------------------

fn parse_tracks<R: Read + Seek>(reader: &mut SourceReader<R>, tracks: &Element) -> MetadataBuilder {
    let mut builder = MetadataBuilder::new();
    let mut children = ElementWalker::children(tracks);
    while let Some(child) = children.next(reader) {
        if child.id == ID_TRACK_ENTRY {
            builder.merge(parse_track_entry(reader, &child));
        }
    }
    builder
}

fn parse_track_entry<R: Read + Seek>(reader: &mut SourceReader<R>, entry: &Element) -> MetadataBuilder {
    let mut track_type = 0;
    let mut codec_id = String::new();
    let mut default_duration = 0;
    let mut dimensions = (0, 0);

    let mut children = ElementWalker::children(entry);
    while let Some(child) = children.next(reader) {
        match child.id {
            ID_TRACK_TYPE => track_type = read_uint(reader, &child).unwrap_or(0),
            ID_CODEC_ID => codec_id = read_string(reader, &child).unwrap_or_default(),
            ID_DEFAULT_DURATION => default_duration = read_uint(reader, &child).unwrap_or(0),
            ID_VIDEO => dimensions = parse_video(reader, &child),
            _ => {}
        }
    }

    let mut builder = MetadataBuilder::new();
    match track_type {
        TRACK_TYPE_VIDEO => {
            let framerate_hz = if default_duration > 0 {
                round2(1e9 / default_duration as f64)
            } else {
                0.0
            };
            builder.offer_video(VideoTrack {
                codec: codec::mkv_video_codec(&codec_id),
                width: dimensions.0,
                height: dimensions.1,
                framerate_hz,
            });
        }
        TRACK_TYPE_AUDIO => {
            builder.offer_audio(codec::mkv_audio_codec(&codec_id));
        }
        _ => {}
    }
    builder
}

/// `PixelWidth` and `PixelHeight` from a `Video` element.
fn parse_video<R: Read + Seek>(reader: &mut SourceReader<R>, video: &Element) -> (u32, u32) {
    let (mut width, mut height) = (0, 0);
    let mut children = ElementWalker::children(video);
    while let Some(child) = children.next(reader) {
        match child.id {
            ID_PIXEL_WIDTH => width = read_uint(reader, &child).map(clamp_u32).unwrap_or(0),
            ID_PIXEL_HEIGHT => height = read_uint(reader, &child).map(clamp_u32).unwrap_or(0),
            _ => {}
        }
    }
    (width, height)
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Payload readers
// ---------------------------------------------------------------------------

fn read_uint<R: Read + Seek>(reader: &mut SourceReader<R>, element: &Element) -> Result<u64, ParseError> {
    let len = element.declared_size;
    if len > 8 {
        return Err(ParseError::malformed(
            element.data_start,
            format!("unsigned integer of {len} bytes"),
        ));
    }
    if len == 0 {
        return Ok(0);
    }
    let bytes = reader.vec(element.data_start, len as usize, element.data_end)?;
    Ok(decode_uint(&bytes, Endian::Big))
}

fn read_float<R: Read + Seek>(reader: &mut SourceReader<R>, element: &Element) -> Result<f64, ParseError> {
    match element.declared_size {
        4 => {
            let bits = reader.u32_at(element.data_start, Endian::Big, element.data_end)?;
            Ok(f64::from(f32::from_bits(bits)))
        }
        8 => {
            let bits = reader.u64_at(element.data_start, Endian::Big, element.data_end)?;
            Ok(f64::from_bits(bits))
        }
        n => Err(ParseError::malformed(
            element.data_start,
            format!("float of {n} bytes"),
        )),
    }
}

fn read_string<R: Read + Seek>(reader: &mut SourceReader<R>, element: &Element) -> Result<String, ParseError> {
    let len = element.declared_size.min(MAX_STRING_LEN);
    let bytes = reader.vec(element.data_start, len as usize, element.data_end)?;
    Ok(String::from_utf8_lossy(&bytes)
        .trim_end_matches('\0')
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ebml_element, MkvFixture};
    use std::io::Cursor;

    fn parse_bytes(bytes: Vec<u8>) -> Result<MediaMetadata, ParseError> {
        let mut reader = SourceReader::new(Cursor::new(bytes)).unwrap();
        parse(&mut reader, Path::new("clip.mkv"))
    }

    #[test]
    fn parses_default_fixture() {
        let fixture = MkvFixture::default();
        let meta = parse_bytes(fixture.build()).unwrap();
        assert_eq!(meta.video_codec, "h264");
        assert_eq!(meta.audio_codec, "aac");
        assert_eq!((meta.width, meta.height), (1280, 720));
        assert!((meta.duration_seconds - fixture.duration_seconds()).abs() < 0.05);
        assert_eq!(meta.framerate_hz, 23.98);
    }

    #[test]
    fn honours_timestamp_scale_and_float32() {
        let fixture = MkvFixture {
            timestamp_scale: Some(100_000),
            duration_ticks: 45_000.0,
            float32_duration: true,
            video_codec: Some("V_VP9".to_string()),
            audio_codec: Some("A_OPUS".to_string()),
            audio_first: false,
            ..Default::default()
        };
        let meta = parse_bytes(fixture.build()).unwrap();
        assert_eq!(meta.video_codec, "vp9");
        assert_eq!(meta.audio_codec, "opus");
        assert!((meta.duration_seconds - 4.5).abs() < 0.05);
    }

    #[test]
    fn missing_default_duration_leaves_framerate_zero() {
        let fixture = MkvFixture {
            default_duration_ns: None,
            ..Default::default()
        };
        assert_eq!(parse_bytes(fixture.build()).unwrap().framerate_hz, 0.0);
    }

    #[test]
    fn unknown_codec_strips_prefix() {
        let fixture = MkvFixture {
            video_codec: Some("V_XYZ9".to_string()),
            ..Default::default()
        };
        assert_eq!(parse_bytes(fixture.build()).unwrap().video_codec, "xyz9");
    }

    #[test]
    fn first_video_track_wins() {
        let fixture = MkvFixture {
            second_video_codec: Some("V_VP9".to_string()),
            ..Default::default()
        };
        let meta = parse_bytes(fixture.build()).unwrap();
        assert_eq!(meta.video_codec, "h264");
        assert_eq!((meta.width, meta.height), (1280, 720));
        assert_eq!(meta.framerate_hz, 23.98);

        // A video entry with an empty CodecID does not claim the slot.
        let fixture = MkvFixture {
            video_codec: Some(String::new()),
            second_video_codec: Some("V_VP9".to_string()),
            ..Default::default()
        };
        let meta = parse_bytes(fixture.build()).unwrap();
        assert_eq!(meta.video_codec, "vp9");
        assert_eq!((meta.width, meta.height), (640, 360));
        assert_eq!(meta.framerate_hz, 25.0);
    }

    #[test]
    fn audio_only_is_no_video_track() {
        let fixture = MkvFixture {
            video_codec: None,
            ..Default::default()
        };
        assert!(matches!(
            parse_bytes(fixture.build()).unwrap_err(),
            ParseError::NoVideoTrack
        ));
    }

    #[test]
    fn missing_ebml_header_is_not_this_format() {
        let err = parse_bytes(b"RIFF\0\0\0\0AVI ".to_vec()).unwrap_err();
        assert!(matches!(err, ParseError::NotThisFormat { .. }));
        let err = parse_bytes(Vec::new()).unwrap_err();
        assert!(matches!(err, ParseError::NotThisFormat { .. }));
    }

    #[test]
    fn missing_segment_is_not_this_format() {
        let mut bytes = ebml_element(0x1A45_DFA3, &[]);
        bytes.extend(ebml_element(0x1F43_B675, &[0u8; 4]));
        let err = parse_bytes(bytes).unwrap_err();
        assert!(matches!(err, ParseError::NotThisFormat { .. }));
    }

    #[test]
    fn tracks_beyond_scan_limit_are_not_read() {
        let fixture = MkvFixture {
            void_before_tracks: (SEGMENT_SCAN_LIMIT + 1024) as usize,
            ..Default::default()
        };
        assert!(parse_bytes(fixture.build()).is_err());
    }

    #[test]
    fn tracks_within_scan_limit_are_read() {
        let fixture = MkvFixture {
            void_before_tracks: 1024 * 1024,
            ..Default::default()
        };
        assert_eq!(parse_bytes(fixture.build()).unwrap().video_codec, "h264");
    }

    #[test]
    fn child_sizes_are_clamped_to_parent() {
        let element = Element {
            id: ID_CODEC_ID,
            data_start: 10,
            declared_size: u64::MAX,
            data_end: 20,
        };
        assert_eq!(element.data_end - element.data_start, 10);

        let mut bytes = ebml_element(0xAE, &[0x86, 0xFF]);
        bytes.extend_from_slice(b"tail");
        let mut reader = SourceReader::new(Cursor::new(bytes)).unwrap();
        let entry = ElementWalker::new(0, reader.len()).next(&mut reader).unwrap();
        let child = ElementWalker::children(&entry).next(&mut reader).unwrap();
        assert_eq!(child.data_end, entry.data_end);
    }

    #[test]
    fn every_truncation_is_handled() {
        let bytes = MkvFixture::default().build();
        for len in 0..bytes.len() {
            match parse_bytes(bytes[..len].to_vec()) {
                Ok(meta) => assert_eq!(meta.video_codec, "h264"),
                Err(e) => assert!(!matches!(e, ParseError::Io(_)), "len {len}: {e}"),
            }
        }
    }
}
