//! ISO base media file format (MP4/MOV/M4V) walker.
//!
//! Only `moov` is interpreted at the root. Inside it the walk follows a fixed
//! path (`trak` → `mdia` → `minf` → `stbl`), so nesting depth is bounded by
//! the code rather than by the file.

use std::io::{Read, Seek};
use std::path::Path;

use rp_core::{MediaMetadata, ParseError};

use crate::builder::{round2, MetadataBuilder, VideoTrack};
use crate::codec;
use crate::reader::{decode_uint, fourcc_to_string, Endian, SourceReader};

const FORMAT: &str = "ISO-BMFF";

/// `stts` entries fetched per read.
const STTS_BATCH: u64 = 4096;

/// A parsed box header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    /// 4-byte box type (e.g. b"moov").
    pub box_type: [u8; 4],
    /// Absolute offset of the first header byte.
    pub offset: u64,
    /// Total size of the box including the header.
    pub size: u64,
    /// Size of the header itself (8 or 16 for extended-size boxes).
    pub header_size: u64,
}

impl BoxHeader {
    /// Absolute offset of the first content byte.
    pub fn data_offset(&self) -> u64 {
        self.offset + self.header_size
    }

    /// Absolute offset one past the last content byte.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Iterates the boxes of one container.
///
/// A box whose size is smaller than its header or runs past the container
/// ends the iteration; boxes yielded before it stay valid.
#[derive(Debug, Clone)]
pub struct BoxWalker {
    pos: u64,
    end: u64,
}

impl BoxWalker {
    pub fn new(start: u64, end: u64) -> Self {
        Self { pos: start, end }
    }

    pub fn children(parent: &BoxHeader) -> Self {
        Self::new(parent.data_offset(), parent.end())
    }

    pub fn next<R: Read + Seek>(&mut self, reader: &mut SourceReader<R>) -> Option<BoxHeader> {
        match self.read_header(reader) {
            Ok(header) => header,
            Err(_) => {
                self.pos = self.end;
                None
            }
        }
    }

    fn read_header<R: Read + Seek>(
        &mut self,
        reader: &mut SourceReader<R>,
    ) -> Result<Option<BoxHeader>, ParseError> {
        let start = self.pos;
        let available = self.end.saturating_sub(start);
        if available < 8 {
            return Ok(None);
        }

        let size32 = reader.u32_at(start, Endian::Big, self.end)?;
        let box_type = reader.fourcc(start + 4, self.end)?;
        let (size, header_size) = match size32 {
            1 => (reader.u64_at(start + 8, Endian::Big, self.end)?, 16),
            0 => (available, 8),
            n => (u64::from(n), 8),
        };

        if size < header_size || size > available {
            tracing::debug!(
                offset = start,
                size,
                box_type = %fourcc_to_string(&box_type),
                "box size outside container, stopping walk"
            );
            return Err(reader.fault(start, format!("box size {size} outside container bounds")));
        }

        self.pos = start + size;
        Ok(Some(BoxHeader {
            box_type,
            offset: start,
            size,
            header_size,
        }))
    }
}

/// Parse an MP4/MOV/M4V file.
pub fn parse_file(path: &Path) -> Result<MediaMetadata, ParseError> {
    let mut reader = SourceReader::open(path)?;
    parse(&mut reader, path)
}

/// Parse ISO-BMFF from an open source.
pub fn parse<R: Read + Seek>(
    reader: &mut SourceReader<R>,
    path: &Path,
) -> Result<MediaMetadata, ParseError> {
    if reader.is_empty() {
        return Err(ParseError::not_this_format(FORMAT, "empty file"));
    }

    let mut builder = MetadataBuilder::new();
    let mut found_moov = false;

    let mut root = BoxWalker::new(0, reader.len());
    while let Some(header) = root.next(reader) {
        if &header.box_type == b"moov" {
            found_moov = true;
            builder.merge(parse_moov(reader, &header));
        }
    }

    if !found_moov {
        return Err(reader
            .take_fault()
            .unwrap_or_else(|| ParseError::not_this_format(FORMAT, "no moov box")));
    }

    let file_size = reader.len();
    builder.finish(path, file_size, || {
        reader.take_fault().unwrap_or(ParseError::NoVideoTrack)
    })
}

fn parse_moov<R: Read + Seek>(reader: &mut SourceReader<R>, moov: &BoxHeader) -> MetadataBuilder {
    let mut builder = MetadataBuilder::new();
    let mut children = BoxWalker::children(moov);
    while let Some(child) = children.next(reader) {
        match &child.box_type {
            b"mvhd" => {
                if let Ok((timescale, duration)) = read_time_header(reader, &child) {
                    if timescale > 0 {
                        builder.offer_duration(duration as f64 / f64::from(timescale));
                    }
                }
            }
            b"trak" => builder.merge(parse_trak(reader, &child).into_builder()),
            _ => {}
        }
    }
    builder
}

// ---------------------------------------------------------------------------
// Track level
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq)]
struct TrackSummary {
    width: u32,
    height: u32,
    media: MediaSummary,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct MediaSummary {
    handler: [u8; 4],
    timescale: u32,
    duration: u64,
    samples: SampleTable,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct SampleTable {
    sample_entry: [u8; 4],
    sample_count: u64,
}

impl TrackSummary {
    fn framerate(&self) -> f64 {
        let media = &self.media;
        if media.timescale == 0 || media.duration == 0 || media.samples.sample_count == 0 {
            return 0.0;
        }
        let seconds = media.duration as f64 / f64::from(media.timescale);
        round2(media.samples.sample_count as f64 / seconds)
    }

    fn into_builder(self) -> MetadataBuilder {
        let mut builder = MetadataBuilder::new();
        match &self.media.handler {
            b"vide" => {
                builder.offer_video(VideoTrack {
                    codec: codec::mp4_video_codec(&self.media.samples.sample_entry),
                    width: self.width,
                    height: self.height,
                    framerate_hz: self.framerate(),
                });
            }
            b"soun" => {
                builder.offer_audio(codec::mp4_audio_codec(&self.media.samples.sample_entry));
            }
            _ => {}
        }
        builder
    }
}

fn parse_trak<R: Read + Seek>(reader: &mut SourceReader<R>, trak: &BoxHeader) -> TrackSummary {
    let mut track = TrackSummary::default();
    let mut children = BoxWalker::children(trak);
    while let Some(child) = children.next(reader) {
        match &child.box_type {
            b"tkhd" => {
                if let Ok((width, height)) = read_track_dimensions(reader, &child) {
                    track.width = width;
                    track.height = height;
                }
            }
            b"mdia" => track.media = parse_mdia(reader, &child),
            _ => {}
        }
    }
    track
}

fn parse_mdia<R: Read + Seek>(reader: &mut SourceReader<R>, mdia: &BoxHeader) -> MediaSummary {
    let mut media = MediaSummary::default();
    let mut children = BoxWalker::children(mdia);
    while let Some(child) = children.next(reader) {
        match &child.box_type {
            b"mdhd" => {
                if let Ok((timescale, duration)) = read_time_header(reader, &child) {
                    media.timescale = timescale;
                    media.duration = duration;
                }
            }
            b"hdlr" => {
                if let Ok(handler) = reader.fourcc(child.data_offset() + 8, child.end()) {
                    media.handler = handler;
                }
            }
            b"minf" => {
                let mut minf = BoxWalker::children(&child);
                while let Some(stbl) = minf.next(reader) {
                    if &stbl.box_type == b"stbl" {
                        media.samples = parse_stbl(reader, &stbl);
                    }
                }
            }
            _ => {}
        }
    }
    media
}

fn parse_stbl<R: Read + Seek>(reader: &mut SourceReader<R>, stbl: &BoxHeader) -> SampleTable {
    let mut table = SampleTable::default();
    let mut children = BoxWalker::children(stbl);
    while let Some(child) = children.next(reader) {
        match &child.box_type {
            // First sample entry: size(4) then type(4), after version/flags and entry_count.
            b"stsd" => {
                if let Ok(entry) = reader.fourcc(child.data_offset() + 12, child.end()) {
                    table.sample_entry = entry;
                }
            }
            b"stts" => {
                if let Ok(count) = read_sample_count(reader, &child) {
                    table.sample_count = count;
                }
            }
            _ => {}
        }
    }
    table
}

// ---------------------------------------------------------------------------
// Field extractors
// ---------------------------------------------------------------------------

/// Timescale and duration from `mvhd` or `mdhd`, which share the layout of
/// these two fields for both header versions.
fn read_time_header<R: Read + Seek>(
    reader: &mut SourceReader<R>,
    header: &BoxHeader,
) -> Result<(u32, u64), ParseError> {
    let data = header.data_offset();
    let end = header.end();
    let [version] = reader.bytes::<1>(data, end)?;
    if version == 0 {
        let timescale = reader.u32_at(data + 12, Endian::Big, end)?;
        let duration = reader.u32_at(data + 16, Endian::Big, end)?;
        Ok((timescale, u64::from(duration)))
    } else {
        let timescale = reader.u32_at(data + 20, Endian::Big, end)?;
        let duration = reader.u64_at(data + 24, Endian::Big, end)?;
        Ok((timescale, duration))
    }
}

/// Declared width and height from `tkhd`.
fn read_track_dimensions<R: Read + Seek>(
    reader: &mut SourceReader<R>,
    header: &BoxHeader,
) -> Result<(u32, u32), ParseError> {
    let data = header.data_offset();
    let end = header.end();
    let [version] = reader.bytes::<1>(data, end)?;
    let at = if version == 0 { data + 76 } else { data + 88 };
    Ok((reader.fixed_16_16(at, end)?, reader.fixed_16_16(at + 4, end)?))
}

/// Sum of `sample_count` over every `stts` entry.
///
/// A declared entry count larger than the box can hold is clamped to what
/// fits.
fn read_sample_count<R: Read + Seek>(
    reader: &mut SourceReader<R>,
    header: &BoxHeader,
) -> Result<u64, ParseError> {
    let data = header.data_offset();
    let end = header.end();
    let declared = u64::from(reader.u32_at(data + 4, Endian::Big, end)?);
    let table = data + 8;
    let fits = end.saturating_sub(table) / 8;
    if declared > fits {
        tracing::debug!(declared, fits, "stts entry count exceeds box, clamping");
    }
    let count = declared.min(fits);

    let mut total = 0u64;
    let mut index = 0u64;
    while index < count {
        let batch = (count - index).min(STTS_BATCH);
        let bytes = reader.vec(table + index * 8, (batch * 8) as usize, end)?;
        total = bytes
            .chunks_exact(8)
            .map(|entry| decode_uint(&entry[..4], Endian::Big))
            .fold(total, u64::saturating_add);
        index += batch;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{iso_box, Mp4Fixture};
    use std::io::Cursor;

    fn parse_bytes(bytes: Vec<u8>) -> Result<MediaMetadata, ParseError> {
        let mut reader = SourceReader::new(Cursor::new(bytes)).unwrap();
        parse(&mut reader, Path::new("clip.mp4"))
    }

    fn moov_offset(bytes: &[u8]) -> usize {
        bytes.windows(4).position(|w| w == b"moov").unwrap() - 4
    }

    #[test]
    fn parses_default_fixture() {
        let fixture = Mp4Fixture::default();
        let meta = parse_bytes(fixture.build()).unwrap();
        assert_eq!(meta.video_codec, "h264");
        assert_eq!(meta.audio_codec, "aac");
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.height, 1080);
        assert!((meta.duration_seconds - 10.01).abs() < 0.05);
        assert_eq!(meta.framerate_hz, 29.97);
        assert_eq!(meta.display_name, "clip.mp4");
    }

    #[test]
    fn parses_version1_headers() {
        let fixture = Mp4Fixture {
            version1: true,
            video_codec: Some(*b"hvc1"),
            width: 3840,
            height: 2160,
            timescale: 24,
            duration_ticks: 240,
            sample_count: 240,
            ..Default::default()
        };
        let meta = parse_bytes(fixture.build()).unwrap();
        assert_eq!(meta.video_codec, "hevc");
        assert_eq!((meta.width, meta.height), (3840, 2160));
        assert!((meta.duration_seconds - 10.0).abs() < 0.05);
        assert_eq!(meta.framerate_hz, 24.0);
    }

    #[test]
    fn first_video_track_wins() {
        let fixture = Mp4Fixture {
            second_video_codec: Some(*b"vp09"),
            ..Default::default()
        };
        let meta = parse_bytes(fixture.build()).unwrap();
        assert_eq!(meta.video_codec, "h264");
        assert_eq!(meta.width, 1920);
    }

    #[test]
    fn audio_only_is_no_video_track() {
        let fixture = Mp4Fixture {
            video_codec: None,
            ..Default::default()
        };
        let err = parse_bytes(fixture.build()).unwrap_err();
        assert!(matches!(err, ParseError::NoVideoTrack));
    }

    #[test]
    fn unknown_codec_passes_through() {
        let fixture = Mp4Fixture {
            video_codec: Some(*b"XYZ9"),
            ..Default::default()
        };
        assert_eq!(parse_bytes(fixture.build()).unwrap().video_codec, "xyz9");
    }

    #[test]
    fn zero_size_box_extends_to_end() {
        let mut bytes = Mp4Fixture::default().build();
        let at = moov_offset(&bytes);
        bytes[at..at + 4].copy_from_slice(&0u32.to_be_bytes());
        assert_eq!(parse_bytes(bytes).unwrap().video_codec, "h264");
    }

    #[test]
    fn extended_size_box_is_skipped_correctly() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(b"mdat");
        bytes.extend_from_slice(&24u64.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        bytes.extend(Mp4Fixture::default().build());
        assert_eq!(parse_bytes(bytes).unwrap().width, 1920);
    }

    #[test]
    fn oversized_box_is_malformed() {
        let mut bytes = Mp4Fixture::default().build();
        let at = moov_offset(&bytes);
        bytes[at..at + 4].copy_from_slice(&u32::MAX.to_be_bytes());
        let err = parse_bytes(bytes).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn box_smaller_than_header_is_malformed() {
        let mut bytes = iso_box(b"ftyp", b"isom");
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.extend_from_slice(b"moov");
        let err = parse_bytes(bytes).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn empty_file_is_not_this_format() {
        let err = parse_bytes(Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::NotThisFormat { ref reason, .. } if reason == "empty file"
        ));
    }

    #[test]
    fn no_moov_is_not_this_format() {
        let bytes = iso_box(b"ftyp", b"isom\0\0\0\0");
        let err = parse_bytes(bytes).unwrap_err();
        assert!(matches!(err, ParseError::NotThisFormat { .. }));
    }

    #[test]
    fn stts_entry_count_is_clamped() {
        let mut stts = vec![0, 0, 0, 0];
        stts.extend_from_slice(&u32::MAX.to_be_bytes());
        stts.extend_from_slice(&10u32.to_be_bytes());
        stts.extend_from_slice(&1u32.to_be_bytes());
        let bytes = iso_box(b"stts", &stts);
        let mut reader = SourceReader::new(Cursor::new(bytes)).unwrap();
        let header = BoxWalker::new(0, reader.len()).next(&mut reader).unwrap();
        assert_eq!(read_sample_count(&mut reader, &header).unwrap(), 10);
    }

    #[test]
    fn sample_counts_sum_across_batches() {
        let entries = STTS_BATCH + 3;
        let mut stts = vec![0, 0, 0, 0];
        stts.extend_from_slice(&(entries as u32).to_be_bytes());
        for _ in 0..entries {
            stts.extend_from_slice(&u32::MAX.to_be_bytes());
            stts.extend_from_slice(&1u32.to_be_bytes());
        }
        let bytes = iso_box(b"stts", &stts);
        let mut reader = SourceReader::new(Cursor::new(bytes)).unwrap();
        let header = BoxWalker::new(0, reader.len()).next(&mut reader).unwrap();
        assert_eq!(
            read_sample_count(&mut reader, &header).unwrap(),
            entries * u64::from(u32::MAX)
        );
    }

    #[test]
    fn every_truncation_is_handled() {
        let bytes = Mp4Fixture::default().build();
        for len in 0..bytes.len() {
            match parse_bytes(bytes[..len].to_vec()) {
                Ok(meta) => assert_eq!(meta.video_codec, "h264"),
                Err(e) => assert!(!matches!(e, ParseError::Io(_)), "len {len}: {e}"),
            }
        }
    }
}
