//! RIFF/AVI walker.
//!
//! Only the first [`SCAN_LIMIT`] bytes are read; the header lists of a
//! well-formed AVI sit at the start of the file. `hdrl` lists are descended
//! with an explicit stack capped at [`MAX_LIST_DEPTH`] frames and each `strl`
//! list is summarised on its own before being applied.

use std::io::{Read, Seek};
use std::path::Path;

use rp_core::{MediaMetadata, ParseError};

use crate::builder::{round2, MetadataBuilder, VideoTrack};
use crate::codec;
use crate::reader::{decode_uint, fourcc_to_string, Endian, SourceReader};

const FORMAT: &str = "RIFF/AVI";

/// How much of the file the walker reads.
pub const SCAN_LIMIT: u64 = 1024 * 1024;

/// Deepest chain of nested `hdrl` lists followed.
pub const MAX_LIST_DEPTH: usize = 8;

const AVIH_LEN: u64 = 56;
const STRH_MAX_LEN: u64 = 56;
const BITMAPINFOHEADER_LEN: u64 = 40;

/// Header of one RIFF chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub id: [u8; 4],
    pub data_start: u64,
    pub declared_size: u64,
    /// Payload end, clamped to the enclosing list.
    pub data_end: u64,
    /// Offset of the next sibling, padded to an even byte.
    pub next: u64,
}

/// Iterates sibling chunks within `[pos, end)`.
#[derive(Debug, Clone, Copy)]
pub struct ChunkWalker {
    pos: u64,
    end: u64,
}

impl ChunkWalker {
    pub fn new(start: u64, end: u64) -> Self {
        Self { pos: start, end }
    }

    pub fn next<R: Read + Seek>(&mut self, reader: &mut SourceReader<R>) -> Option<Chunk> {
        if self.end.saturating_sub(self.pos) < 8 {
            return None;
        }
        let start = self.pos;
        let header = match reader.bytes::<8>(start, self.end) {
            Ok(h) => h,
            Err(_) => {
                self.pos = self.end;
                return None;
            }
        };
        let id = [header[0], header[1], header[2], header[3]];
        let declared_size = decode_uint(&header[4..8], Endian::Little);
        let data_start = start + 8;
        let unpadded = data_start + declared_size;
        let chunk = Chunk {
            id,
            data_start,
            declared_size,
            data_end: unpadded.min(self.end),
            next: unpadded + (unpadded & 1),
        };
        self.pos = chunk.next;
        Some(chunk)
    }
}

/// Parse an AVI file.
pub fn parse_file(path: &Path) -> Result<MediaMetadata, ParseError> {
    let mut reader = SourceReader::open(path)?;
    parse(&mut reader, path)
}

/// Parse RIFF/AVI from an open source.
pub fn parse<R: Read + Seek>(
    reader: &mut SourceReader<R>,
    path: &Path,
) -> Result<MediaMetadata, ParseError> {
    let file_len = reader.len();
    let header = reader
        .bytes::<12>(0, file_len)
        .map_err(|_| ParseError::not_this_format(FORMAT, "shorter than a RIFF header"))?;
    if &header[0..4] != b"RIFF" {
        return Err(ParseError::not_this_format(FORMAT, "missing RIFF signature"));
    }
    if &header[8..12] != b"AVI " {
        return Err(ParseError::not_this_format(FORMAT, "RIFF form type is not AVI"));
    }

    let riff_size = decode_uint(&header[4..8], Endian::Little);
    let limit = (8 + riff_size).min(file_len).min(SCAN_LIMIT);

    let mut state = AviState::default();
    let mut stack = vec![ChunkWalker::new(12, limit)];
    while let Some(walker) = stack.last_mut() {
        let Some(chunk) = walker.next(reader) else {
            stack.pop();
            continue;
        };

        match &chunk.id {
            b"LIST" => {
                let Ok(list_type) = reader.fourcc(chunk.data_start, chunk.data_end) else {
                    continue;
                };
                let children = ChunkWalker::new(chunk.data_start + 4, chunk.data_end);
                match &list_type {
                    b"hdrl" if stack.len() < MAX_LIST_DEPTH => stack.push(children),
                    b"hdrl" => {
                        tracing::debug!(offset = chunk.data_start, "hdrl nesting too deep, skipping")
                    }
                    b"strl" => state.apply_stream(parse_strl(reader, children)),
                    _ => {}
                }
            }
            b"avih" => {
                if let Ok(main) = read_main_header(reader, &chunk) {
                    state.apply_main_header(main);
                }
            }
            _ => {}
        }
    }

    state.into_builder().finish(path, file_len, || {
        reader.take_fault().unwrap_or(ParseError::NoVideoStream)
    })
}

// ---------------------------------------------------------------------------
// Accumulated header state
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq)]
struct AviState {
    width: u32,
    height: u32,
    framerate_hz: f64,
    duration_seconds: f64,
    /// Set once the first `vids` stream with a known codec has been applied.
    video_codec: Option<String>,
    audio_codec: Option<String>,
}

impl AviState {
    fn apply_main_header(&mut self, main: MainHeader) {
        if self.width == 0 {
            self.width = main.width;
        }
        if self.height == 0 {
            self.height = main.height;
        }
        if main.micro_sec_per_frame > 0 && main.total_frames > 0 {
            let fps = 1e6 / f64::from(main.micro_sec_per_frame);
            // A `vids` stream applied earlier keeps its own duration.
            if self.video_codec.is_none() {
                self.duration_seconds = f64::from(main.total_frames) / fps;
            }
            if self.framerate_hz == 0.0 {
                self.framerate_hz = round2(fps);
            }
        }
    }

    fn apply_stream(&mut self, stream: StreamSummary) {
        match &stream.kind {
            b"vids" if self.video_codec.is_none() => {
                let video_codec = stream.video_codec();
                if video_codec.is_empty() {
                    tracing::debug!("vids stream without a codec, looking further");
                    return;
                }
                if stream.scale > 0 && stream.rate > 0 {
                    let fps = f64::from(stream.rate) / f64::from(stream.scale);
                    if self.framerate_hz == 0.0 {
                        self.framerate_hz = round2(fps);
                    }
                    if stream.length > 0 {
                        self.duration_seconds = f64::from(stream.length) / fps;
                    }
                }
                if let Some(bitmap) = &stream.bitmap {
                    if bitmap.width > 0 {
                        self.width = bitmap.width.unsigned_abs();
                    }
                    if bitmap.height != 0 {
                        self.height = bitmap.height.unsigned_abs();
                    }
                }
                self.video_codec = Some(video_codec);
            }
            b"auds" if self.audio_codec.is_none() => {
                self.audio_codec = Some(codec::avi_audio_codec(stream.format_tag, &stream.handler));
            }
            _ => {}
        }
    }

    fn into_builder(self) -> MetadataBuilder {
        let mut builder = MetadataBuilder::new();
        if let Some(codec) = self.video_codec {
            builder.offer_video(VideoTrack {
                codec,
                width: self.width,
                height: self.height,
                framerate_hz: self.framerate_hz,
            });
        }
        if let Some(audio) = self.audio_codec {
            builder.offer_audio(audio);
        }
        builder.offer_duration(self.duration_seconds);
        builder
    }
}

// ---------------------------------------------------------------------------
// Chunk payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MainHeader {
    micro_sec_per_frame: u32,
    total_frames: u32,
    width: u32,
    height: u32,
}

fn read_main_header<R: Read + Seek>(
    reader: &mut SourceReader<R>,
    chunk: &Chunk,
) -> Result<MainHeader, ParseError> {
    if chunk.declared_size < AVIH_LEN {
        return Err(ParseError::malformed(chunk.data_start, "avih shorter than 56 bytes"));
    }
    let data = reader.bytes::<56>(chunk.data_start, chunk.data_end)?;
    Ok(MainHeader {
        micro_sec_per_frame: le_u32(&data, 0),
        total_frames: le_u32(&data, 24),
        width: le_u32(&data, 32),
        height: le_u32(&data, 36),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bitmap {
    width: i32,
    height: i32,
    compression: [u8; 4],
}

/// What one `strl` list says about its stream.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct StreamSummary {
    kind: [u8; 4],
    handler: [u8; 4],
    scale: u32,
    rate: u32,
    length: u32,
    bitmap: Option<Bitmap>,
    format_tag: Option<u16>,
}

impl StreamSummary {
    fn video_codec(&self) -> String {
        let handler = fourcc_to_string(&self.handler);
        if !handler.trim().is_empty() {
            return codec::avi_video_codec(&handler);
        }
        match &self.bitmap {
            // BI_RGB
            Some(bitmap) if bitmap.compression == [0; 4] => "rawvideo".to_string(),
            Some(bitmap) => codec::avi_video_codec(&fourcc_to_string(&bitmap.compression)),
            None => String::new(),
        }
    }
}

fn parse_strl<R: Read + Seek>(reader: &mut SourceReader<R>, mut children: ChunkWalker) -> StreamSummary {
    let mut stream = StreamSummary::default();
    while let Some(chunk) = children.next(reader) {
        match &chunk.id {
            b"strh" if chunk.declared_size >= 8 => {
                let n = chunk.declared_size.min(STRH_MAX_LEN);
                let Ok(data) = reader.vec(chunk.data_start, n as usize, chunk.data_end) else {
                    continue;
                };
                stream.kind.copy_from_slice(&data[0..4]);
                stream.handler.copy_from_slice(&data[4..8]);
                if data.len() >= 28 {
                    stream.scale = le_u32(&data, 20);
                    stream.rate = le_u32(&data, 24);
                }
                if data.len() >= 36 {
                    stream.length = le_u32(&data, 32);
                }
            }
            b"strf" if &stream.kind == b"vids" && chunk.declared_size >= BITMAPINFOHEADER_LEN => {
                if let Ok(data) = reader.bytes::<40>(chunk.data_start, chunk.data_end) {
                    stream.bitmap = Some(Bitmap {
                        width: le_u32(&data, 4) as i32,
                        height: le_u32(&data, 8) as i32,
                        compression: [data[16], data[17], data[18], data[19]],
                    });
                }
            }
            b"strf" if &stream.kind == b"auds" && chunk.declared_size >= 2 => {
                if let Ok(tag) = reader.u16_at(chunk.data_start, Endian::Little, chunk.data_end) {
                    stream.format_tag = Some(tag);
                }
            }
            _ => {}
        }
    }
    stream
}

fn le_u32(data: &[u8], at: usize) -> u32 {
    decode_uint(&data[at..at + 4], Endian::Little) as u32
}
