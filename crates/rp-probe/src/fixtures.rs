//! Synthetic container builders for tests and benchmarks.
//!
//! The files are structurally exact but carry no media payload: only the
//! boxes, elements and chunks the native parsers read are populated.

use std::io::Write;
use std::path::PathBuf;

/// Write `bytes` to `name` inside a fresh temporary directory.
///
/// The directory is removed when the returned guard is dropped.
pub fn write_fixture(name: &str, bytes: &[u8]) -> std::io::Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path)?;
    file.write_all(bytes)?;
    Ok((dir, path))
}

// ---------------------------------------------------------------------------
// ISO-BMFF
// ---------------------------------------------------------------------------

/// An ISO-BMFF box with a 32-bit size.
pub fn iso_box(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 8);
    out.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(payload);
    out
}

fn full_box_prefix(version: u8) -> Vec<u8> {
    vec![version, 0, 0, 0]
}

#[derive(Debug, Clone)]
pub struct Mp4Fixture {
    pub video_codec: Option<[u8; 4]>,
    pub audio_codec: Option<[u8; 4]>,
    /// A second video track placed after the first one.
    pub second_video_codec: Option<[u8; 4]>,
    pub width: u32,
    pub height: u32,
    pub timescale: u32,
    pub duration_ticks: u64,
    pub sample_count: u32,
    /// Emit version 1 (64-bit) `mvhd`, `tkhd` and `mdhd` boxes.
    pub version1: bool,
}

impl Default for Mp4Fixture {
    fn default() -> Self {
        Self {
            video_codec: Some(*b"avc1"),
            audio_codec: Some(*b"mp4a"),
            second_video_codec: None,
            width: 1920,
            height: 1080,
            timescale: 30_000,
            duration_ticks: 300_300,
            sample_count: 300,
            version1: false,
        }
    }
}

impl Mp4Fixture {
    /// Duration in seconds the fixture declares.
    pub fn duration_seconds(&self) -> f64 {
        self.duration_ticks as f64 / f64::from(self.timescale)
    }

    /// Layout: `ftyp`, `mdat`, `moov` (audio track first, then video).
    pub fn build(&self) -> Vec<u8> {
        let mut moov = self.mvhd();
        if let Some(codec) = self.audio_codec {
            moov.extend(self.trak(b"soun", &codec, 0, 0, 48_000, 480_480, 470));
        }
        if let Some(codec) = self.video_codec {
            moov.extend(self.trak(
                b"vide",
                &codec,
                self.width,
                self.height,
                self.timescale,
                self.duration_ticks,
                self.sample_count,
            ));
        }
        if let Some(codec) = self.second_video_codec {
            moov.extend(self.trak(b"vide", &codec, 640, 360, 25, 250, 250));
        }

        let mut ftyp = Vec::new();
        ftyp.extend_from_slice(b"isom");
        ftyp.extend_from_slice(&512u32.to_be_bytes());
        ftyp.extend_from_slice(b"isomavc1");

        let mut out = iso_box(b"ftyp", &ftyp);
        out.extend(iso_box(b"mdat", &[0u8; 16]));
        out.extend(iso_box(b"moov", &moov));
        out
    }

    fn mvhd(&self) -> Vec<u8> {
        let mut p = full_box_prefix(self.version1 as u8);
        if self.version1 {
            p.extend_from_slice(&[0u8; 16]);
            p.extend_from_slice(&self.timescale.to_be_bytes());
            p.extend_from_slice(&self.duration_ticks.to_be_bytes());
        } else {
            p.extend_from_slice(&[0u8; 8]);
            p.extend_from_slice(&self.timescale.to_be_bytes());
            p.extend_from_slice(&(self.duration_ticks as u32).to_be_bytes());
        }
        p.extend_from_slice(&[0u8; 80]);
        iso_box(b"mvhd", &p)
    }

    #[allow(clippy::too_many_arguments)]
    fn trak(
        &self,
        handler: &[u8; 4],
        codec: &[u8; 4],
        width: u32,
        height: u32,
        timescale: u32,
        duration: u64,
        samples: u32,
    ) -> Vec<u8> {
        // tkhd: dimensions at 76 (v0) / 88 (v1).
        let mut tkhd = full_box_prefix(self.version1 as u8);
        tkhd.extend(vec![0u8; if self.version1 { 84 } else { 72 }]);
        tkhd.extend_from_slice(&(width << 16).to_be_bytes());
        tkhd.extend_from_slice(&(height << 16).to_be_bytes());

        let mut mdhd = full_box_prefix(self.version1 as u8);
        if self.version1 {
            mdhd.extend_from_slice(&[0u8; 16]);
            mdhd.extend_from_slice(&timescale.to_be_bytes());
            mdhd.extend_from_slice(&duration.to_be_bytes());
        } else {
            mdhd.extend_from_slice(&[0u8; 8]);
            mdhd.extend_from_slice(&timescale.to_be_bytes());
            mdhd.extend_from_slice(&(duration as u32).to_be_bytes());
        }
        mdhd.extend_from_slice(&[0u8; 4]);

        let mut hdlr = full_box_prefix(0);
        hdlr.extend_from_slice(&[0u8; 4]);
        hdlr.extend_from_slice(handler);
        hdlr.extend_from_slice(&[0u8; 13]);

        let mut stsd = full_box_prefix(0);
        stsd.extend_from_slice(&1u32.to_be_bytes());
        stsd.extend(iso_box(codec, &[0, 0, 0, 0, 0, 0, 0, 1]));

        // Split the samples over two entries to exercise the sum.
        let first = samples / 2;
        let mut stts = full_box_prefix(0);
        stts.extend_from_slice(&2u32.to_be_bytes());
        stts.extend_from_slice(&first.to_be_bytes());
        stts.extend_from_slice(&1001u32.to_be_bytes());
        stts.extend_from_slice(&(samples - first).to_be_bytes());
        stts.extend_from_slice(&1001u32.to_be_bytes());

        let mut stbl = iso_box(b"stsd", &stsd);
        stbl.extend(iso_box(b"stts", &stts));
        let minf = iso_box(b"stbl", &stbl);

        let mut mdia = iso_box(b"mdhd", &mdhd);
        mdia.extend(iso_box(b"hdlr", &hdlr));
        mdia.extend(iso_box(b"minf", &minf));

        let mut trak = iso_box(b"tkhd", &tkhd);
        trak.extend(iso_box(b"mdia", &mdia));
        iso_box(b"trak", &trak)
    }
}

// ---------------------------------------------------------------------------
// EBML / Matroska
// ---------------------------------------------------------------------------

/// Element ID `0xEC`, payload ignored by every reader.
pub const EBML_VOID: u32 = 0xEC;

/// An EBML element with an 8-byte size VINT.
pub fn ebml_element(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out: Vec<u8> = id
        .to_be_bytes()
        .into_iter()
        .skip_while(|b| *b == 0)
        .collect();
    out.push(0x01);
    out.extend_from_slice(&(payload.len() as u64).to_be_bytes()[1..]);
    out.extend_from_slice(payload);
    out
}

/// An EBML unsigned integer element with a minimal-width payload.
pub fn ebml_uint(id: u32, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take(7).take_while(|b| **b == 0).count();
    ebml_element(id, &bytes[skip..])
}

#[derive(Debug, Clone)]
pub struct MkvFixture {
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub width: u64,
    pub height: u64,
    pub default_duration_ns: Option<u64>,
    pub timestamp_scale: Option<u64>,
    /// Duration in `TimestampScale` ticks.
    pub duration_ticks: f64,
    /// Store the duration as a 4-byte float.
    pub float32_duration: bool,
    /// Put the audio track entry before the video one.
    pub audio_first: bool,
    /// Size of a Void element placed between `Info` and `Tracks`.
    pub void_before_tracks: usize,
    /// A second 640x360 video track entry placed after the others.
    pub second_video_codec: Option<String>,
}

impl Default for MkvFixture {
    fn default() -> Self {
        Self {
            video_codec: Some("V_MPEG4/ISO/AVC".to_string()),
            audio_codec: Some("A_AAC".to_string()),
            width: 1280,
            height: 720,
            default_duration_ns: Some(41_708_333),
            timestamp_scale: None,
            duration_ticks: 10_000.0,
            float32_duration: false,
            audio_first: true,
            void_before_tracks: 0,
            second_video_codec: None,
        }
    }
}

impl MkvFixture {
    /// Duration in seconds the fixture declares.
    pub fn duration_seconds(&self) -> f64 {
        self.duration_ticks * self.timestamp_scale.unwrap_or(1_000_000) as f64 / 1e9
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = ebml_element(0x1A45_DFA3, &ebml_element(0x4282, b"matroska"));

        let mut info = Vec::new();
        if let Some(scale) = self.timestamp_scale {
            info.extend(ebml_uint(0x2A_D7B1, scale));
        }
        if self.float32_duration {
            info.extend(ebml_element(0x4489, &(self.duration_ticks as f32).to_be_bytes()));
        } else {
            info.extend(ebml_element(0x4489, &self.duration_ticks.to_be_bytes()));
        }

        let video = self.video_codec.as_ref().map(|codec| {
            let mut entry = ebml_uint(0xD7, 1);
            entry.extend(ebml_uint(0x83, 1));
            entry.extend(ebml_element(0x86, codec.as_bytes()));
            if let Some(ns) = self.default_duration_ns {
                entry.extend(ebml_uint(0x23_E383, ns));
            }
            let mut pixels = ebml_uint(0xB0, self.width);
            pixels.extend(ebml_uint(0xBA, self.height));
            entry.extend(ebml_element(0xE0, &pixels));
            ebml_element(0xAE, &entry)
        });
        let audio = self.audio_codec.as_ref().map(|codec| {
            let mut entry = ebml_uint(0xD7, 2);
            entry.extend(ebml_uint(0x83, 2));
            // NUL padding is trimmed by readers.
            let mut id = codec.as_bytes().to_vec();
            id.push(0);
            entry.extend(ebml_element(0x86, &id));
            ebml_element(0xAE, &entry)
        });

        let mut tracks = Vec::new();
        let ordered = if self.audio_first {
            [audio, video]
        } else {
            [video, audio]
        };
        for entry in ordered.into_iter().flatten() {
            tracks.extend(entry);
        }
        if let Some(codec) = &self.second_video_codec {
            let mut entry = ebml_uint(0xD7, 3);
            entry.extend(ebml_uint(0x83, 1));
            entry.extend(ebml_element(0x86, codec.as_bytes()));
            entry.extend(ebml_uint(0x23_E383, 40_000_000));
            let mut pixels = ebml_uint(0xB0, 640);
            pixels.extend(ebml_uint(0xBA, 360));
            entry.extend(ebml_element(0xE0, &pixels));
            tracks.extend(ebml_element(0xAE, &entry));
        }

        let mut segment = ebml_element(0x1549_A966, &info);
        if self.void_before_tracks > 0 {
            segment.extend(ebml_element(EBML_VOID, &vec![0u8; self.void_before_tracks]));
        }
        segment.extend(ebml_element(0x1654_AE6B, &tracks));

        out.extend(ebml_element(0x1853_8067, &segment));
        out
    }
}

// ---------------------------------------------------------------------------
// RIFF / AVI
// ---------------------------------------------------------------------------

/// A RIFF chunk, padded to an even length.
pub fn riff_chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    out.extend_from_slice(id);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
    out
}

/// A RIFF `LIST` chunk of the given list type.
pub fn riff_list(list_type: &[u8; 4], children: &[u8]) -> Vec<u8> {
    let mut payload = list_type.to_vec();
    payload.extend_from_slice(children);
    riff_chunk(b"LIST", &payload)
}

#[derive(Debug, Clone)]
pub struct AviFixture {
    pub video_handler: [u8; 4],
    pub bi_compression: [u8; 4],
    pub avih_width: u32,
    pub avih_height: u32,
    /// BITMAPINFOHEADER dimensions; a negative height marks top-down rows.
    pub strf_width: i32,
    pub strf_height: i32,
    pub micro_sec_per_frame: u32,
    pub total_frames: u32,
    pub scale: u32,
    pub rate: u32,
    pub length: u32,
    pub with_video: bool,
    /// Audio `fccHandler` and WAVEFORMATEX format tag.
    pub audio: Option<([u8; 4], u16)>,
    /// Size of a JUNK chunk placed before the `hdrl` list.
    pub junk_before_hdrl: usize,
    /// Put a `vids` stream with no handler and no `strf` before the real one.
    pub leading_codecless_video: bool,
}

impl Default for AviFixture {
    fn default() -> Self {
        Self {
            video_handler: *b"XVID",
            bi_compression: *b"XVID",
            avih_width: 640,
            avih_height: 480,
            strf_width: 720,
            strf_height: -576,
            micro_sec_per_frame: 40_000,
            total_frames: 250,
            scale: 1,
            rate: 25,
            length: 250,
            with_video: true,
            audio: Some(([0; 4], 0x0055)),
            junk_before_hdrl: 0,
            leading_codecless_video: false,
        }
    }
}

impl AviFixture {
    pub fn build(&self) -> Vec<u8> {
        let mut avih = Vec::with_capacity(56);
        avih.extend_from_slice(&self.micro_sec_per_frame.to_le_bytes());
        avih.extend_from_slice(&[0u8; 20]);
        avih.extend_from_slice(&self.total_frames.to_le_bytes());
        avih.extend_from_slice(&[0u8; 4]);
        avih.extend_from_slice(&self.avih_width.to_le_bytes());
        avih.extend_from_slice(&self.avih_height.to_le_bytes());
        avih.extend_from_slice(&[0u8; 16]);

        let mut hdrl = riff_chunk(b"avih", &avih);
        // Odd-sized chunk to exercise word alignment.
        hdrl.extend(riff_chunk(b"JUNK", &[0u8; 3]));

        if self.leading_codecless_video {
            let strh = self.strh(b"vids", &[0; 4]);
            hdrl.extend(riff_list(b"strl", &riff_chunk(b"strh", &strh)));
        }

        if self.with_video {
            let mut bih = Vec::with_capacity(40);
            bih.extend_from_slice(&40u32.to_le_bytes());
            bih.extend_from_slice(&self.strf_width.to_le_bytes());
            bih.extend_from_slice(&self.strf_height.to_le_bytes());
            bih.extend_from_slice(&1u16.to_le_bytes());
            bih.extend_from_slice(&24u16.to_le_bytes());
            bih.extend_from_slice(&self.bi_compression);
            bih.extend_from_slice(&[0u8; 20]);

            let mut strl = riff_chunk(b"strh", &self.strh(b"vids", &self.video_handler));
            strl.extend(riff_chunk(b"strf", &bih));
            hdrl.extend(riff_list(b"strl", &strl));
        }

        if let Some((handler, tag)) = self.audio {
            let mut wfx = Vec::with_capacity(18);
            wfx.extend_from_slice(&tag.to_le_bytes());
            wfx.extend_from_slice(&2u16.to_le_bytes());
            wfx.extend_from_slice(&48_000u32.to_le_bytes());
            wfx.extend_from_slice(&[0u8; 10]);

            let mut strl = riff_chunk(b"strh", &self.strh(b"auds", &handler));
            strl.extend(riff_chunk(b"strf", &wfx));
            hdrl.extend(riff_list(b"strl", &strl));
        }

        let mut body = b"AVI ".to_vec();
        if self.junk_before_hdrl > 0 {
            body.extend(riff_chunk(b"JUNK", &vec![0u8; self.junk_before_hdrl]));
        }
        body.extend(riff_list(b"hdrl", &hdrl));
        body.extend(riff_list(b"movi", &riff_chunk(b"00dc", &[0u8; 8])));

        let mut out = b"RIFF".to_vec();
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend(body);
        out
    }

    fn strh(&self, kind: &[u8; 4], handler: &[u8; 4]) -> Vec<u8> {
        let mut strh = Vec::with_capacity(56);
        strh.extend_from_slice(kind);
        strh.extend_from_slice(handler);
        strh.extend_from_slice(&[0u8; 12]);
        strh.extend_from_slice(&self.scale.to_le_bytes());
        strh.extend_from_slice(&self.rate.to_le_bytes());
        strh.extend_from_slice(&[0u8; 4]);
        strh.extend_from_slice(&self.length.to_le_bytes());
        strh.extend_from_slice(&[0u8; 20]);
        strh
    }
}
