//! Codec identifier tables, one pair per container family.
//!
//! Every function maps to a short lowercase codec token. Identifiers that are
//! not in a table pass through lowercased so an unknown codec never aborts
//! the rest of the extraction.

use crate::reader::fourcc_to_string;

// ---------------------------------------------------------------------------
// ISO-BMFF sample entry FourCCs
// ---------------------------------------------------------------------------

/// Video codec for an `stsd` sample entry type.
pub fn mp4_video_codec(fourcc: &[u8; 4]) -> String {
    let code = fourcc_to_string(fourcc).to_lowercase();
    let name = match code.as_str() {
        "avc1" | "avc3" | "dva1" | "dvav" => "h264",
        "hev1" | "hvc1" | "dvh1" | "dvhe" => "hevc",
        "vp08" => "vp8",
        "vp09" => "vp9",
        "av01" => "av1",
        "mp4v" => "mpeg4",
        "ap4h" | "ap4x" | "apch" | "apcn" | "apcs" | "apco" => "prores",
        "jpeg" | "mjpa" | "mjpb" => "mjpeg",
        "s263" | "h263" => "h263",
        _ => return code,
    };
    name.to_string()
}

/// Audio codec for an `stsd` sample entry type.
pub fn mp4_audio_codec(fourcc: &[u8; 4]) -> String {
    let code = fourcc_to_string(fourcc).to_lowercase();
    let name = match code.as_str() {
        "mp4a" => "aac",
        "ac-3" => "ac3",
        "ec-3" => "eac3",
        "opus" => "opus",
        "flac" => "flac",
        "alac" => "alac",
        ".mp3" => "mp3",
        "sowt" | "twos" | "lpcm" | "in24" | "in32" | "fl32" | "fl64" => "pcm",
        _ => return code,
    };
    name.to_string()
}

// ---------------------------------------------------------------------------
// Matroska CodecID strings
// ---------------------------------------------------------------------------

/// Video codec for a Matroska `CodecID`.
pub fn mkv_video_codec(codec_id: &str) -> String {
    let name = match codec_id {
        "V_MPEG4/ISO/AVC" => "h264",
        "V_MPEGH/ISO/HEVC" => "hevc",
        "V_VP8" => "vp8",
        "V_VP9" => "vp9",
        "V_AV1" => "av1",
        "V_MPEG4/ISO/SP" | "V_MPEG4/ISO/ASP" | "V_MPEG4/ISO/AP" => "mpeg4",
        "V_MPEG2" => "mpeg2video",
        "V_MPEG1" => "mpeg1video",
        other => return strip_prefix_lower(other, "V_"),
    };
    name.to_string()
}

/// Audio codec for a Matroska `CodecID`.
pub fn mkv_audio_codec(codec_id: &str) -> String {
    let name = match codec_id {
        "A_AAC" | "A_AAC/MPEG2/LC" | "A_AAC/MPEG4/LC" => "aac",
        other if other.starts_with("A_AAC/") => "aac",
        "A_VORBIS" => "vorbis",
        "A_OPUS" => "opus",
        "A_AC3" => "ac3",
        "A_EAC3" => "eac3",
        "A_DTS" => "dts",
        "A_FLAC" => "flac",
        "A_MPEG/L3" => "mp3",
        "A_MPEG/L2" => "mp2",
        "A_PCM/INT/LIT" | "A_PCM/INT/BIG" | "A_PCM/FLOAT/IEEE" => "pcm",
        other => return strip_prefix_lower(other, "A_"),
    };
    name.to_string()
}

fn strip_prefix_lower(codec_id: &str, prefix: &str) -> String {
    codec_id
        .strip_prefix(prefix)
        .unwrap_or(codec_id)
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// AVI handler FourCCs and WAVEFORMATEX tags
// ---------------------------------------------------------------------------

/// Video codec for an AVI `fccHandler` or `biCompression` FourCC.
pub fn avi_video_codec(fourcc: &str) -> String {
    let trimmed = fourcc.trim_end_matches(['\0', ' ']);
    let name = match trimmed.to_uppercase().as_str() {
        "H264" | "X264" | "AVC1" => "h264",
        "HEVC" | "H265" | "X265" | "HVC1" => "hevc",
        "DIVX" | "DX50" | "XVID" | "FMP4" | "MP4V" => "mpeg4",
        "MJPG" | "MJPEG" => "mjpeg",
        "VP80" => "vp8",
        "VP90" => "vp9",
        "AV01" => "av1",
        "WMV1" => "wmv1",
        "WMV2" => "wmv2",
        "WMV3" => "wmv3",
        "MSVC" | "CRAM" => "msvideo1",
        _ => return trimmed.to_lowercase(),
    };
    name.to_string()
}

/// Name for a WAVEFORMATEX `wFormatTag`.
pub fn wave_format_tag_name(tag: u16) -> Option<&'static str> {
    let name = match tag {
        0x0001 => "pcm",
        0x0003 => "pcm_f32",
        0x0006 => "pcm_alaw",
        0x0007 => "pcm_mulaw",
        0x0011 => "adpcm_ima",
        0x0050 => "mp2",
        0x0055 => "mp3",
        0x00FF | 0x1610 | 0x706D => "aac",
        0x0160 | 0x0161 => "wmav2",
        0x2000 => "ac3",
        0x2001 => "dts",
        0x674F | 0x6750 | 0x6751 => "vorbis",
        0xF1AC => "flac",
        _ => return None,
    };
    Some(name)
}

/// Audio codec for an AVI audio stream.
///
/// A recognised `wFormatTag` from the stream's `strf` wins. Otherwise the
/// `fccHandler` decides: all-zero means PCM, and a non-printable handler is
/// read as a little-endian format tag.
pub fn avi_audio_codec(format_tag: Option<u16>, handler: &[u8; 4]) -> String {
    if let Some(name) = format_tag.and_then(wave_format_tag_name) {
        return name.to_string();
    }

    let text = fourcc_to_string(handler);
    if text.is_empty() {
        return "pcm".to_string();
    }
    if !handler.iter().all(|b| b.is_ascii_graphic() || *b == b' ' || *b == 0) {
        let tag = u16::from_le_bytes([handler[0], handler[1]]);
        return match wave_format_tag_name(tag) {
            Some(name) => name.to_string(),
            None => format!("0x{tag:04x}"),
        };
    }
    text.trim_end().to_lowercase()
}
